use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{MovementBalance, Record, RecordStore};
use super::number::NumberFormat;
use super::schema::Column;

/// How many skipped rows are logged individually before going quiet.
const LOGGED_DEFECTS: usize = 5;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Source-format knobs for [`load_file`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Separator convention for salary columns.
    pub number_format: NumberFormat,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            number_format: NumberFormat::Brazilian,
        }
    }
}

/// Load a movement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with CAGED column names (see [`Column`])
/// * `.json`    – `[{ "municipio": "Recife", "sexo": "Homem", ... }, ...]`
/// * `.parquet` – one column per attribute, any scalar Arrow type
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<RecordStore> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let store = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, options),
        "json" => load_json(path, options),
        "csv" | "txt" => load_csv(path, options),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    log::info!(
        "Loaded {} records from {} ({} rows skipped)",
        store.len(),
        path.display(),
        store.skipped_rows()
    );
    Ok(store)
}

// ---------------------------------------------------------------------------
// Row conversion shared by every format
// ---------------------------------------------------------------------------

/// Why a source row could not become a [`Record`].
#[derive(Debug, Error, PartialEq)]
enum RowDefect {
    #[error("missing value for '{}'", .0.display_name())]
    Missing(Column),
    #[error("invalid value '{value}' for '{}'", .column.display_name())]
    Invalid { column: Column, value: String },
}

/// Collects records and counts the rows that had to be dropped.
struct RecordSink {
    records: Vec<Record>,
    skipped: usize,
    /// The first few defects with where they were found.
    defects: Vec<(RowLocation, RowDefect)>,
}

/// Where a source row sits, in the terms a user would look it up by.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RowLocation {
    /// 1-based line in a text file, header included.
    Line(u64),
    /// 1-based position among the data rows.
    Row(usize),
}

impl std::fmt::Display for RowLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowLocation::Line(line) => write!(f, "line {line}"),
            RowLocation::Row(row) => write!(f, "row {row}"),
        }
    }
}

impl RecordSink {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            defects: Vec::new(),
        }
    }

    fn push(&mut self, location: RowLocation, result: std::result::Result<Record, RowDefect>) {
        match result {
            Ok(record) => self.records.push(record),
            Err(defect) => {
                if self.skipped < LOGGED_DEFECTS {
                    log::warn!("Skipping {location}: {defect}");
                    self.defects.push((location, defect));
                }
                self.skipped += 1;
            }
        }
    }

    fn finish(self) -> RecordStore {
        if let Some((first, _)) = self.defects.first() {
            log::info!("{} rows skipped, the first at {first}", self.skipped);
        }
        if self.skipped > LOGGED_DEFECTS {
            log::warn!(
                "{} further rows skipped",
                self.skipped - LOGGED_DEFECTS
            );
        }
        RecordStore::from_records(self.records, self.skipped)
    }
}

/// A source cell rendered to text.
///
/// `numeric` marks typed numbers (JSON numbers, Arrow numeric arrays); their
/// text always uses `.` as the decimal point whatever the file convention.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    numeric: bool,
}

impl Cell {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            numeric: false,
        }
    }

    fn number(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            numeric: true,
        }
    }
}

/// Build a record from a cell lookup. Blank cells count as absent.
fn record_from_cells(
    cell: impl Fn(Column) -> Option<Cell>,
    format: NumberFormat,
) -> std::result::Result<Record, RowDefect> {
    let text = |column: Column| {
        cell(column)
            .map(|c| c.text.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let decimal = |column: Column| {
        let c = cell(column)?;
        let format = if c.numeric { NumberFormat::Plain } else { format };
        format.parse_decimal(&c.text)
    };
    let required = |column: Column| text(column).ok_or(RowDefect::Missing(column));

    let year_raw = required(Column::DeclaredYear)?;
    let declared_year = parse_int(&year_raw)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| RowDefect::Invalid {
            column: Column::DeclaredYear,
            value: year_raw.clone(),
        })?;

    let balance = MovementBalance::parse(&required(Column::Balance)?);

    let small = |column: Column| {
        text(column)
            .and_then(|s| parse_int(&s))
            .and_then(|v| u32::try_from(v).ok())
    };

    Ok(Record {
        state: text(Column::State),
        city: required(Column::City)?,
        age: small(Column::Age),
        race: text(Column::Race),
        occupation: text(Column::Occupation),
        category: text(Column::Category),
        education: text(Column::Education),
        gender: required(Column::Gender)?,
        employer_type: text(Column::EmployerType),
        establishment_type: text(Column::EstablishmentType),
        movement_type: text(Column::MovementType),
        disability: text(Column::Disability),
        intermittent: text(Column::Intermittent).and_then(|s| parse_flag(&s)),
        partial: text(Column::Partial).and_then(|s| parse_flag(&s)),
        salary: decimal(Column::Salary),
        section: required(Column::Section)?,
        fixed_salary: decimal(Column::FixedSalary),
        declared_year,
        declared_month: small(Column::DeclaredMonth),
        exclusion_year: text(Column::ExclusionYear)
            .and_then(|s| parse_int(&s))
            .and_then(|v| i32::try_from(v).ok()),
        exclusion_month: small(Column::ExclusionMonth),
        balance,
    })
}

/// Integers, tolerating a float rendering such as `"2021.0"`.
fn parse_int(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match super::schema::fold_accents(s).to_ascii_lowercase().as_str() {
        "sim" | "s" | "1" | "true" => Some(true),
        "nao" | "n" | "0" | "false" => Some(false),
        _ => None,
    }
}

/// Header position of every known column; unknown headers are ignored.
#[derive(Debug, Default)]
struct ColumnIndex {
    positions: BTreeMap<Column, usize>,
}

impl ColumnIndex {
    fn resolve<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut positions = BTreeMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            if let Some(column) = Column::ALL.iter().find(|c| c.matches_header(header)) {
                positions.entry(*column).or_insert(idx);
            }
        }

        let missing: Vec<&str> = Column::ALL
            .iter()
            .filter(|c| c.is_required() && !positions.contains_key(*c))
            .map(|c| c.display_name())
            .collect();
        if !missing.is_empty() {
            bail!("missing required columns: {}", missing.join(", "));
        }

        Ok(Self { positions })
    }

    fn position(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row followed by one movement per line.
/// Cells that are not valid UTF-8 are decoded as Latin-1, the encoding of
/// the official CAGED exports.
fn load_csv(path: &Path, options: &LoadOptions) -> Result<RecordStore> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    Ok(read_csv(reader, options.number_format)?.finish())
}

fn read_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    format: NumberFormat,
) -> Result<RecordSink> {
    let headers: Vec<String> = reader
        .byte_headers()
        .context("reading CSV headers")?
        .iter()
        .map(decode_field)
        .collect();
    let index = ColumnIndex::resolve(headers.iter().map(String::as_str))
        .context("resolving CSV columns")?;

    let mut sink = RecordSink::new();
    for (row_no, result) in reader.byte_records().enumerate() {
        let row = result.with_context(|| format!("CSV data row {}", row_no + 1))?;
        let cell = |column: Column| {
            index
                .position(column)
                .and_then(|i| row.get(i))
                .map(|bytes| Cell::text(decode_field(bytes)))
        };
        // Header is line 1.
        let line = row
            .position()
            .map_or(row_no as u64 + 2, |position| position.line());
        sink.push(RowLocation::Line(line), record_from_cells(cell, format));
    }

    Ok(sink)
}

fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`).
fn load_json(path: &Path, options: &LoadOptions) -> Result<RecordStore> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut sink = RecordSink::new();
    for (row_no, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("JSON row {} is not an object", row_no + 1))?;

        let cell = |column: Column| {
            obj.iter()
                .find(|(key, _)| column.matches_header(key))
                .and_then(|(_, value)| json_to_cell(value))
        };
        sink.push(
            RowLocation::Row(row_no + 1),
            record_from_cells(cell, options.number_format),
        );
    }

    Ok(sink.finish())
}

fn json_to_cell(value: &JsonValue) -> Option<Cell> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(Cell::text(s.as_str())),
        JsonValue::Number(n) => Some(Cell::number(n.to_string())),
        JsonValue::Bool(b) => Some(Cell::text(b.to_string())),
        other => Some(Cell::text(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas or Polars. Every cell is rendered
/// to text by Arrow and then goes through the same conversion as CSV.
fn load_parquet(path: &Path, options: &LoadOptions) -> Result<RecordStore> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    // Checked up front so a file without row groups is still validated.
    let index = ColumnIndex::resolve(builder.schema().fields().iter().map(|f| f.name().as_str()))
        .context("resolving parquet columns")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut sink = RecordSink::new();
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        for row in 0..batch.num_rows() {
            let cell = |column: Column| {
                let col = batch.column(index.position(column)?);
                arrow_cell(col, row)
            };
            sink.push(
                RowLocation::Row(row_offset + row + 1),
                record_from_cells(cell, options.number_format),
            );
        }
        row_offset += batch.num_rows();
    }

    Ok(sink.finish())
}

fn arrow_cell(col: &Arc<dyn Array>, row: usize) -> Option<Cell> {
    if col.is_null(row) {
        return None;
    }
    let text = array_value_to_string(col.as_ref(), row).ok()?;
    Some(Cell {
        text,
        numeric: col.data_type().is_numeric(),
    })
}
