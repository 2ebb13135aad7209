use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::age::AgeBucket;
use super::model::Record;
use super::schema::Column;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A grouping produced numbers that cannot come out of a correct pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("group ({gender}, {age_bucket}, {year}) has no events")]
    DegenerateGroup {
        gender: String,
        age_bucket: AgeBucket,
        year: i32,
    },
    #[error(
        "group ({gender}, {age_bucket}, {year}) has {terminations} terminations out of {total} events"
    )]
    InconsistentGroup {
        gender: String,
        age_bucket: AgeBucket,
        year: i32,
        terminations: usize,
        total: usize,
    },
}

// ---------------------------------------------------------------------------
// Grouping keys
// ---------------------------------------------------------------------------

/// Categorical attribute usable in a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Section,
    Balance,
    Gender,
    MovementType,
    Education,
    Race,
    AgeBucket,
}

impl GroupKey {
    pub fn column_name(self) -> &'static str {
        match self {
            GroupKey::Section => Column::Section.display_name(),
            GroupKey::Balance => Column::Balance.display_name(),
            GroupKey::Gender => Column::Gender.display_name(),
            GroupKey::MovementType => Column::MovementType.display_name(),
            GroupKey::Education => Column::Education.display_name(),
            GroupKey::Race => Column::Race.display_name(),
            GroupKey::AgeBucket => "Faixa Etária",
        }
    }

    /// `None` when the record has no usable value for this attribute.
    pub fn value(self, record: &Record) -> Option<String> {
        match self {
            GroupKey::Section => Some(record.section.clone()),
            GroupKey::Balance => record
                .balance
                .is_known()
                .then(|| record.balance.label().to_string()),
            GroupKey::Gender => Some(record.gender.clone()),
            GroupKey::MovementType => record.movement_type.clone(),
            GroupKey::Education => record.education.clone(),
            GroupKey::Race => record.race.clone(),
            GroupKey::AgeBucket => record.age_bucket().map(|b| b.label().to_string()),
        }
    }

    fn key_of(keys: &[GroupKey], record: &Record) -> Option<Vec<String>> {
        keys.iter().map(|k| k.value(record)).collect()
    }

    fn column_names(keys: &[GroupKey]) -> Vec<String> {
        keys.iter().map(|k| k.column_name().to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Count aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub key: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTable {
    pub columns: Vec<String>,
    pub rows: Vec<CountRow>,
}

/// One row per distinct key tuple with the number of records sharing it.
/// Records missing any key attribute are left out.
pub fn count_by(records: &[&Record], keys: &[GroupKey]) -> CountTable {
    let mut groups: BTreeMap<Vec<String>, usize> = BTreeMap::new();
    for record in records {
        if let Some(key) = GroupKey::key_of(keys, record) {
            *groups.entry(key).or_default() += 1;
        }
    }

    CountTable {
        columns: GroupKey::column_names(keys),
        rows: groups
            .into_iter()
            .map(|(key, count)| CountRow { key, count })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Rate aggregation (Taxa de Desemprego)
// ---------------------------------------------------------------------------

type RateKey = (String, AgeBucket, i32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub gender: String,
    pub age_bucket: AgeBucket,
    pub year: i32,
    pub terminations: usize,
    pub total: usize,
    /// Percentage of terminations, `0..=100`.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    pub rows: Vec<RateRow>,
}

fn rate_groups(records: &[&Record], include: impl Fn(&Record) -> bool) -> BTreeMap<RateKey, usize> {
    let mut groups = BTreeMap::new();
    for &record in records {
        if !include(record) {
            continue;
        }
        if let Some(bucket) = record.age_bucket() {
            let key = (record.gender.clone(), bucket, record.declared_year);
            *groups.entry(key).or_default() += 1;
        }
    }
    groups
}

/// Termination percentage per (gender, age bucket, year).
///
/// Terminations and totals are grouped separately and joined on the totals'
/// keys, so a group without terminations reports `0`. Totals count every
/// movement, including ones whose balance is neither admission nor
/// termination. Records without an age have no bucket and do not take part.
pub fn unemployment_rate(records: &[&Record]) -> Result<RateTable, AggregationError> {
    let terminations = rate_groups(records, Record::is_termination);
    let totals = rate_groups(records, |_| true);

    let unbucketed = records.iter().filter(|r| r.age.is_none()).count();
    if unbucketed > 0 {
        log::debug!("{unbucketed} records without age left out of the rate table");
    }

    join_rate_groups(totals, &terminations)
}

fn join_rate_groups(
    totals: BTreeMap<RateKey, usize>,
    terminations: &BTreeMap<RateKey, usize>,
) -> Result<RateTable, AggregationError> {
    let rows = totals
        .into_iter()
        .map(|(key, total)| {
            let count = terminations.get(&key).copied().unwrap_or(0);
            let (gender, age_bucket, year) = key;
            if total == 0 {
                return Err(AggregationError::DegenerateGroup {
                    gender,
                    age_bucket,
                    year,
                });
            }
            if count > total {
                return Err(AggregationError::InconsistentGroup {
                    gender,
                    age_bucket,
                    year,
                    terminations: count,
                    total,
                });
            }
            Ok(RateRow {
                gender,
                age_bucket,
                year,
                terminations: count,
                total,
                rate: count as f64 / total as f64 * 100.0,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RateTable { rows })
}

// ---------------------------------------------------------------------------
// Mean aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanRow {
    pub key: Vec<String>,
    pub mean: f64,
    /// Records that contributed a salary.
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanTable {
    pub columns: Vec<String>,
    pub rows: Vec<MeanRow>,
}

/// Mean salary per key tuple; missing salaries are skipped, and a group made
/// only of missing salaries produces no row.
pub fn mean_salary_by(records: &[&Record], keys: &[GroupKey]) -> MeanTable {
    let mut groups: BTreeMap<Vec<String>, (f64, usize)> = BTreeMap::new();
    for record in records {
        let Some(salary) = record.salary else {
            continue;
        };
        if let Some(key) = GroupKey::key_of(keys, record) {
            let entry = groups.entry(key).or_insert((0.0, 0));
            entry.0 += salary;
            entry.1 += 1;
        }
    }

    MeanTable {
        columns: GroupKey::column_names(keys),
        rows: groups
            .into_iter()
            .map(|(key, (sum, samples))| MeanRow {
                key,
                mean: sum / samples as f64,
                samples,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub lower: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramTable {
    pub column: String,
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

/// Fixed-width histogram, one bin per non-empty `[k*w, (k+1)*w)`.
pub fn histogram(column: &str, values: impl IntoIterator<Item = f64>, bin_width: f64) -> HistogramTable {
    let mut bins: BTreeMap<i64, usize> = BTreeMap::new();
    if bin_width > 0.0 && bin_width.is_finite() {
        for value in values.into_iter().filter(|v| v.is_finite()) {
            let index = (value / bin_width).floor() as i64;
            *bins.entry(index).or_default() += 1;
        }
    }

    HistogramTable {
        column: column.to_string(),
        bin_width,
        bins: bins
            .into_iter()
            .map(|(index, count)| HistogramBin {
                lower: index as f64 * bin_width,
                count,
            })
            .collect(),
    }
}

pub fn age_histogram(records: &[&Record], bin_width: u32) -> HistogramTable {
    histogram(
        Column::Age.display_name(),
        records.iter().filter_map(|r| r.age).map(f64::from),
        f64::from(bin_width),
    )
}

pub fn salary_histogram(records: &[&Record], bin_width: f64) -> HistogramTable {
    histogram(
        Column::Salary.display_name(),
        records.iter().filter_map(|r| r.salary),
        bin_width,
    )
}
