use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::aggregate::{
    age_histogram, count_by, mean_salary_by, salary_histogram, unemployment_rate,
    AggregationError, CountTable, GroupKey, HistogramTable, MeanTable, RateTable,
};
use super::filter::{filter_records, FilterSelection};
use super::model::RecordStore;

// ---------------------------------------------------------------------------
// Table identifiers
// ---------------------------------------------------------------------------

/// Every table the dashboard draws, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    UnemploymentRate,
    MovementsBySection,
    MovementsByType,
    MovementsByEducation,
    MovementsByAgeBucket,
    MeanSalaryBySection,
    MeanSalaryBySectionRace,
    AgeDistribution,
    SalaryDistribution,
}

impl TableId {
    pub const ALL: [TableId; 9] = [
        TableId::UnemploymentRate,
        TableId::MovementsBySection,
        TableId::MovementsByType,
        TableId::MovementsByEducation,
        TableId::MovementsByAgeBucket,
        TableId::MeanSalaryBySection,
        TableId::MeanSalaryBySectionRace,
        TableId::AgeDistribution,
        TableId::SalaryDistribution,
    ];

    /// Chart title.
    pub fn title(self) -> &'static str {
        match self {
            TableId::UnemploymentRate => "Taxa de Desemprego por Sexo e Faixa Etária",
            TableId::MovementsBySection => "Admissões e Desligamentos por Seção",
            TableId::MovementsByType => "Movimentações por Tipo",
            TableId::MovementsByEducation => "Movimentações por Grau de Instrução",
            TableId::MovementsByAgeBucket => "Movimentações por Faixa Etária",
            TableId::MeanSalaryBySection => "Salário Médio por Seção",
            TableId::MeanSalaryBySectionRace => "Salário Médio por Seção e Raça/Cor",
            TableId::AgeDistribution => "Distribuição de Idade",
            TableId::SalaryDistribution => "Distribuição de Salário",
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateTable {
    Count(CountTable),
    Rate(RateTable),
    Mean(MeanTable),
    Histogram(HistogramTable),
}

impl AggregateTable {
    pub fn row_count(&self) -> usize {
        match self {
            AggregateTable::Count(t) => t.rows.len(),
            AggregateTable::Rate(t) => t.rows.len(),
            AggregateTable::Mean(t) => t.rows.len(),
            AggregateTable::Histogram(t) => t.bins.len(),
        }
    }
}

/// Per-render knobs that do not change the filter semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub age_bin_width: u32,
    pub salary_bin_width: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            age_bin_width: 5,
            salary_bin_width: 500.0,
        }
    }
}

/// Output of one render: each table is computed on its own, so a failure in
/// one leaves the others intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardTables {
    pub selection: FilterSelection,
    pub matched_records: usize,
    #[serde(serialize_with = "serialize_outcomes")]
    pub tables: BTreeMap<TableId, Result<AggregateTable, AggregationError>>,
}

impl DashboardTables {
    pub fn get(&self, id: TableId) -> Option<&Result<AggregateTable, AggregationError>> {
        self.tables.get(&id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (TableId, &AggregationError)> {
        self.tables
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().err().map(|err| (*id, err)))
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutcomeView<'a> {
    Table(&'a AggregateTable),
    Error { error: String },
}

fn serialize_outcomes<S: Serializer>(
    tables: &BTreeMap<TableId, Result<AggregateTable, AggregationError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(tables.iter().map(|(id, outcome)| {
        let view = match outcome {
            Ok(table) => OutcomeView::Table(table),
            Err(err) => OutcomeView::Error {
                error: err.to_string(),
            },
        };
        (*id, view)
    }))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Filter the store with `selection` and build every dashboard table.
///
/// Pure: the same store and selection always give the same tables.
pub fn render(
    store: &RecordStore,
    selection: &FilterSelection,
    settings: &RenderSettings,
) -> DashboardTables {
    let subset = filter_records(store, selection);
    log::debug!(
        "selection {:?} matched {} of {} records",
        selection,
        subset.len(),
        store.len()
    );

    let tables = TableId::ALL
        .into_iter()
        .map(|id| {
            let outcome = match id {
                TableId::UnemploymentRate => unemployment_rate(&subset).map(AggregateTable::Rate),
                TableId::MovementsBySection => Ok(AggregateTable::Count(count_by(
                    &subset,
                    &[GroupKey::Section, GroupKey::Balance, GroupKey::Gender],
                ))),
                TableId::MovementsByType => Ok(AggregateTable::Count(count_by(
                    &subset,
                    &[GroupKey::MovementType],
                ))),
                TableId::MovementsByEducation => Ok(AggregateTable::Count(count_by(
                    &subset,
                    &[GroupKey::Education, GroupKey::Balance],
                ))),
                TableId::MovementsByAgeBucket => Ok(AggregateTable::Count(count_by(
                    &subset,
                    &[GroupKey::AgeBucket, GroupKey::Balance],
                ))),
                TableId::MeanSalaryBySection => Ok(AggregateTable::Mean(mean_salary_by(
                    &subset,
                    &[GroupKey::Section],
                ))),
                TableId::MeanSalaryBySectionRace => Ok(AggregateTable::Mean(mean_salary_by(
                    &subset,
                    &[GroupKey::Section, GroupKey::Race],
                ))),
                TableId::AgeDistribution => Ok(AggregateTable::Histogram(age_histogram(
                    &subset,
                    settings.age_bin_width,
                ))),
                TableId::SalaryDistribution => Ok(AggregateTable::Histogram(salary_histogram(
                    &subset,
                    settings.salary_bin_width,
                ))),
            };
            if let Err(err) = &outcome {
                log::warn!("{} could not be computed: {err}", id.title());
            }
            (id, outcome)
        })
        .collect();

    DashboardTables {
        selection: selection.clone(),
        matched_records: subset.len(),
        tables,
    }
}
