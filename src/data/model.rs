use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use super::age::AgeBucket;
use super::schema::fold_accents;

// ---------------------------------------------------------------------------
// MovementBalance – hiring vs. termination
// ---------------------------------------------------------------------------

/// Net-movement sign of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MovementBalance {
    #[default]
    Admission,
    Termination,
    /// Any other balance value (e.g. `Transferência`), kept verbatim. Such
    /// records are neither hirings nor terminations but still movements.
    Other(String),
}

impl MovementBalance {
    pub fn label(&self) -> &str {
        match self {
            MovementBalance::Admission => "Admissão",
            MovementBalance::Termination => "Desligamento",
            MovementBalance::Other(raw) => raw,
        }
    }

    /// Accepts the cleaned labels (with or without accents) and the raw
    /// CAGED `saldomovimentação` codes `1` / `-1`. Anything else becomes
    /// [`MovementBalance::Other`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match fold_accents(trimmed).to_ascii_lowercase().as_str() {
            "admissao" | "1" | "+1" => MovementBalance::Admission,
            "desligamento" | "-1" => MovementBalance::Termination,
            _ => MovementBalance::Other(trimmed.to_string()),
        }
    }

    /// Admission or termination.
    pub fn is_known(&self) -> bool {
        !matches!(self, MovementBalance::Other(_))
    }
}

impl fmt::Display for MovementBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for MovementBalance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the movement table
// ---------------------------------------------------------------------------

/// A single employment-movement event.
///
/// Required attributes are plain values; everything the source may leave
/// blank is an `Option` and a blank/unparseable cell becomes `None`.
///
/// Serializes with the CAGED column names, so an exported record file can be
/// opened again by the loader.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    #[serde(rename = "uf")]
    pub state: Option<String>,
    #[serde(rename = "municipio")]
    pub city: String,
    /// Negative or unparseable ages are stored as `None`.
    #[serde(rename = "idade")]
    pub age: Option<u32>,
    #[serde(rename = "racacor")]
    pub race: Option<String>,
    #[serde(rename = "cbo2002ocupacao")]
    pub occupation: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "graudeinstrucao")]
    pub education: Option<String>,
    #[serde(rename = "sexo")]
    pub gender: String,
    #[serde(rename = "tipoempregador")]
    pub employer_type: Option<String>,
    #[serde(rename = "tipoestabelecimento")]
    pub establishment_type: Option<String>,
    #[serde(rename = "tipomovimentacao")]
    pub movement_type: Option<String>,
    #[serde(rename = "tipodedeficiencia")]
    pub disability: Option<String>,
    #[serde(rename = "indtrabintermitente")]
    pub intermittent: Option<bool>,
    #[serde(rename = "indtrabparcial")]
    pub partial: Option<bool>,
    /// Non-negative when present.
    #[serde(rename = "salario")]
    pub salary: Option<f64>,
    #[serde(rename = "secao")]
    pub section: String,
    #[serde(rename = "valorsalariofixo")]
    pub fixed_salary: Option<f64>,
    #[serde(rename = "ano_declarado")]
    pub declared_year: i32,
    #[serde(rename = "mes_declarado")]
    pub declared_month: Option<u32>,
    #[serde(rename = "ano_exclusao")]
    pub exclusion_year: Option<i32>,
    #[serde(rename = "mes_exclusao")]
    pub exclusion_month: Option<u32>,
    #[serde(rename = "saldomovimentacao")]
    pub balance: MovementBalance,
}

impl Record {
    /// Derived on demand, never stored.
    pub fn age_bucket(&self) -> Option<AgeBucket> {
        self.age.map(AgeBucket::from_age)
    }

    pub fn is_termination(&self) -> bool {
        self.balance == MovementBalance::Termination
    }
}

// ---------------------------------------------------------------------------
// RecordStore – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Immutable table of records with the distinct values the filter controls
/// offer, computed once at load time.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    years: BTreeSet<i32>,
    cities: BTreeSet<String>,
    genders: BTreeSet<String>,
    sections: BTreeSet<String>,
    /// Source rows dropped because a required attribute was unusable.
    skipped_rows: usize,
}

impl RecordStore {
    /// Build the filter domains from the loaded records.
    pub fn from_records(records: Vec<Record>, skipped_rows: usize) -> Self {
        let mut years = BTreeSet::new();
        let mut cities = BTreeSet::new();
        let mut genders = BTreeSet::new();
        let mut sections = BTreeSet::new();

        for record in &records {
            years.insert(record.declared_year);
            if !cities.contains(&record.city) {
                cities.insert(record.city.clone());
            }
            if !genders.contains(&record.gender) {
                genders.insert(record.gender.clone());
            }
            if !sections.contains(&record.section) {
                sections.insert(record.section.clone());
            }
        }

        RecordStore {
            records,
            years,
            cities,
            genders,
            sections,
            skipped_rows,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn cities(&self) -> &BTreeSet<String> {
        &self.cities
    }

    pub fn genders(&self) -> &BTreeSet<String> {
        &self.genders
    }

    pub fn sections(&self) -> &BTreeSet<String> {
        &self.sections
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(city: &str, gender: &str, year: i32) -> Record {
        Record {
            city: city.to_string(),
            gender: gender.to_string(),
            section: "Comércio".to_string(),
            declared_year: year,
            ..Record::default()
        }
    }

    #[test]
    fn balance_accepts_labels_and_codes() {
        assert_eq!(MovementBalance::parse("Admissão"), MovementBalance::Admission);
        assert_eq!(MovementBalance::parse("admissao"), MovementBalance::Admission);
        assert_eq!(MovementBalance::parse(" DESLIGAMENTO "), MovementBalance::Termination);
        assert_eq!(MovementBalance::parse("-1"), MovementBalance::Termination);
        assert_eq!(MovementBalance::parse("1"), MovementBalance::Admission);
    }

    #[test]
    fn other_balances_are_kept_verbatim() {
        let other = MovementBalance::parse(" Transferência ");
        assert_eq!(other, MovementBalance::Other("Transferência".to_string()));
        assert_eq!(other.label(), "Transferência");
        assert!(!other.is_known());
        assert!(MovementBalance::Termination.is_known());
        assert_eq!(MovementBalance::parse("0").label(), "0");
    }

    #[test]
    fn store_collects_sorted_filter_domains() {
        let store = RecordStore::from_records(
            vec![
                record("Recife", "Mulher", 2022),
                record("Olinda", "Homem", 2021),
                record("Recife", "Homem", 2021),
            ],
            1,
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.skipped_rows(), 1);
        assert_eq!(store.years().iter().copied().collect::<Vec<_>>(), vec![2021, 2022]);
        assert_eq!(
            store.cities().iter().cloned().collect::<Vec<_>>(),
            vec!["Olinda".to_string(), "Recife".to_string()]
        );
        assert_eq!(store.genders().len(), 2);
        assert_eq!(store.sections().len(), 1);
    }

    #[test]
    fn age_bucket_is_absent_without_age() {
        let mut r = record("Recife", "Homem", 2021);
        assert_eq!(r.age_bucket(), None);
        r.age = Some(30);
        assert_eq!(r.age_bucket(), Some(AgeBucket::From25To34));
    }
}
