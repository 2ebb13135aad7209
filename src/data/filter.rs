use serde::Serialize;

use super::model::{Record, RecordStore};

// ---------------------------------------------------------------------------
// Filter selection: one value per sidebar control
// ---------------------------------------------------------------------------

/// The four sidebar choices for one render.
///
/// Built fresh whenever a control changes and passed explicitly into the
/// pipeline; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub year: i32,
    pub city: String,
    pub gender: String,
    pub section: String,
}

impl FilterSelection {
    pub fn new(
        year: i32,
        city: impl Into<String>,
        gender: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            year,
            city: city.into(),
            gender: gender.into(),
            section: section.into(),
        }
    }

    /// Initial selection: the first observed value of every control.
    /// `None` when the store is empty.
    pub fn first_in(store: &RecordStore) -> Option<Self> {
        Some(Self {
            year: *store.years().first()?,
            city: store.cities().first()?.clone(),
            gender: store.genders().first()?.clone(),
            section: store.sections().first()?.clone(),
        })
    }

    pub fn with_year(&self, year: i32) -> Self {
        Self { year, ..self.clone() }
    }

    pub fn with_city(&self, city: &str) -> Self {
        Self {
            city: city.to_string(),
            ..self.clone()
        }
    }

    pub fn with_gender(&self, gender: &str) -> Self {
        Self {
            gender: gender.to_string(),
            ..self.clone()
        }
    }

    pub fn with_section(&self, section: &str) -> Self {
        Self {
            section: section.to_string(),
            ..self.clone()
        }
    }

    /// All four predicates, exact equality.
    pub fn matches(&self, record: &Record) -> bool {
        record.declared_year == self.year
            && record.city == self.city
            && record.gender == self.gender
            && record.section == self.section
    }
}

/// Records passing every predicate of `selection`, in store order.
///
/// An empty result is a normal outcome, not an error.
pub fn filter_records<'a>(store: &'a RecordStore, selection: &FilterSelection) -> Vec<&'a Record> {
    store
        .records()
        .iter()
        .filter(|record| selection.matches(record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MovementBalance;

    fn record(city: &str, gender: &str, section: &str, year: i32) -> Record {
        Record {
            city: city.to_string(),
            gender: gender.to_string(),
            section: section.to_string(),
            declared_year: year,
            balance: MovementBalance::Admission,
            ..Record::default()
        }
    }

    fn store() -> RecordStore {
        RecordStore::from_records(
            vec![
                record("Recife", "Homem", "Comércio", 2021),
                record("Recife", "Mulher", "Comércio", 2021),
                record("Recife", "Homem", "Indústria", 2021),
                record("Olinda", "Homem", "Comércio", 2021),
                record("Recife", "Homem", "Comércio", 2022),
                record("Recife", "Homem", "Comércio", 2021),
            ],
            0,
        )
    }

    #[test]
    fn keeps_only_records_matching_all_predicates() {
        let store = store();
        let selection = FilterSelection::new(2021, "Recife", "Homem", "Comércio");
        let subset = filter_records(&store, &selection);

        assert_eq!(subset.len(), 2);
        assert!(subset.len() <= store.len());
        assert!(subset.iter().all(|r| selection.matches(r)));
    }

    #[test]
    fn equality_is_exact() {
        let store = store();
        let selection = FilterSelection::new(2021, "recife", "Homem", "Comércio");
        assert!(filter_records(&store, &selection).is_empty());
    }

    #[test]
    fn no_match_yields_empty_subset() {
        let store = store();
        let selection = FilterSelection::new(1999, "Caruaru", "Mulher", "Agricultura");
        assert!(filter_records(&store, &selection).is_empty());
    }

    #[test]
    fn every_selection_is_bounded_by_the_store() {
        let store = store();
        for &year in store.years() {
            for city in store.cities() {
                for gender in store.genders() {
                    for section in store.sections() {
                        let selection = FilterSelection::new(year, city, gender, section);
                        let subset = filter_records(&store, &selection);
                        assert!(subset.len() <= store.len());
                        assert!(subset.iter().all(|r| selection.matches(r)));
                    }
                }
            }
        }
    }

    #[test]
    fn first_in_picks_sorted_first_values() {
        let selection = FilterSelection::first_in(&store()).expect("store is not empty");
        assert_eq!(selection, FilterSelection::new(2021, "Olinda", "Homem", "Comércio"));
        assert!(FilterSelection::first_in(&RecordStore::default()).is_none());
    }

    #[test]
    fn with_helpers_replace_one_value() {
        let base = FilterSelection::new(2021, "Recife", "Homem", "Comércio");
        let changed = base.with_gender("Mulher");
        assert_eq!(changed.gender, "Mulher");
        assert_eq!(changed.city, base.city);
        assert_eq!(base.with_year(2022).year, 2022);
    }
}
