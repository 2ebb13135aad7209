use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::DashboardConfig;
use crate::data::filter::{filter_records, FilterSelection};
use crate::data::loader::load_file;
use crate::data::model::RecordStore;
use crate::data::pipeline::{render, DashboardTables, RenderSettings};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded record store (None until user loads a file).
    pub store: Option<RecordStore>,

    /// Current sidebar choices.
    pub selection: Option<FilterSelection>,

    /// Tables for the current selection (recomputed on every change).
    pub tables: Option<DashboardTables>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            store: None,
            selection: None,
            tables: None,
            status_message: None,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        self.config.render_settings()
    }

    /// Load a file and, on success, replace the current store.
    pub fn open(&mut self, path: &Path) {
        match load_file(path, &self.config.load_options()) {
            Ok(store) => self.set_store(store),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded store and pick the initial selection.
    pub fn set_store(&mut self, store: RecordStore) {
        self.selection = FilterSelection::first_in(&store);
        self.store = Some(store);
        self.status_message = None;
        self.rerender();
    }

    /// Swap in a new selection and recompute every table.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        if self.selection.as_ref() == Some(&selection) {
            return;
        }
        self.selection = Some(selection);
        self.rerender();
    }

    /// Write the current tables as pretty JSON.
    pub fn export_tables(&self, path: &Path) -> Result<()> {
        let tables = self.tables.as_ref().context("no tables to export")?;
        let json = serde_json::to_string_pretty(tables).context("serializing tables")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} tables to {}", tables.tables.len(), path.display());
        Ok(())
    }

    /// Write the records matching the current selection as a JSON array
    /// that [`load_file`] accepts.
    pub fn export_records(&self, path: &Path) -> Result<()> {
        let (Some(store), Some(selection)) = (&self.store, &self.selection) else {
            bail!("no records to export");
        };
        let subset = filter_records(store, selection);
        let json = serde_json::to_string_pretty(&subset).context("serializing records")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} records to {}", subset.len(), path.display());
        Ok(())
    }

    fn rerender(&mut self) {
        let settings = self.render_settings();
        self.tables = match (&self.store, &self.selection) {
            (Some(store), Some(selection)) => Some(render(store, selection, &settings)),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{MovementBalance, Record};
    use crate::data::pipeline::{AggregateTable, TableId};

    fn store() -> RecordStore {
        let record = |city: &str, year: i32| Record {
            city: city.to_string(),
            gender: "Homem".to_string(),
            section: "Comércio".to_string(),
            declared_year: year,
            age: Some(30),
            balance: MovementBalance::Termination,
            ..Record::default()
        };
        RecordStore::from_records(vec![record("Recife", 2021), record("Olinda", 2022)], 0)
    }

    #[test]
    fn new_store_renders_first_selection() {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_store(store());

        let tables = state.tables.as_ref().expect("tables rendered");
        assert_eq!(tables.selection.year, 2021);
        assert_eq!(tables.selection.city, "Olinda");
        assert_eq!(tables.matched_records, 0, "Olinda only has 2022 records");
    }

    #[test]
    fn changing_selection_rerenders() {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_store(store());
        let selection = state.selection.clone().expect("selection");

        state.set_selection(selection.with_city("Recife"));
        let tables = state.tables.as_ref().expect("tables rendered");
        assert_eq!(tables.selection.city, "Recife");
        assert_eq!(tables.matched_records, 1);

        state.set_selection(selection.with_year(2022));
        assert_eq!(state.tables.as_ref().map(|t| t.matched_records), Some(1));
    }

    #[test]
    fn failed_open_keeps_previous_store() {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_store(store());
        state.open(Path::new("does-not-exist.csv"));

        assert!(state.status_message.is_some());
        assert_eq!(state.store.as_ref().map(RecordStore::len), Some(2));
    }

    #[test]
    fn export_writes_json_tables() {
        let mut state = AppState::new(DashboardConfig::default());
        assert!(state.export_tables(Path::new("unused.json")).is_err());

        state.set_store(store());
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tables.json");
        state.export_tables(&path).expect("export");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read export"))
                .expect("valid json");

        assert_eq!(json["selection"]["city"], "Olinda");
        assert!(json["tables"]["unemployment_rate"].is_object());
    }

    #[test]
    fn exported_records_load_back() {
        let mut state = AppState::new(DashboardConfig::default());
        assert!(state.export_records(Path::new("unused.json")).is_err());

        state.set_store(store());
        let selection = state.selection.clone().expect("selection");
        state.set_selection(selection.with_city("Recife"));

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("records.json");
        state.export_records(&path).expect("export");
        let reloaded = load_file(&path, &state.config.load_options()).expect("reload");

        assert_eq!(reloaded.skipped_rows(), 0);
        assert_eq!(reloaded.records(), &store().records()[..1]);
    }

    #[test]
    fn transfers_in_a_loaded_file_dilute_the_rate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("movements.csv");
        std::fs::write(
            &path,
            "municipio,sexo,secao,saldo,ano,idade\n\
             Recife,Homem,Com,Desligamento,2021,30\n\
             Recife,Homem,Com,Transferencia,2021,30\n",
        )
        .expect("write fixture");

        let mut state = AppState::new(DashboardConfig::default());
        state.open(&path);
        assert_eq!(state.store.as_ref().map(RecordStore::skipped_rows), Some(0));

        let tables = state.tables.as_ref().expect("tables rendered");
        match tables.get(TableId::UnemploymentRate) {
            Some(Ok(AggregateTable::Rate(table))) => {
                let rows: Vec<_> = table
                    .rows
                    .iter()
                    .map(|row| (row.terminations, row.total, row.rate))
                    .collect();
                assert_eq!(rows, vec![(1, 2, 50.0)]);
            }
            other => panic!("unexpected rate outcome: {other:?}"),
        }
    }
}
