use std::fmt::Display;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::FilterSelection;
use crate::data::schema::Column;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros");
    ui.separator();

    let (Some(store), Some(current)) = (&state.store, &state.selection) else {
        ui.label("Nenhum dado carregado.");
        return;
    };

    // Each combo box proposes a replacement selection; the state is only
    // touched once, after all widgets have been drawn.
    let mut next: Option<FilterSelection> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(year) = combo(ui, Column::DeclaredYear, &current.year, store.years()) {
                next = Some(current.with_year(year));
            }
            if let Some(city) = combo(ui, Column::City, &current.city, store.cities()) {
                next = Some(current.with_city(&city));
            }
            if let Some(gender) = combo(ui, Column::Gender, &current.gender, store.genders()) {
                next = Some(current.with_gender(&gender));
            }
            if let Some(section) = combo(ui, Column::Section, &current.section, store.sections()) {
                next = Some(current.with_section(&section));
            }

            ui.separator();
            if let Some(tables) = &state.tables {
                ui.label(format!("{} movimentações selecionadas", tables.matched_records));
            }
        });

    if let Some(selection) = next {
        log::debug!("Filter changed: {selection:?}");
        state.set_selection(selection);
    }
}

/// One labelled combo box; returns the newly picked value, if any.
fn combo<'a, T>(
    ui: &mut Ui,
    column: Column,
    current: &T,
    values: impl IntoIterator<Item = &'a T>,
) -> Option<T>
where
    T: Clone + PartialEq + Display + 'a,
{
    let mut picked = None;
    ui.strong(column.display_name());
    egui::ComboBox::from_id_salt(column.display_name())
        .selected_text(current.to_string())
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for value in values {
                if ui
                    .selectable_label(value == current, value.to_string())
                    .clicked()
                    && value != current
                {
                    picked = Some(value.clone());
                }
            }
        });
    ui.add_space(6.0);
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.tables.is_some(), egui::Button::new("Exportar tabelas…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.selection.is_some(), egui::Button::new("Exportar registros filtrados…"))
                .clicked()
            {
                export_records_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(store) = &state.store {
            ui.label(format!(
                "{} registros carregados, {} descartados",
                store.len(),
                store.skipped_rows()
            ));
        }

        if let Some(tables) = &state.tables {
            let failed = tables.failures().count();
            if failed > 0 {
                ui.separator();
                ui.label(
                    RichText::new(format!("{failed} tabela(s) com erro"))
                        .color(Color32::YELLOW),
                );
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados do CAGED")
        .add_filter("Arquivos suportados", &["csv", "txt", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Exportar tabelas")
        .set_file_name("caged-tabelas.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_tables(&path) {
            log::error!("Failed to export tables: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

pub fn export_records_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Exportar registros filtrados")
        .set_file_name("caged-registros.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_records(&path) {
            log::error!("Failed to export records: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
