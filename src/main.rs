mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::CagedDashboardApp;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut state = match DashboardConfig::load() {
        Ok(config) => AppState::new(config),
        Err(e) => {
            log::error!("Invalid configuration, using defaults: {e}");
            let mut state = AppState::new(DashboardConfig::default());
            state.status_message = Some(format!("Error: {e}"));
            state
        }
    };

    if let Some(path) = state.config.data_path.clone() {
        state.open(&path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dashboard do CAGED",
        options,
        Box::new(|_cc| Ok(Box::new(CagedDashboardApp::new(state)))),
    )
}
