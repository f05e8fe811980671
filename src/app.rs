use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct NanoBreakApp {
    pub state: AppState,
}

impl NanoBreakApp {
    /// Session state from the environment, with example data from the working directory.
    pub fn new() -> Self {
        let mut state = AppState::from_env();
        match std::env::current_dir() {
            Ok(dir) => state.load_examples(&dir),
            Err(e) => log::warn!("cannot resolve working directory: {e}"),
        }
        Self { state }
    }
}

impl eframe::App for NanoBreakApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: histogram controls ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: loaded files ----
        egui::TopBottomPanel::bottom("dataset_panel")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                panels::dataset_table(ui, &mut self.state);
            });

        // ---- Central panel: 1D overlay above, 2D density below ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let half = (ui.available_height() / 2.0 - 24.0).max(160.0);
            ui.heading("1D-histogram");
            plot::overlay_plot(ui, &self.state, half);
            ui.separator();
            ui.heading("2D-histogram");
            plot::density_view(ui, &self.state);
        });
    }
}
