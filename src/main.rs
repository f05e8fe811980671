mod app;
mod color;
mod data;
mod metadata;
mod state;
mod ui;

use app::NanoBreakApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "NanoBreakVis – Break-Junction Visualizer",
        options,
        Box::new(|_cc| Ok(Box::new(NanoBreakApp::new()))),
    )
}
