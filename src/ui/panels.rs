use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::DatasetId;
use crate::state::{AppState, TraceView, BIN_RANGE, DOMAIN_RANGE};

// ---------------------------------------------------------------------------
// Left side panel – histogram controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Histogram");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Transform ----
            let mut skip_log = !state.settings.log10;
            if ui
                .checkbox(&mut skip_log, "Don't take log₁₀ of data")
                .changed()
            {
                state.set_log10(!skip_log);
            }

            // ---- Bin count ----
            let mut bins = state.settings.bins;
            if ui
                .add(egui::Slider::new(&mut bins, BIN_RANGE).text("bins"))
                .on_hover_text("Number of bins used for the 1D and 2D histograms")
                .changed()
            {
                state.set_bins(bins);
            }

            // ---- Domain ----
            ui.add_space(4.0);
            ui.strong("Range");
            let mut lower = state.settings.lower;
            let mut upper = state.settings.upper;
            let lower_changed = ui
                .add(egui::Slider::new(&mut lower, DOMAIN_RANGE).step_by(0.1).text("from"))
                .changed();
            let upper_changed = ui
                .add(egui::Slider::new(&mut upper, DOMAIN_RANGE).step_by(0.1).text("to"))
                .changed();
            if lower_changed || upper_changed {
                state.set_domain(lower, upper);
            }
            if let Some(err) = &state.spec_error {
                ui.label(RichText::new(err.to_string()).color(Color32::RED));
            }

            ui.separator();
            trace_selector(ui, state);

            ui.separator();
            experiment_view(ui, state);
        });
}

/// Pick the dataset and trace shown in the 2D view.
fn trace_selector(ui: &mut Ui, state: &mut AppState) {
    ui.strong("2D-histogram");

    let candidates: Vec<(usize, String)> = state
        .transformed
        .iter()
        .enumerate()
        .filter(|(_, d)| d.has_traces())
        .map(|(i, d)| (i, d.name.clone()))
        .collect();
    if candidates.is_empty() {
        ui.label("No trace-structured dataset loaded.");
        return;
    }

    let current = state
        .selected_2d
        .and_then(|sel| candidates.iter().find(|(i, _)| *i == sel))
        .map(|(_, name)| name.clone())
        .unwrap_or_default();
    let mut selected = state.selected_2d;
    egui::ComboBox::from_id_salt("dataset_2d")
        .selected_text(current)
        .show_ui(ui, |ui: &mut Ui| {
            for (idx, name) in &candidates {
                ui.selectable_value(&mut selected, Some(*idx), name);
            }
        });
    if selected != state.selected_2d {
        state.select_2d(selected);
    }

    let n_traces = state.stack.as_ref().map(|s| s.len()).unwrap_or(0);
    if n_traces == 0 {
        return;
    }
    let mut summed = state.trace_view == TraceView::Summed;
    if ui.checkbox(&mut summed, "Sum over all traces").changed() {
        state.set_trace_view(if summed {
            TraceView::Summed
        } else {
            TraceView::Single(0)
        });
    }
    if let TraceView::Single(mut trace) = state.trace_view {
        if ui
            .add(egui::Slider::new(&mut trace, 0..=n_traces - 1).text("trace"))
            .changed()
        {
            state.set_trace_view(TraceView::Single(trace));
        }
    }
}

fn experiment_view(ui: &mut Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Experiment").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Load JSON…").clicked() {
                open_metadata_dialog(state);
            }
            ui.add_space(4.0);
            ui.monospace(state.experiment.to_pretty_json());
        });
}

// ---------------------------------------------------------------------------
// Dataset table
// ---------------------------------------------------------------------------

/// One row per loaded file, plus any load failures.
pub fn dataset_table(ui: &mut Ui, state: &mut AppState) {
    let mut remove = None;
    let binned = |id: DatasetId| {
        state
            .overlay
            .as_ref()
            .and_then(|o| o.entries.iter().find(|e| e.id == id))
            .map(|e| e.histogram.total().to_string())
            .unwrap_or_default()
    };
    let rows: Vec<[String; 6]> = state
        .datasets
        .iter()
        .zip(&state.transformed)
        .map(|(raw, t)| {
            [
                raw.name.clone(),
                raw.shape_label(),
                raw.len().to_string(),
                t.excluded.to_string(),
                raw.missing.to_string(),
                binned(raw.id),
            ]
        })
        .collect();

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(160.0))
        .column(Column::auto().at_least(120.0))
        .columns(Column::auto().at_least(70.0), 4)
        .column(Column::remainder())
        .header(18.0, |mut header| {
            for title in ["File", "Shape", "Samples", "Excluded", "Missing", "In range", ""] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (idx, cells) in rows.iter().enumerate() {
                body.row(18.0, |mut row| {
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                    row.col(|ui| {
                        if ui.small_button("✖").on_hover_text("Remove").clicked() {
                            remove = Some(idx);
                        }
                    });
                });
            }
        });

    for failure in &state.failures {
        ui.label(RichText::new(failure).color(Color32::RED));
    }
    if let Some(overlay) = &state.overlay {
        for warning in &overlay.warnings {
            ui.label(RichText::new(warning.to_string()).color(Color32::YELLOW));
        }
    }

    if let Some(idx) = remove {
        state.remove_dataset(idx);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_files_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load experiment metadata…").clicked() {
                open_metadata_dialog(state);
                ui.close_menu();
            }
            if ui.button("Clear").clicked() {
                state.clear_datasets();
                state.using_examples = false;
                state.status_message = None;
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.datasets.is_empty() {
            let total: usize = state.datasets.iter().map(|d| d.len()).sum();
            ui.label(format!(
                "{} file(s), {} samples",
                state.datasets.len(),
                total
            ));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if state.failures.is_empty() {
                Color32::LIGHT_GREEN
            } else {
                Color32::RED
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_files_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open break-junction traces")
        .add_filter("Supported files", &["csv", "txt", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_files();

    if let Some(paths) = files {
        state.load_files(&paths);
    }
}

pub fn open_metadata_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open experiment metadata")
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = state.load_metadata(&path) {
            log::error!("Failed to load metadata: {e:#}");
            state.failures.push(format!("{e:#}"));
            state.status_message = Some("Error loading experiment metadata".to_string());
        }
    }
}
