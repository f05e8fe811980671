use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::color::{density_color, generate_palette};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// 1D overlay plot
// ---------------------------------------------------------------------------

/// One line per dataset: counts against bin center.
pub fn overlay_plot(ui: &mut Ui, state: &AppState, height: f32) {
    let Some(overlay) = &state.overlay else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open one or more trace files  (File → Open…)");
        });
        return;
    };

    let colors = generate_palette(overlay.len());
    let x_label = if state.settings.log10 {
        "Conductance  log10(G/G0)"
    } else {
        "Conductance  G/G0"
    };

    Plot::new("overlay_plot")
        .legend(Legend::default())
        .height(height)
        .x_axis_label(x_label)
        .y_axis_label("Counts")
        .include_x(overlay.spec.lower())
        .include_x(overlay.spec.upper())
        .include_y(0.0)
        .include_y(overlay.max_count() as f64 * 1.05)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (entry, color) in overlay.entries.iter().zip(colors) {
                let points: PlotPoints = entry
                    .histogram
                    .pairs()
                    .map(|(center, count)| [center, count as f64])
                    .collect();

                let line = Line::new(points)
                    .name(&entry.name)
                    .color(color)
                    .width(1.5);

                plot_ui.line(line);
            }
        });
}

// ---------------------------------------------------------------------------
// 2D density view
// ---------------------------------------------------------------------------

/// Value × position density of the selected dataset, drawn cell by cell.
pub fn density_view(ui: &mut Ui, state: &AppState) {
    let (Some(stack), Some(grid)) = (&state.stack, &state.density) else {
        ui.label("No trace-structured dataset selected.");
        return;
    };

    let bins = grid.bins;
    let size = egui::vec2(ui.available_width(), ui.available_height().max(200.0));
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::from_gray(16));

    if bins == 0 {
        return;
    }

    // Value axis upwards, position axis to the right.
    let cell_w = rect.width() / bins as f32;
    let cell_h = rect.height() / bins as f32;
    for value_bin in 0..bins {
        for position_bin in 0..bins {
            let count = grid.count(value_bin, position_bin);
            if count == 0 {
                continue;
            }
            let min = egui::pos2(
                rect.left() + position_bin as f32 * cell_w,
                rect.bottom() - (value_bin + 1) as f32 * cell_h,
            );
            let cell = Rect::from_min_size(min, egui::vec2(cell_w.ceil(), cell_h.ceil()));
            painter.rect_filled(cell, 0.0, density_color(count, grid.max));
        }
    }

    let (lo, hi) = stack.value_domain;
    let font = FontId::monospace(11.0);
    let text_color = Color32::LIGHT_GRAY;
    painter.text(
        rect.left_top() + egui::vec2(4.0, 4.0),
        Align2::LEFT_TOP,
        format!("{hi}"),
        font.clone(),
        text_color,
    );
    painter.text(
        rect.left_bottom() + egui::vec2(4.0, -4.0),
        Align2::LEFT_BOTTOM,
        format!("{lo}"),
        font.clone(),
        text_color,
    );
    painter.text(
        rect.right_bottom() + egui::vec2(-4.0, -4.0),
        Align2::RIGHT_BOTTOM,
        "trace position →",
        font,
        text_color,
    );

    if let Some(pos) = response.hover_pos() {
        let position_bin = (((pos.x - rect.left()) / cell_w) as usize).min(bins - 1);
        let value_bin = (((rect.bottom() - pos.y) / cell_h) as usize).min(bins - 1);
        let value = stack.value_centers()[value_bin];
        let count = grid.count(value_bin, position_bin);
        let position = match grid.position_upper {
            Some(len) => {
                let width = len / bins as f64;
                format!(
                    "samples {:.0}–{:.0}",
                    position_bin as f64 * width,
                    (position_bin + 1) as f64 * width
                )
            }
            None => format!("position bin {position_bin}/{bins}"),
        };
        response.on_hover_text(format!(
            "log10(G/G0) ≈ {value:.2}\n{position}\ncount {count}"
        ));
    }
}
