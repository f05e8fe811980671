use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Series palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_color32(Hsl::new(hue, 0.75, 0.55))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Density colour scale
// ---------------------------------------------------------------------------

/// Colour of a density cell.
///
/// `count` is scaled logarithmically against `max`; empty cells are transparent
/// and the scale runs from dark blue through green to yellow.
pub fn density_color(count: u64, max: u64) -> Color32 {
    if count == 0 || max == 0 {
        return Color32::TRANSPARENT;
    }
    let t = ((count as f32).ln_1p() / (max as f32).ln_1p()).clamp(0.0, 1.0);
    let hue = 240.0 - 180.0 * t;
    let lightness = 0.25 + 0.35 * t;
    hsl_to_color32(Hsl::new(hue, 0.85, lightness))
}

fn hsl_to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}
