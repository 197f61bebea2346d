//! Terminal rendering of heatmap surfaces.

use issue_map_decorator::HeatmapSurface;

/// Shades from cold to hot.
const RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Character for an intensity in `[0, 1]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn shade(value: f64) -> char {
    if !value.is_finite() || value <= 0.0 {
        return RAMP[0];
    }
    let last = RAMP.len() - 1;
    let idx = (value.min(1.0) * last as f64).ceil() as usize;
    RAMP[idx.min(last)]
}

/// Draws `surface` as text, north (`max_y`) up, inside a frame.
#[must_use]
pub fn render_ascii(surface: &HeatmapSurface) -> String {
    let border = format!("+{}+\n", "-".repeat(surface.columns));
    let rows: Vec<&[f64]> = surface.rows().collect();

    let mut out = String::with_capacity((surface.columns + 3) * (surface.rows + 2));
    out.push_str(&border);
    for row in rows.iter().rev() {
        out.push('|');
        out.extend(row.iter().map(|v| shade(*v)));
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}
