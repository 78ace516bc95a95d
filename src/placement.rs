//! Translate a position given as fractions of the page (top-left origin)
//! into PDF user space (bottom-left origin, points).

/// Font size of every rendered signature, in points.
pub const SIGNATURE_FONT_SIZE: f64 = 24.0;

/// Fill color of every rendered signature, RGB in `0.0..=1.0`.
pub const SIGNATURE_COLOR: (f64, f64, f64) = (0.0, 0.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Fractions outside `0.0..=1.0` are not rejected, they land off the page.
pub fn resolve_placement(
    page_width: f64,
    page_height: f64,
    x_percent: f64,
    y_percent: f64,
) -> Point {
    Point {
        x: x_percent * page_width,
        y: page_height - (y_percent * page_height),
    }
}
