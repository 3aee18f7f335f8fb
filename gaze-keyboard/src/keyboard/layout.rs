//! Target-region builders for the keyboard and prediction screens.
//!
//! Each builder returns a fresh snapshot for the given viewport; callers
//! hand it to `GazeEngine::set_regions` on every screen switch or resize.

use crate::gaze::hit_test::{Rect, TargetRegion};
use crate::gaze::Viewport;

pub const BACKSPACE: &str = "BACKSPACE";
pub const SPACE: &str = "SPACE";
pub const TEXT: &str = "TEXT";
pub const BACK_TO_KEYBOARD: &str = "BACK_TO_KEYBOARD";
pub const PREDICTION_PREFIX: &str = "PREDICTION_";

/// Three-row QWERTY layout, top to bottom.
pub const KEYBOARD_ROWS: [&[&str]; 3] = [
    &["Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P"],
    &["A", "S", "D", "F", "G", "H", "J", "K", "L", BACKSPACE],
    &["Z", "X", "C", "V", "B", "N", "M", TEXT],
];

/// Region id of prediction option `index`.
pub fn prediction_id(index: usize) -> String {
    format!("{}{}", PREDICTION_PREFIX, index)
}

/// Index encoded in a prediction region id.
pub fn parse_prediction_id(id: &str) -> Option<usize> {
    id.strip_prefix(PREDICTION_PREFIX)?.parse().ok()
}

/// Screen geometry shared by both layouts.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Fraction of viewport height above the layout (typed-text area).
    pub top_fraction: f64,
    /// Outer margin in pixels.
    pub margin_px: f64,
    /// Gap between neighbouring regions in pixels.
    pub gap_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.25,
            margin_px: 16.0,
            gap_px: 8.0,
        }
    }
}

impl LayoutConfig {
    /// Area available below the text display.
    fn content_area(&self, viewport: &Viewport) -> Rect {
        Rect::new(
            self.margin_px,
            viewport.height * self.top_fraction,
            viewport.width - self.margin_px,
            viewport.height - self.margin_px,
        )
    }

    fn inset(&self, r: Rect) -> Rect {
        let half = self.gap_px / 2.0;
        Rect::new(r.left + half, r.top + half, r.right - half, r.bottom - half)
    }
}

/// Keyboard keys. Every key has the same width; shorter rows are centred.
pub fn keyboard_regions(viewport: &Viewport, config: &LayoutConfig) -> Vec<TargetRegion> {
    let area = config.content_area(viewport);
    let widest = KEYBOARD_ROWS.iter().map(|r| r.len()).max().unwrap_or(1) as f64;
    let key_w = area.width() / widest;
    let row_h = area.height() / KEYBOARD_ROWS.len() as f64;

    let mut regions = Vec::with_capacity(KEYBOARD_ROWS.iter().map(|r| r.len()).sum());
    for (row_idx, row) in KEYBOARD_ROWS.iter().enumerate() {
        let y = area.top + row_idx as f64 * row_h;
        let x0 = area.left + (widest - row.len() as f64) * key_w / 2.0;
        for (col, key) in row.iter().enumerate() {
            let cell = Rect::from_origin_size(x0 + col as f64 * key_w, y, key_w, row_h);
            regions.push(TargetRegion::new(*key, config.inset(cell)));
        }
    }
    regions
}

/// One full-width row per prediction, then a full-width back button.
pub fn prediction_regions(
    viewport: &Viewport,
    count: usize,
    config: &LayoutConfig,
) -> Vec<TargetRegion> {
    let area = config.content_area(viewport);
    let row_h = area.height() / (count + 1) as f64;

    let mut regions: Vec<TargetRegion> = (0..count)
        .map(|i| {
            let cell = Rect::from_origin_size(
                area.left,
                area.top + i as f64 * row_h,
                area.width(),
                row_h,
            );
            TargetRegion::new(prediction_id(i), config.inset(cell))
        })
        .collect();

    let back = Rect::from_origin_size(
        area.left,
        area.top + count as f64 * row_h,
        area.width(),
        row_h,
    );
    regions.push(TargetRegion::new(BACK_TO_KEYBOARD, config.inset(back)));
    regions
}
