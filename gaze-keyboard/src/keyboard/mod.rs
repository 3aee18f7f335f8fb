//! On-screen keyboard: region layouts and text composition.

pub mod composer;
pub mod layout;

pub use composer::{ComposeOutcome, Screen, TextComposer};

use crate::gaze::hit_test::TargetRegion;
use crate::gaze::Viewport;
use layout::LayoutConfig;

/// Target snapshot for whatever `screen` is showing.
pub fn regions_for_screen(
    screen: &Screen,
    viewport: &Viewport,
    config: &LayoutConfig,
) -> Vec<TargetRegion> {
    match screen {
        Screen::Keyboard => layout::keyboard_regions(viewport, config),
        Screen::Predictions(options) => layout::prediction_regions(viewport, options.len(), config),
        Screen::Final { .. } => Vec::new(),
    }
}
