//! Gaze-to-selection pipeline.
//!
//! raw sample → `filter` → `bias` → `hit_test` → `dwell` → selection event,
//! with `calibration` as an alternate consumer that gates `dwell`.
//! `engine::GazeEngine` owns one of each and runs a sample to completion
//! before accepting the next.

pub mod bias;
pub mod calibration;
pub mod dwell;
pub mod engine;
pub mod filter;

pub use engine::{EngineConfig, EngineEvent, GazeEngine};

use crate::error::EngineError;

/// A point in viewport pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, EngineError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(EngineError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    /// Parse a "WxH" resolution string, e.g. "1280x720".
    pub fn parse_resolution(s: &str) -> Option<Self> {
        let (w, h) = s.split_once('x')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        Self::new(w as f64, h as f64).ok()
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }

    /// Pixel position of a normalized `(fx, fy)` fraction.
    pub fn at_fraction(&self, fx: f64, fy: f64) -> Point {
        Point::new(fx * self.width, fy * self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}
