//! Confidence gating and exponential smoothing of raw gaze samples.

use tracing::debug;

use super::{Point, Viewport};

/// EMA factor: weight of the newest sample.
pub const SMOOTHING_ALPHA: f64 = 0.15;

/// Samples whose average positional standard deviation (pixels) exceeds
/// this are dropped.
pub const CONFIDENCE_MAX_STD_PX: f64 = 45.0;

// ── Raw sample ──────────────────────────────────────────────

/// 2x2 positional covariance reported by the gaze provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance(pub [[f64; 2]; 2]);

impl Covariance {
    /// `sqrt((varX + varY) / 2)`. Negative or non-numeric variances count
    /// as zero so a half-broken matrix never rejects a sample on its own.
    pub fn avg_std(&self) -> f64 {
        let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let var_x = sanitize(self.0[0][0]);
        let var_y = sanitize(self.0[1][1]);
        ((var_x + var_y) / 2.0).sqrt()
    }

    /// Covariance with equal variance on both axes.
    pub fn isotropic(std_px: f64) -> Self {
        let var = std_px * std_px;
        Self([[var, 0.0], [0.0, var]])
    }
}

/// One sample from the external gaze provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGazeSample {
    pub x: f64,
    pub y: f64,
    /// Absent means the provider gave no confidence estimate.
    pub covariance: Option<Covariance>,
    /// Monotonic milliseconds.
    pub timestamp_ms: u64,
}

impl RawGazeSample {
    pub fn new(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            covariance: None,
            timestamp_ms,
        }
    }

    pub fn with_covariance(mut self, covariance: Covariance) -> Self {
        self.covariance = Some(covariance);
        self
    }
}

// ── Filter ──────────────────────────────────────────────────

/// Exponential moving average over clamped, confidence-gated samples.
#[derive(Debug, Clone, Default)]
pub struct GazeSignalFilter {
    smoothed: Option<Point>,
    /// Samples dropped for low confidence since creation.
    pub rejected: u64,
}

impl GazeSignalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Returns the new smoothed point, or `None` when the
    /// sample was skipped (state untouched).
    pub fn process(&mut self, sample: &RawGazeSample, viewport: &Viewport) -> Option<Point> {
        if !(sample.x.is_finite() && sample.y.is_finite()) {
            debug!("Gaze filter: non-finite sample at {}ms", sample.timestamp_ms);
            self.rejected += 1;
            return None;
        }

        if let Some(cov) = sample.covariance {
            let avg_std = cov.avg_std();
            if avg_std > CONFIDENCE_MAX_STD_PX {
                debug!(
                    "Gaze filter: skipping noisy sample (std {:.1}px) at {}ms",
                    avg_std, sample.timestamp_ms
                );
                self.rejected += 1;
                return None;
            }
        }

        let raw = viewport.clamp(Point::new(sample.x, sample.y));
        let next = match self.smoothed {
            Some(prev) => Point::new(
                prev.x * (1.0 - SMOOTHING_ALPHA) + raw.x * SMOOTHING_ALPHA,
                prev.y * (1.0 - SMOOTHING_ALPHA) + raw.y * SMOOTHING_ALPHA,
            ),
            None => raw,
        };
        self.smoothed = Some(next);
        Some(next)
    }

    /// Current smoothed point, if any sample has been accepted.
    pub fn current(&self) -> Option<Point> {
        self.smoothed
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}

// ── Tests ───────────────────────────────────────────────────
