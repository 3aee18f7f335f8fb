//! Error taxonomy for operations the caller can be told "no" about.
//!
//! Signal-quality problems are never errors: noisy or malformed samples
//! are skipped inside the filter and only show up as a lack of progress.

use thiserror::Error;

/// A rejected engine operation. None of these are fatal; the caller is
/// expected to surface the message and carry on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A control action was requested while a calibration session owns
    /// the engine.
    #[error("cannot {action} while calibration is in progress")]
    CalibrationInProgress { action: &'static str },

    /// A calibration confirmation arrived with no session running.
    #[error("no calibration session is active")]
    NoActiveCalibration,

    /// Viewport dimensions must be positive and finite.
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    /// Dwell timeout must be at least one millisecond.
    #[error("invalid dwell timeout {0}ms")]
    InvalidDwellTimeout(u64),

    /// A recorded trace line could not be turned into an input event.
    #[error("trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
}

impl EngineError {
    /// Short machine-readable tag, printed with rejected trace input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalibrationInProgress { .. } => "calibration-in-progress",
            Self::NoActiveCalibration => "no-active-calibration",
            Self::InvalidViewport { .. } => "invalid-viewport",
            Self::InvalidDwellTimeout(_) => "invalid-dwell-timeout",
            Self::Trace { .. } => "trace",
        }
    }
}
