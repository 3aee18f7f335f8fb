//! Nine-point calibration protocol and bias-grid fitting.
//!
//! The session walks the 3x3 grid of normalized positions in row-major
//! order, asking for two confirmations per point (18 in total). At every
//! confirmation it records the latest filtered gaze point against the
//! on-screen target; once all points are confirmed a `GridFitter` turns
//! those observations into a `CalibrationGrid`.

use tracing::{debug, info};

use super::bias::{BiasVector, CalibrationGrid, CALIBRATION_FRACTIONS};
use super::{Point, Viewport};

/// Confirmations required on each point before advancing.
pub const CLICKS_PER_POINT: usize = 2;

/// Number of calibration points.
pub const POINT_COUNT: usize = 9;

/// Confirmations required for a full session.
pub const TOTAL_REQUIRED_CLICKS: usize = POINT_COUNT * CLICKS_PER_POINT;

/// Normalized `(fx, fy)` of point `index` (row-major over the grid).
pub fn point_fraction(index: usize) -> (f64, f64) {
    let row = (index / 3).min(2);
    let col = index % 3;
    (CALIBRATION_FRACTIONS[col], CALIBRATION_FRACTIONS[row])
}

// ── Observations & fitting ──────────────────────────────────

/// Gaze position recorded while the user confirmed a calibration point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationObservation {
    pub point_index: usize,
    /// Where the dot was drawn.
    pub target: Point,
    /// Filtered (uncorrected) gaze at confirmation time.
    pub observed: Point,
}

/// Converts a finished session's observations into grid biases.
pub trait GridFitter: Send {
    fn fit(&self, observations: &[CalibrationObservation]) -> CalibrationGrid;
}

/// Each cell's bias is `target - mean(observed)` over that point's
/// observations. Points never observed keep zero bias.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanOffsetFitter;

impl GridFitter for MeanOffsetFitter {
    fn fit(&self, observations: &[CalibrationObservation]) -> CalibrationGrid {
        let mut sums = [(0.0f64, 0.0f64, 0usize); POINT_COUNT];
        for obs in observations.iter().filter(|o| o.point_index < POINT_COUNT) {
            let s = &mut sums[obs.point_index];
            s.0 += obs.target.x - obs.observed.x;
            s.1 += obs.target.y - obs.observed.y;
            s.2 += 1;
        }

        let mut grid = CalibrationGrid::default();
        for (index, (sum_dx, sum_dy, n)) in sums.iter().enumerate() {
            if *n == 0 {
                continue;
            }
            grid.cells[index / 3][index % 3] =
                BiasVector::new(sum_dx / *n as f64, sum_dy / *n as f64);
        }
        grid
    }
}

// ── Session ─────────────────────────────────────────────────

/// The dot the user should look at and confirm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTarget {
    pub index: usize,
    pub fraction: (f64, f64),
    pub position: Point,
}

impl CalibrationTarget {
    pub fn new(index: usize, viewport: &Viewport) -> Self {
        let fraction = point_fraction(index);
        Self {
            index,
            fraction,
            position: viewport.at_fraction(fraction.0, fraction.1),
        }
    }
}

/// `completed / total` confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationProgress {
    pub completed: usize,
    pub total: usize,
}

/// Result of one confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationStep {
    /// Confirmation counted, same point still showing.
    Confirmed(CalibrationProgress),
    /// Point finished, next dot should be drawn.
    Advanced {
        progress: CalibrationProgress,
        next: CalibrationTarget,
    },
    /// All 18 confirmations delivered.
    Finished(CalibrationProgress),
}

/// Phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Active,
    Complete,
}

/// One run of the calibration protocol. Created on start, dropped by the
/// engine once it completes.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub state: CalibrationState,
    /// 0..=9; 9 once every point is done.
    pub point_index: usize,
    /// Confirmations on the current point, 0..2.
    pub clicks_on_current_point: usize,
    /// Tracking state to restore when the session ends.
    pub was_tracking: bool,
    pub observations: Vec<CalibrationObservation>,
}

impl CalibrationSession {
    pub fn new(was_tracking: bool) -> Self {
        info!(
            "Calibration session started ({} points x {} confirmations)",
            POINT_COUNT, CLICKS_PER_POINT
        );
        Self {
            state: CalibrationState::Active,
            point_index: 0,
            clicks_on_current_point: 0,
            was_tracking,
            observations: Vec::with_capacity(TOTAL_REQUIRED_CLICKS),
        }
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            completed: self.point_index * CLICKS_PER_POINT + self.clicks_on_current_point,
            total: TOTAL_REQUIRED_CLICKS,
        }
    }

    /// Dot currently on screen, `None` once complete.
    pub fn current_target(&self, viewport: &Viewport) -> Option<CalibrationTarget> {
        match self.state {
            CalibrationState::Active => Some(CalibrationTarget::new(self.point_index, viewport)),
            CalibrationState::Complete => None,
        }
    }

    /// Count one confirmation on the current point, recording `observed`
    /// gaze if the filter has produced any. Returns `None` when the
    /// session is already complete.
    pub fn confirm(&mut self, observed: Option<Point>, viewport: &Viewport) -> Option<CalibrationStep> {
        if self.state == CalibrationState::Complete {
            return None;
        }

        if let Some(observed) = observed {
            let target = CalibrationTarget::new(self.point_index, viewport);
            self.observations.push(CalibrationObservation {
                point_index: self.point_index,
                target: target.position,
                observed,
            });
        }

        self.clicks_on_current_point += 1;
        debug!(
            "Calibration: point {} confirmation {}/{}",
            self.point_index, self.clicks_on_current_point, CLICKS_PER_POINT
        );

        if self.clicks_on_current_point < CLICKS_PER_POINT {
            return Some(CalibrationStep::Confirmed(self.progress()));
        }

        self.clicks_on_current_point = 0;
        self.point_index += 1;

        if self.point_index >= POINT_COUNT {
            self.state = CalibrationState::Complete;
            info!(
                "Calibration session complete ({} observations)",
                self.observations.len()
            );
            return Some(CalibrationStep::Finished(self.progress()));
        }

        Some(CalibrationStep::Advanced {
            progress: self.progress(),
            next: CalibrationTarget::new(self.point_index, viewport),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.state == CalibrationState::Complete
    }

    /// Fit the collected observations into a grid.
    pub fn fit(&self, fitter: &dyn GridFitter) -> CalibrationGrid {
        fitter.fit(&self.observations)
    }
}

// ── Tests ───────────────────────────────────────────────────
