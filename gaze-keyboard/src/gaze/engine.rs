//! Gaze engine: owns the whole per-sample pipeline plus the tracking
//! and calibration flags.
//!
//! Every input (gaze sample, confirmation, control action) is a direct
//! `&mut self` call that runs to completion and returns the events the
//! UI side should react to. Nothing here blocks or performs I/O.

use tracing::{debug, info, warn};

use super::bias::{CalibrationBiasCorrector, CalibrationGrid};
use super::calibration::{
    CalibrationProgress, CalibrationSession, CalibrationStep, CalibrationTarget, GridFitter,
    MeanOffsetFitter,
};
use super::dwell::{DwellEvent, DwellSelector, DEFAULT_DWELL_TIMEOUT_MS};
use super::filter::{GazeSignalFilter, RawGazeSample};
use super::hit_test::{find_target, TargetRegion};
use super::{Point, Viewport};
use crate::error::EngineError;
use crate::input_source::InputEvent;

// ── Config ──────────────────────────────────────────────────

/// Tunable engine settings. Smoothing, confidence and cooldown constants
/// are fixed and live next to the components that use them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub viewport: Viewport,
    /// Gaze hold required for a selection (ms).
    pub dwell_timeout_ms: u64,
}

impl EngineConfig {
    /// Same checks as `GazeEngine::set_viewport` and `set_dwell_timeout`.
    pub fn validate(&self) -> Result<(), EngineError> {
        Viewport::new(self.viewport.width, self.viewport.height)?;
        if self.dwell_timeout_ms == 0 {
            return Err(EngineError::InvalidDwellTimeout(self.dwell_timeout_ms));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            dwell_timeout_ms: DEFAULT_DWELL_TIMEOUT_MS,
        }
    }
}

// ── Events ──────────────────────────────────────────────────

/// Something the UI collaborator needs to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Highlight the given target, or nothing.
    HoverChanged { target_id: Option<String> },
    /// A target was selected by dwell.
    Selected { target_id: String },
    /// Tracking was switched on or off.
    TrackingChanged { active: bool },
    /// A session began; draw the first dot.
    CalibrationStarted {
        target: CalibrationTarget,
        progress: CalibrationProgress,
    },
    /// Confirmation counted.
    CalibrationProgress(CalibrationProgress),
    /// Current point done; draw the next dot.
    CalibrationPointAdvanced(CalibrationTarget),
    /// Session over; controls are usable again.
    CalibrationCompleted { grid: Option<CalibrationGrid> },
    /// Grid cleared back to identity.
    CalibrationReset,
}

impl EngineEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoverChanged { .. } => "hover-changed",
            Self::Selected { .. } => "selected",
            Self::TrackingChanged { .. } => "tracking-changed",
            Self::CalibrationStarted { .. } => "calibration-started",
            Self::CalibrationProgress(_) => "calibration-progress",
            Self::CalibrationPointAdvanced(_) => "calibration-point-advanced",
            Self::CalibrationCompleted { .. } => "calibration-completed",
            Self::CalibrationReset => "calibration-reset",
        }
    }
}

// ── Engine ──────────────────────────────────────────────────

/// Single owner of filter, corrector, selector, layout snapshot and
/// calibration session.
pub struct GazeEngine {
    config: EngineConfig,
    filter: GazeSignalFilter,
    corrector: CalibrationBiasCorrector,
    dwell: DwellSelector,
    regions: Vec<TargetRegion>,
    tracking: bool,
    session: Option<CalibrationSession>,
    /// Filtered gaze accepted since the current calibration dot appeared.
    session_gaze: Option<Point>,
    fitter: Box<dyn GridFitter>,
    /// Last point handed to the hit tester.
    pub last_point: Option<Point>,
    pub samples_processed: u64,
}

impl GazeEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_fitter(config, Box::new(MeanOffsetFitter))
    }

    /// Engine with a custom calibration fitting step.
    pub fn with_fitter(
        config: EngineConfig,
        fitter: Box<dyn GridFitter>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        info!(
            "Gaze engine initialized ({}x{}, dwell {}ms)",
            config.viewport.width, config.viewport.height, config.dwell_timeout_ms
        );
        let dwell = DwellSelector::new(config.dwell_timeout_ms);
        Ok(Self {
            config,
            filter: GazeSignalFilter::new(),
            corrector: CalibrationBiasCorrector::new(),
            dwell,
            regions: Vec::new(),
            tracking: false,
            session: None,
            session_gaze: None,
            fitter,
            last_point: None,
            samples_processed: 0,
        })
    }

    // ── Per-sample path ─────────────────────────────────────

    /// Run one raw sample through filter → correction → hit test → dwell.
    pub fn process_sample(&mut self, sample: &RawGazeSample) -> Vec<EngineEvent> {
        if !self.tracking {
            return Vec::new();
        }
        self.samples_processed += 1;

        let viewport = self.config.viewport;
        let Some(smoothed) = self.filter.process(sample, &viewport) else {
            return Vec::new();
        };
        if self.session.is_some() {
            self.session_gaze = Some(smoothed);
        }
        let point = self.corrector.correct(smoothed, &viewport);
        self.last_point = Some(point);

        let target = find_target(point, &self.regions).map(|r| r.id.as_str());
        let suspended = self.session.is_some();
        match self.dwell.update(target, sample.timestamp_ms, suspended) {
            Some(DwellEvent::HoverChanged { current, .. }) => {
                vec![EngineEvent::HoverChanged { target_id: current }]
            }
            Some(DwellEvent::Selected { target_id, .. }) => {
                info!("Selected {}", target_id);
                vec![EngineEvent::Selected { target_id }]
            }
            None => Vec::new(),
        }
    }

    /// Route one input event to the matching operation.
    pub fn handle(&mut self, event: InputEvent) -> Result<Vec<EngineEvent>, EngineError> {
        match event {
            InputEvent::Gaze(sample) => Ok(self.process_sample(&sample)),
            InputEvent::ConfirmCalibration => self.confirm_calibration_point(),
            InputEvent::StartCalibration => self.start_calibration(),
            InputEvent::ResetCalibration => self.reset_calibration().map(|e| vec![e]),
            InputEvent::ToggleTracking => self.toggle_tracking(),
            InputEvent::SetDwellTimeout(ms) => self.set_dwell_timeout(ms).map(|_| Vec::new()),
            InputEvent::Resize { width, height } => {
                self.set_viewport(width, height).map(|_| Vec::new())
            }
            InputEvent::Layout(regions) => {
                self.set_regions(regions);
                Ok(Vec::new())
            }
        }
    }

    // ── Layout & config ─────────────────────────────────────

    /// Replace the target snapshot. Call after every layout change.
    pub fn set_regions(&mut self, regions: Vec<TargetRegion>) {
        debug!("Layout snapshot rebuilt: {} regions", regions.len());
        self.regions = regions;
    }

    pub fn regions(&self) -> &[TargetRegion] {
        &self.regions
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<(), EngineError> {
        self.config.viewport = Viewport::new(width, height)?;
        info!("Viewport set to {}x{}", width, height);
        Ok(())
    }

    /// Takes effect on the next dwell comparison.
    pub fn set_dwell_timeout(&mut self, ms: u64) -> Result<(), EngineError> {
        if ms == 0 {
            return Err(EngineError::InvalidDwellTimeout(ms));
        }
        self.config.dwell_timeout_ms = ms;
        self.dwell.timeout_ms = ms;
        debug!("Dwell timeout set to {}ms", ms);
        Ok(())
    }

    // ── Tracking control ────────────────────────────────────

    pub fn start_tracking(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        self.ensure_no_session("change tracking state")?;
        if self.tracking {
            return Ok(Vec::new());
        }
        self.tracking = true;
        info!("Tracking started");
        let mut events = vec![EngineEvent::TrackingChanged { active: true }];
        if let Some(active) = self.dwell.active_target() {
            events.push(EngineEvent::HoverChanged {
                target_id: Some(active.to_string()),
            });
        }
        Ok(events)
    }

    /// Pause sample delivery. Smoothing and dwell state survive.
    pub fn stop_tracking(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        self.ensure_no_session("change tracking state")?;
        if !self.tracking {
            return Ok(Vec::new());
        }
        self.tracking = false;
        info!("Tracking stopped");
        let mut events = vec![EngineEvent::TrackingChanged { active: false }];
        if self.dwell.active_target().is_some() {
            events.push(EngineEvent::HoverChanged { target_id: None });
        }
        Ok(events)
    }

    pub fn toggle_tracking(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        if self.tracking {
            self.stop_tracking()
        } else {
            self.start_tracking()
        }
    }

    // ── Calibration ─────────────────────────────────────────

    /// Begin a session: force tracking on, suspend dwell, show dot 0.
    pub fn start_calibration(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        self.ensure_no_session("start calibration")?;

        let mut events = Vec::new();
        if self.dwell.clear().is_some() {
            events.push(EngineEvent::HoverChanged { target_id: None });
        }

        let was_tracking = self.tracking;
        if !was_tracking {
            self.tracking = true;
            events.push(EngineEvent::TrackingChanged { active: true });
        }

        let session = CalibrationSession::new(was_tracking);
        self.session_gaze = None;
        let viewport = self.config.viewport;
        if let Some(target) = session.current_target(&viewport) {
            events.push(EngineEvent::CalibrationStarted {
                target,
                progress: session.progress(),
            });
        }
        self.session = Some(session);
        Ok(events)
    }

    /// Count one user confirmation on the current dot.
    pub fn confirm_calibration_point(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        let viewport = self.config.viewport;
        let observed = self.session_gaze;
        let session = self.session.as_mut().ok_or(EngineError::NoActiveCalibration)?;
        let step = session
            .confirm(observed, &viewport)
            .ok_or(EngineError::NoActiveCalibration)?;

        let mut events = Vec::new();
        match step {
            CalibrationStep::Confirmed(progress) => {
                events.push(EngineEvent::CalibrationProgress(progress));
            }
            CalibrationStep::Advanced { progress, next } => {
                self.session_gaze = None;
                events.push(EngineEvent::CalibrationProgress(progress));
                events.push(EngineEvent::CalibrationPointAdvanced(next));
            }
            CalibrationStep::Finished(progress) => {
                events.push(EngineEvent::CalibrationProgress(progress));
                events.extend(self.finish_calibration());
            }
        }
        Ok(events)
    }

    fn finish_calibration(&mut self) -> Vec<EngineEvent> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        self.session_gaze = None;

        let grid = if session.observations.is_empty() {
            warn!("Calibration finished without gaze observations; grid unchanged");
            None
        } else {
            let grid = session.fit(self.fitter.as_ref());
            self.corrector.set_grid(grid);
            Some(grid)
        };

        let mut events = vec![EngineEvent::CalibrationCompleted { grid }];
        if self.tracking != session.was_tracking {
            self.tracking = session.was_tracking;
            events.push(EngineEvent::TrackingChanged {
                active: self.tracking,
            });
        }
        info!(
            "Calibration ended; tracking {}",
            if self.tracking { "resumed" } else { "paused" }
        );
        events
    }

    /// Clear the grid back to identity. Rejected mid-session.
    pub fn reset_calibration(&mut self) -> Result<EngineEvent, EngineError> {
        self.ensure_no_session("reset calibration")?;
        self.corrector.clear();
        Ok(EngineEvent::CalibrationReset)
    }

    fn ensure_no_session(&self, action: &'static str) -> Result<(), EngineError> {
        if self.session.is_some() {
            warn!("Rejected: {} during calibration", action);
            return Err(EngineError::CalibrationInProgress { action });
        }
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_calibrating(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    pub fn corrector(&self) -> &CalibrationBiasCorrector {
        &self.corrector
    }

    /// Install a grid fitted elsewhere.
    pub fn set_calibration_grid(&mut self, grid: CalibrationGrid) -> Result<(), EngineError> {
        self.ensure_no_session("replace calibration grid")?;
        self.corrector.set_grid(grid);
        Ok(())
    }

    pub fn dwell(&self) -> &DwellSelector {
        &self.dwell
    }

    pub fn filter(&self) -> &GazeSignalFilter {
        &self.filter
    }

    /// Status report as an s-expression plist.
    pub fn status_sexp(&self) -> String {
        let hover = match self.dwell.active_target() {
            Some(id) => format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")),
            None => "nil".to_string(),
        };
        let progress = match &self.session {
            Some(s) => {
                let p = s.progress();
                format!("({} . {})", p.completed, p.total)
            }
            None => "nil".to_string(),
        };
        format!(
            "(:tracking {} :calibrating {} :calibrated {} :progress {} :dwell-ms {} :hover {} :regions {} :selections {} :rejected {})",
            if self.tracking { "t" } else { "nil" },
            if self.session.is_some() { "t" } else { "nil" },
            if self.corrector.is_calibrated() { "t" } else { "nil" },
            progress,
            self.dwell.timeout_ms,
            hover,
            self.regions.len(),
            self.dwell.selections,
            self.filter.rejected,
        )
    }
}

// ── Tests ───────────────────────────────────────────────────
