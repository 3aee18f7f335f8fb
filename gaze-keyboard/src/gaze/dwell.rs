//! Dwell selection. Turns sustained gaze on one target into a discrete
//! selection, followed by a short cooldown.
//!
//! After a selection the target stays active but its dwell clock is
//! cleared: the gaze has to leave and come back before the same target
//! can fire again. This keeps a held gaze from auto-repeating a key.

use tracing::debug;

/// Dead time after a selection during which frames are ignored.
pub const COOLDOWN_MS: u64 = 250;

/// Default gaze hold required for a selection.
pub const DEFAULT_DWELL_TIMEOUT_MS: u64 = 600;

// ── State ───────────────────────────────────────────────────

/// Mutable dwell state, updated once per processed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DwellState {
    /// Target currently under gaze (highlighted).
    pub active_target_id: Option<String>,
    /// When the current dwell started; cleared after a selection fires.
    pub dwell_start_ms: Option<u64>,
    /// Frames with `timestamp < cooldown_until_ms` are ignored.
    pub cooldown_until_ms: u64,
}

/// Output of one dwell update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DwellEvent {
    /// Highlight moves from `previous` to `current`.
    HoverChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    /// Gaze held on `target_id` for the full dwell timeout.
    Selected { target_id: String, timestamp_ms: u64 },
}

// ── Selector ────────────────────────────────────────────────

/// Dwell state machine: `Idle` or `Hovering(target, start)`.
#[derive(Debug, Clone)]
pub struct DwellSelector {
    pub state: DwellState,
    /// Live-adjustable; read on every comparison.
    pub timeout_ms: u64,
    /// Selections fired since creation.
    pub selections: u64,
}

impl Default for DwellSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL_TIMEOUT_MS)
    }
}

impl DwellSelector {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            state: DwellState::default(),
            timeout_ms,
            selections: 0,
        }
    }

    /// Process one frame. `suspended` is true while a calibration session
    /// owns the gaze stream.
    pub fn update(
        &mut self,
        target: Option<&str>,
        timestamp_ms: u64,
        suspended: bool,
    ) -> Option<DwellEvent> {
        if suspended || timestamp_ms < self.state.cooldown_until_ms {
            return None;
        }

        if target != self.state.active_target_id.as_deref() {
            let previous = self.state.active_target_id.take();
            self.state.active_target_id = target.map(str::to_string);
            self.state.dwell_start_ms = target.map(|_| timestamp_ms);
            debug!("Dwell: hover {:?} -> {:?}", previous, target);
            return Some(DwellEvent::HoverChanged {
                previous,
                current: self.state.active_target_id.clone(),
            });
        }

        let (Some(target_id), Some(start)) =
            (self.state.active_target_id.as_ref(), self.state.dwell_start_ms)
        else {
            return None;
        };

        // Time went backwards: skip the comparison instead of guessing.
        let Some(elapsed) = timestamp_ms.checked_sub(start) else {
            debug!(
                "Dwell: timestamp {}ms precedes dwell start {}ms, frame skipped",
                timestamp_ms, start
            );
            return None;
        };

        if elapsed < self.timeout_ms {
            return None;
        }

        let target_id = target_id.clone();
        self.state.dwell_start_ms = None;
        self.state.cooldown_until_ms = timestamp_ms.saturating_add(COOLDOWN_MS);
        self.selections += 1;
        debug!("Dwell: selected {} after {}ms", target_id, elapsed);
        Some(DwellEvent::Selected {
            target_id,
            timestamp_ms,
        })
    }

    /// Drop the active target and any running dwell. Returns the target
    /// that was highlighted, if any. Cooldown is kept.
    pub fn clear(&mut self) -> Option<String> {
        self.state.dwell_start_ms = None;
        self.state.active_target_id.take()
    }

    pub fn active_target(&self) -> Option<&str> {
        self.state.active_target_id.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.state.active_target_id.is_none()
    }

    /// Milliseconds of dwell accumulated at `now_ms`, if dwelling.
    pub fn progress_ms(&self, now_ms: u64) -> Option<u64> {
        self.state
            .dwell_start_ms
            .and_then(|start| now_ms.checked_sub(start))
    }
}

// ── Tests ───────────────────────────────────────────────────
