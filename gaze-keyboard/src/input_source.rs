//! Unified input stream for the engine.
//!
//! Gaze samples, calibration confirmations and control actions all arrive
//! as `InputEvent`s through an `InputProvider`. `ScriptedInputProvider`
//! feeds a fixed sequence (tests); `TraceReader` parses JSON-lines
//! recordings (the CLI).

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::gaze::filter::{Covariance, RawGazeSample};
use crate::gaze::hit_test::TargetRegion;

/// One input delivered to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Gaze(RawGazeSample),
    /// User confirmed the current calibration dot.
    ConfirmCalibration,
    StartCalibration,
    ResetCalibration,
    ToggleTracking,
    SetDwellTimeout(u64),
    Resize { width: f64, height: f64 },
    /// Replace the target snapshot wholesale.
    Layout(Vec<TargetRegion>),
}

/// Source of input events.
pub trait InputProvider {
    fn next_event(&mut self) -> Option<InputEvent>;
    fn has_events(&self) -> bool;
}

// ── Scripted ────────────────────────────────────────────────

/// Delivers events from a pre-defined queue.
pub struct ScriptedInputProvider {
    events: VecDeque<InputEvent>,
}

impl ScriptedInputProvider {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: VecDeque::from(events),
        }
    }

    /// Gaze samples at a fixed position, one per timestamp.
    pub fn fixation(x: f64, y: f64, timestamps_ms: &[u64]) -> Self {
        Self::new(
            timestamps_ms
                .iter()
                .map(|t| InputEvent::Gaze(RawGazeSample::new(x, y, *t)))
                .collect(),
        )
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputProvider for ScriptedInputProvider {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

// ── JSON-lines trace ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum TraceRecord {
    Gaze {
        x: f64,
        y: f64,
        #[serde(default)]
        covariance: Option<Value>,
        #[serde(default)]
        t: Option<u64>,
    },
    Confirm,
    Calibrate,
    ResetCalibration,
    ToggleTracking,
    Dwell {
        ms: u64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    Layout {
        regions: Vec<TargetRegion>,
    },
}

/// Lenient covariance parsing: anything that is not at least a 2x2 array
/// of arrays is treated as absent; non-numeric entries become NaN and are
/// ignored by the confidence gate.
pub fn parse_covariance(value: &Value) -> Option<Covariance> {
    let rows = value.as_array()?;
    if rows.len() < 2 {
        return None;
    }
    let row = |i: usize| -> Option<[f64; 2]> {
        let r = rows[i].as_array()?;
        if r.len() < 2 {
            return None;
        }
        let num = |v: &Value| v.as_f64().unwrap_or(f64::NAN);
        Some([num(&r[0]), num(&r[1])])
    };
    Some(Covariance([row(0)?, row(1)?]))
}

/// Parse one trace line. Blank lines and `#` comments yield `Ok(None)`.
/// Gaze records without `t` are stamped from `clock`.
pub fn parse_trace_line(
    line: &str,
    line_no: usize,
    clock: &dyn Clock,
) -> Result<Option<InputEvent>, EngineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let record: TraceRecord = serde_json::from_str(trimmed).map_err(|e| EngineError::Trace {
        line: line_no,
        reason: e.to_string(),
    })?;

    let event = match record {
        TraceRecord::Gaze {
            x,
            y,
            covariance,
            t,
        } => InputEvent::Gaze(RawGazeSample {
            x,
            y,
            covariance: covariance.as_ref().and_then(parse_covariance),
            timestamp_ms: t.unwrap_or_else(|| clock.now_ms()),
        }),
        TraceRecord::Confirm => InputEvent::ConfirmCalibration,
        TraceRecord::Calibrate => InputEvent::StartCalibration,
        TraceRecord::ResetCalibration => InputEvent::ResetCalibration,
        TraceRecord::ToggleTracking => InputEvent::ToggleTracking,
        TraceRecord::Dwell { ms } => InputEvent::SetDwellTimeout(ms),
        TraceRecord::Resize { width, height } => InputEvent::Resize { width, height },
        TraceRecord::Layout { regions } => InputEvent::Layout(regions),
    };
    Ok(Some(event))
}

/// Reads `InputEvent`s from a JSON-lines source. Unparseable lines are
/// logged and skipped.
pub struct TraceReader<R: BufRead> {
    reader: R,
    clock: Arc<dyn Clock>,
    line_no: usize,
    done: bool,
    /// Lines that failed to parse.
    pub errors: Vec<EngineError>,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            reader,
            clock,
            line_no: 0,
            done: false,
            errors: Vec::new(),
        }
    }

    fn read_next(&mut self) -> Option<InputEvent> {
        let mut line = String::new();
        while !self.done {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    match parse_trace_line(&line, self.line_no, self.clock.as_ref()) {
                        Ok(Some(event)) => return Some(event),
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Skipping trace input: {}", e);
                            self.errors.push(e);
                        }
                    }
                }
                Err(e) => {
                    warn!("Trace read failed after line {}: {}", self.line_no, e);
                    self.done = true;
                }
            }
        }
        None
    }
}

impl<R: BufRead> InputProvider for TraceReader<R> {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.read_next()
    }

    /// True until end of input has been reached.
    fn has_events(&self) -> bool {
        !self.done
    }
}
