//! End-to-end tests for the gaze engine.
//!
//! Drive the engine through `ScriptedInputProvider` and `TestClock` the
//! way the CLI drives it from a trace, and check the emitted events.

use gaze_keyboard::clock::{Clock, TestClock};
use gaze_keyboard::gaze::bias::{BiasVector, CalibrationGrid};
use gaze_keyboard::gaze::calibration::{CalibrationTarget, TOTAL_REQUIRED_CLICKS};
use gaze_keyboard::gaze::filter::{Covariance, RawGazeSample};
use gaze_keyboard::gaze::hit_test::{Rect, TargetRegion};
use gaze_keyboard::gaze::Viewport;
use gaze_keyboard::input_source::{InputEvent, InputProvider, ScriptedInputProvider};
use gaze_keyboard::keyboard::layout::{keyboard_regions, LayoutConfig, TEXT};
use gaze_keyboard::keyboard::{regions_for_screen, ComposeOutcome, TextComposer};
use gaze_keyboard::{EngineConfig, EngineError, EngineEvent, GazeEngine};

use std::time::Duration;

fn engine_with_target_a() -> GazeEngine {
    let mut engine = GazeEngine::new(EngineConfig {
        viewport: Viewport::new(1280.0, 720.0).unwrap(),
        dwell_timeout_ms: 600,
    })
    .unwrap();
    engine.set_regions(vec![TargetRegion::new(
        "A",
        Rect::new(90.0, 90.0, 110.0, 110.0),
    )]);
    engine.start_tracking().unwrap();
    engine
}

/// Feed every event and collect everything the engine emitted.
fn run(engine: &mut GazeEngine, provider: &mut dyn InputProvider) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Some(event) = provider.next_event() {
        if let Ok(events) = engine.handle(event) {
            out.extend(events);
        }
    }
    out
}

fn selected(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Selected { target_id } => Some(target_id.clone()),
            _ => None,
        })
        .collect()
}

// ── Selection ───────────────────────────────────────────────

#[test]
fn test_three_sample_scenario_selects_once() {
    let mut engine = engine_with_target_a();
    let mut provider = ScriptedInputProvider::fixation(100.0, 100.0, &[0, 200]);
    assert!(selected(&run(&mut engine, &mut provider)).is_empty());

    let third = engine.process_sample(&RawGazeSample::new(100.0, 100.0, 650));
    assert_eq!(selected(&third), vec!["A".to_string()]);
}

#[test]
fn test_dwell_boundary_with_clock() {
    let clock = TestClock::new();
    let mut engine = engine_with_target_a();

    engine.process_sample(&RawGazeSample::new(100.0, 100.0, clock.now_ms()));
    clock.advance(Duration::from_millis(599));
    let early = engine.process_sample(&RawGazeSample::new(100.0, 100.0, clock.now_ms()));
    assert!(selected(&early).is_empty());

    clock.advance(Duration::from_millis(1));
    let exact = engine.process_sample(&RawGazeSample::new(100.0, 100.0, clock.now_ms()));
    assert_eq!(selected(&exact), vec!["A".to_string()]);
}

#[test]
fn test_noisy_samples_never_move_the_cursor() {
    let mut engine = engine_with_target_a();
    engine.process_sample(&RawGazeSample::new(100.0, 100.0, 0));

    // Wildly off, but flagged as very uncertain.
    for t in (10..600).step_by(10) {
        let noisy =
            RawGazeSample::new(1200.0, 700.0, t).with_covariance(Covariance::isotropic(80.0));
        assert!(engine.process_sample(&noisy).is_empty());
    }
    let events = engine.process_sample(&RawGazeSample::new(100.0, 100.0, 600));
    assert_eq!(selected(&events), vec!["A".to_string()]);
    assert!(engine.status_sexp().contains(":rejected 59"));
}

#[test]
fn test_live_dwell_change_from_trace() {
    let mut engine = engine_with_target_a();
    let mut provider = ScriptedInputProvider::new(vec![
        InputEvent::Gaze(RawGazeSample::new(100.0, 100.0, 0)),
        InputEvent::SetDwellTimeout(200),
        InputEvent::Gaze(RawGazeSample::new(100.0, 100.0, 200)),
    ]);
    assert_eq!(selected(&run(&mut engine, &mut provider)), vec!["A".to_string()]);
}

#[test]
fn test_layout_rebuild_drops_stale_target() {
    let mut engine = engine_with_target_a();
    engine.process_sample(&RawGazeSample::new(100.0, 100.0, 0));
    engine.set_regions(vec![TargetRegion::new("B", Rect::new(0.0, 0.0, 50.0, 50.0))]);

    let events = engine.process_sample(&RawGazeSample::new(100.0, 100.0, 700));
    assert_eq!(events, vec![EngineEvent::HoverChanged { target_id: None }]);
    assert!(selected(&events).is_empty());
}

// ── Calibration ─────────────────────────────────────────────

#[test]
fn test_calibration_sequence_through_provider() {
    let mut engine = engine_with_target_a();
    let mut events = vec![InputEvent::StartCalibration];
    events.extend(std::iter::repeat(InputEvent::ConfirmCalibration).take(TOTAL_REQUIRED_CLICKS));
    let mut provider = ScriptedInputProvider::new(events);

    let out = run(&mut engine, &mut provider);
    let progress: Vec<usize> = out
        .iter()
        .filter_map(|e| match e {
            EngineEvent::CalibrationProgress(p) => Some(p.completed),
            _ => None,
        })
        .collect();
    assert_eq!(progress, (1..=18).collect::<Vec<_>>());
    let advanced = out
        .iter()
        .filter(|e| matches!(e, EngineEvent::CalibrationPointAdvanced(_)))
        .count();
    assert_eq!(advanced, 8);
    assert!(out
        .iter()
        .any(|e| matches!(e, EngineEvent::CalibrationCompleted { .. })));
    assert!(!engine.is_calibrating());
    assert!(engine.is_tracking());

    // A 19th confirmation has nothing to confirm.
    assert_eq!(
        engine.confirm_calibration_point(),
        Err(EngineError::NoActiveCalibration)
    );
}

#[test]
fn test_reset_rejected_mid_session_then_allowed() {
    let mut engine = engine_with_target_a();
    engine
        .set_calibration_grid(CalibrationGrid::uniform(BiasVector::new(3.0, 3.0)))
        .unwrap();
    engine.start_calibration().unwrap();

    let err = engine.reset_calibration().unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot reset calibration while calibration is in progress"
    );
    assert!(engine.corrector().is_calibrated());

    for _ in 0..TOTAL_REQUIRED_CLICKS {
        engine.confirm_calibration_point().unwrap();
    }
    assert_eq!(engine.reset_calibration(), Ok(EngineEvent::CalibrationReset));
    assert!(!engine.corrector().is_calibrated());
}

#[test]
fn test_calibration_without_gaze_keeps_identity() {
    let mut engine = engine_with_target_a();
    engine.process_sample(&RawGazeSample::new(100.0, 100.0, 0));
    engine.toggle_tracking().unwrap();

    let mut provider = ScriptedInputProvider::new(
        std::iter::once(InputEvent::StartCalibration)
            .chain(std::iter::repeat(InputEvent::ConfirmCalibration).take(TOTAL_REQUIRED_CLICKS))
            .collect(),
    );
    let out = run(&mut engine, &mut provider);
    assert!(out.contains(&EngineEvent::CalibrationCompleted { grid: None }));
    assert!(!engine.corrector().is_calibrated());

    let center = Viewport::new(1280.0, 720.0).unwrap().at_fraction(0.5, 0.5);
    assert_eq!(
        engine.corrector().correct(center, &engine.config().viewport),
        center
    );
}

#[test]
fn test_calibration_corrects_offset_gaze() {
    let viewport = Viewport::new(1000.0, 1000.0).unwrap();
    let mut engine = GazeEngine::new(EngineConfig {
        viewport,
        dwell_timeout_ms: 600,
    })
    .unwrap();
    engine.start_calibration().unwrap();

    // The tracker reads 30px too low everywhere. Hold gaze on each dot
    // long enough for the filter to settle before confirming.
    let mut t = 0;
    for index in 0..9 {
        let dot = CalibrationTarget::new(index, &viewport).position;
        for _ in 0..2 {
            for _ in 0..80 {
                engine.process_sample(&RawGazeSample::new(dot.x, dot.y + 30.0, t));
                t += 16;
            }
            engine.confirm_calibration_point().unwrap();
        }
    }
    assert!(!engine.is_calibrating());
    assert!(!engine.is_tracking());

    let key = Rect::new(480.0, 480.0, 520.0, 520.0);
    engine.set_regions(vec![TargetRegion::new("center", key)]);
    engine.start_tracking().unwrap();

    let mut fired = Vec::new();
    for _ in 0..120 {
        let events = engine.process_sample(&RawGazeSample::new(500.0, 530.0, t));
        fired.extend(selected(&events));
        t += 16;
    }
    assert_eq!(fired, vec!["center".to_string()]);
    let p = engine.last_point.unwrap();
    assert!((p.y - 500.0).abs() < 2.0, "corrected y = {}", p.y);
}

// ── Keyboard composition ────────────────────────────────────

#[test]
fn test_type_two_letters_and_open_predictions() {
    let viewport = Viewport::new(1200.0, 800.0).unwrap();
    let config = LayoutConfig::default();
    let mut engine = GazeEngine::new(EngineConfig {
        viewport,
        dwell_timeout_ms: 300,
    })
    .unwrap();
    engine.set_regions(keyboard_regions(&viewport, &config));
    engine.start_tracking().unwrap();

    let center_of = |engine: &GazeEngine, id: &str| {
        engine
            .regions()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.bounds.center())
            .unwrap()
    };

    // Look at each key, then rest in the empty text area above the
    // keyboard so the next look starts a fresh dwell.
    let mut t = 0;
    let mut fired = Vec::new();
    for key in ["H", "I", TEXT] {
        let c = center_of(&engine, key);
        for _ in 0..60 {
            fired.extend(selected(&engine.process_sample(&RawGazeSample::new(c.x, c.y, t))));
            t += 16;
        }
        for _ in 0..60 {
            fired.extend(selected(&engine.process_sample(&RawGazeSample::new(600.0, 20.0, t))));
            t += 16;
        }
    }
    assert_eq!(fired, vec!["H".to_string(), "I".to_string(), TEXT.to_string()]);

    let mut composer = TextComposer::new();
    let outcomes: Vec<ComposeOutcome> = fired.iter().map(|id| composer.apply(id, t)).collect();
    assert_eq!(composer.typed, "HI");
    assert_eq!(
        outcomes.last(),
        Some(&ComposeOutcome::PredictionsRequested {
            initials: vec!['H', 'I']
        })
    );

    composer.show_predictions(vec!["Hi".to_string(), "How is".to_string()]);
    let regions = regions_for_screen(&composer.screen, &viewport, &config);
    assert_eq!(regions.len(), 3);
    engine.set_regions(regions);
    assert_eq!(engine.regions().len(), 3);
}
