//! gaze-keyboard - replay a recorded gaze trace through the selection engine.
//!
//! Reads JSON-lines input records (gaze samples, calibration confirmations,
//! control actions) and prints selections, calibration progress and the
//! composed text.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, warn};

use gaze_keyboard::clock::{Clock, SystemClock};
use gaze_keyboard::gaze::Viewport;
use gaze_keyboard::input_source::{InputEvent, InputProvider, TraceReader};
use gaze_keyboard::keyboard::composer::complete_predictions;
use gaze_keyboard::keyboard::layout::LayoutConfig;
use gaze_keyboard::keyboard::{regions_for_screen, ComposeOutcome, TextComposer};
use gaze_keyboard::{EngineConfig, EngineEvent, GazeEngine};

#[derive(Parser, Debug)]
#[command(name = "gaze-keyboard", about = "Dwell-based gaze keyboard engine")]
struct Cli {
    /// JSON-lines trace to replay ("-" for stdin)
    #[arg(long, default_value = "-")]
    trace: String,

    /// Viewport resolution (WxH)
    #[arg(long, default_value = "1920x1080")]
    resolution: String,

    /// Dwell time required for a selection, in milliseconds
    #[arg(long, default_value = "600")]
    dwell_ms: u64,

    /// Target layout: keyboard, or none (regions come from the trace)
    #[arg(long, default_value = "keyboard")]
    layout: String,

    /// Start with tracking enabled
    #[arg(long)]
    track: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

/// Engine plus the keyboard screens it drives.
struct Session {
    engine: GazeEngine,
    composer: TextComposer,
    layout: Option<LayoutConfig>,
}

impl Session {
    fn refresh_layout(&mut self) {
        if let Some(config) = &self.layout {
            let regions =
                regions_for_screen(&self.composer.screen, &self.engine.config().viewport, config);
            self.engine.set_regions(regions);
        }
    }

    fn on_engine_event(&mut self, event: EngineEvent, now_ms: u64) {
        debug!("Engine event: {}", event.as_str());
        match event {
            EngineEvent::Selected { target_id } => {
                println!("select {}", target_id);
                self.on_selection(&target_id, now_ms);
            }
            EngineEvent::CalibrationStarted { target, progress } => println!(
                "calibration started: dot {} at ({:.0}, {:.0}) {}/{}",
                target.index, target.position.x, target.position.y, progress.completed, progress.total
            ),
            EngineEvent::CalibrationProgress(p) => {
                println!("calibration {}/{}", p.completed, p.total)
            }
            EngineEvent::CalibrationPointAdvanced(target) => println!(
                "calibration dot {} at ({:.0}, {:.0})",
                target.index, target.position.x, target.position.y
            ),
            EngineEvent::CalibrationCompleted { grid } => match grid {
                Some(g) => println!("calibration complete (max bias {:.1}px)", g.max_magnitude()),
                None => println!("calibration complete (no gaze observed)"),
            },
            EngineEvent::CalibrationReset => println!("calibration cleared"),
            EngineEvent::TrackingChanged { active } => {
                println!("tracking {}", if active { "on" } else { "off" })
            }
            EngineEvent::HoverChanged { .. } => {}
        }
    }

    fn on_selection(&mut self, target_id: &str, now_ms: u64) {
        match self.composer.apply(target_id, now_ms) {
            ComposeOutcome::Typed(_) | ComposeOutcome::Deleted => {
                println!("text: {}", self.composer.typed)
            }
            ComposeOutcome::PredictionsRequested { initials } => {
                let predictions = complete_predictions(Vec::new(), &initials);
                for (i, p) in predictions.iter().enumerate() {
                    println!("prediction {}: {}", i, p);
                }
                self.composer.show_predictions(predictions);
                self.refresh_layout();
            }
            ComposeOutcome::NothingTyped => println!("type some letters first"),
            ComposeOutcome::SentenceChosen(text) => {
                println!("say: {}", text);
                self.refresh_layout();
            }
            ComposeOutcome::ReturnedToKeyboard => self.refresh_layout(),
            ComposeOutcome::Ignored => {}
        }
    }
}

/// Replay time: the latest gaze timestamp seen in the trace. Control
/// records carry no time of their own and keep the current value.
fn replay_time(event: &InputEvent, now_ms: u64) -> u64 {
    match event {
        InputEvent::Gaze(sample) => now_ms.max(sample.timestamp_ms),
        _ => now_ms,
    }
}

fn open_trace(path: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("opening trace {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gaze-keyboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gaze_keyboard=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    info!("gaze-keyboard v{} starting", env!("CARGO_PKG_VERSION"));

    let Some(viewport) = Viewport::parse_resolution(&cli.resolution) else {
        bail!("invalid resolution '{}', expected WxH", cli.resolution);
    };

    let layout = match cli.layout.as_str() {
        "keyboard" => Some(LayoutConfig::default()),
        "none" => None,
        other => bail!("unknown layout: {other}. Use: keyboard or none"),
    };

    let mut engine = GazeEngine::new(EngineConfig {
        viewport,
        dwell_timeout_ms: cli.dwell_ms,
    })?;
    if cli.track {
        engine.start_tracking()?;
    }

    let mut session = Session {
        engine,
        composer: TextComposer::new(),
        layout,
    };
    session.refresh_layout();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut reader = TraceReader::new(open_trace(&cli.trace)?, clock);
    let mut now_ms = 0;

    while let Some(event) = reader.next_event() {
        let resized = matches!(event, InputEvent::Resize { .. });
        now_ms = replay_time(&event, now_ms);

        match session.engine.handle(event) {
            Ok(events) => {
                for e in events {
                    session.on_engine_event(e, now_ms);
                }
            }
            Err(e) => {
                warn!("Rejected: {}", e);
                println!("rejected ({}): {}", e.as_str(), e);
            }
        }

        if resized || session.composer.tick(now_ms) {
            session.refresh_layout();
        }
    }

    if !reader.errors.is_empty() {
        warn!("{} trace lines could not be parsed", reader.errors.len());
    }
    println!("final text: {}", session.composer.typed);
    println!("{}", session.engine.status_sexp());
    Ok(())
}
