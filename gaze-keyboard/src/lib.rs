//! Gaze keyboard engine. Turns a noisy eye-gaze stream into discrete
//! on-screen key selections, with a nine-point bias calibration.
//!
//! This library crate exposes the engine for integration testing. The
//! trace-replay binary lives in `main.rs`.

pub mod clock;
pub mod error;
pub mod gaze;
pub mod input_source;
pub mod keyboard;

pub use error::EngineError;
pub use gaze::{EngineConfig, EngineEvent, GazeEngine};
