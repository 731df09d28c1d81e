//! Phantasm - headless scene graph engine
//!
//! The library half of the `phantasm` binary: configuration loading, the
//! frame clock, the [`engine::Engine`] frame driver and the demo scene.
//! The object model itself lives in `phantasm_core`.

pub mod config;
pub mod engine;
pub mod scene;
pub mod systems;

pub use engine::{Engine, EngineError, FrameReport};
