//! Application systems
//!
//! Frame-level services used by the engine loop.

mod frame_clock;

pub use frame_clock::{FrameClock, FPS_SAMPLE_SIZE};
