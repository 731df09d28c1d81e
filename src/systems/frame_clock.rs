//! Frame timing
//!
//! Tracks frame delta, time scale and a fixed-timestep accumulator:
//! - Frame time is clamped to `max_frame_time` to avoid a spiral of death
//!   after a stall, then scaled by `time_scale`
//! - [`FrameClock::consume_fixed_step`] drains the accumulator one step at a time
//! - [`FrameClock::alpha`] is the interpolation factor between fixed steps
//! - Average FPS is kept over a rolling window of one-second samples

use crate::config::EngineConfig;

/// Number of one-second FPS samples averaged by [`FrameClock::average_fps`]
pub const FPS_SAMPLE_SIZE: usize = 60;

/// Fixed-timestep frame clock
pub struct FrameClock {
    fixed_time_step: f32,
    max_frame_time: f32,
    time_scale: f32,
    /// Scaled, clamped duration of the last frame
    delta: f32,
    accumulator: f32,
    elapsed: f64,
    frame_count: u64,

    // FPS bookkeeping (unscaled time)
    window_time: f32,
    window_frames: u32,
    fps_history: [f32; FPS_SAMPLE_SIZE],
    fps_index: usize,
    fps_samples: usize,
}

impl FrameClock {
    /// Create a clock with a fixed step and frame-time clamp, in seconds
    pub fn new(fixed_time_step: f32, max_frame_time: f32) -> Self {
        Self {
            fixed_time_step,
            max_frame_time,
            time_scale: 1.0,
            delta: 0.0,
            accumulator: 0.0,
            elapsed: 0.0,
            frame_count: 0,
            window_time: 0.0,
            window_frames: 0,
            fps_history: [0.0; FPS_SAMPLE_SIZE],
            fps_index: 0,
            fps_samples: 0,
        }
    }

    /// Create a clock from the engine section of the configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut clock = Self::new(config.fixed_time_step, config.max_frame_time);
        clock.set_time_scale(config.time_scale);
        clock
    }

    /// Advance the clock by one frame of `frame_time` seconds of wall time
    ///
    /// Returns the scaled, clamped delta that was added to the accumulator.
    pub fn advance(&mut self, frame_time: f32) -> f32 {
        // Negative or NaN input counts as an empty frame
        let raw = if frame_time > 0.0 {
            frame_time.min(self.max_frame_time)
        } else {
            0.0
        };
        self.delta = raw * self.time_scale;
        self.accumulator += self.delta;
        self.elapsed += f64::from(self.delta);
        self.frame_count += 1;

        self.window_time += raw;
        self.window_frames += 1;
        if self.window_time >= 1.0 {
            self.fps_history[self.fps_index] = self.window_frames as f32 / self.window_time;
            self.fps_index = (self.fps_index + 1) % FPS_SAMPLE_SIZE;
            self.fps_samples = (self.fps_samples + 1).min(FPS_SAMPLE_SIZE);
            self.window_time = 0.0;
            self.window_frames = 0;
        }

        self.delta
    }

    /// Take one fixed step out of the accumulator, if a whole one is available
    pub fn consume_fixed_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_time_step {
            self.accumulator -= self.fixed_time_step;
            true
        } else {
            false
        }
    }

    /// Interpolation factor in `[0, 1)` between the last and next fixed step
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_time_step
    }

    /// Average FPS over the recorded one-second samples (0 before the first second)
    pub fn average_fps(&self) -> f32 {
        if self.fps_samples == 0 {
            return 0.0;
        }
        let sum: f32 = self.fps_history[..self.fps_samples].iter().sum();
        sum / self.fps_samples as f32
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    #[inline]
    pub fn fixed_time_step(&self) -> f32 {
        self.fixed_time_step
    }

    pub fn set_fixed_time_step(&mut self, step: f32) {
        if step > 0.0 {
            self.fixed_time_step = step;
        }
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale (clamped to non-negative; 0 pauses fixed updates)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Scaled seconds since the clock started
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of frames advanced
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
