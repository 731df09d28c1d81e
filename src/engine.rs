//! Frame driver
//!
//! The [`Engine`] owns the shared services (resource cache, event bus), the
//! current [`Scene`] and the [`FrameClock`]. Each [`Engine::tick`]:
//! 1. Advances the clock by the measured frame time
//! 2. Runs one scene update per whole fixed step in the accumulator
//! 3. Delivers queued events
//! 4. Renders the scene once
//!
//! Behavior failures are logged and the frame carries on.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use phantasm_core::{BehaviorError, EventBus, RenderView, ResourceCache, ResourceError, Scene};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::systems::FrameClock;

/// Queued when a scene becomes current; the payload is the scene name (`String`)
pub const SCENE_CHANGED_EVENT: &str = "scene_changed";
/// Emitted immediately when the engine shuts down
pub const SHUTDOWN_EVENT: &str = "shutdown";

/// Frames between frame-stat log lines when `debug.log_frame_stats` is set
const FRAME_STATS_INTERVAL: u64 = 60;

/// Engine construction error
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// What one call to [`Engine::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Fixed updates run this frame
    pub fixed_steps: u32,
    /// Events delivered this frame
    pub events: usize,
    /// Whether the scene rendered without a failing hook
    pub rendered: bool,
    /// Hooks that returned an error (logged)
    pub failures: u32,
}

/// Owns the scene, clock and shared services and drives them frame by frame
pub struct Engine {
    config: AppConfig,
    resources: Arc<ResourceCache>,
    events: Arc<EventBus>,
    scene: Scene,
    clock: FrameClock,
    view: RenderView,
    running: bool,
}

impl Engine {
    /// Create an engine with an empty, inactive scene
    ///
    /// Fails if the configuration is invalid or the default resource
    /// directories were requested and could not be created.
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let resources = Arc::new(ResourceCache::new(&config.resources.base_dir));
        if config.resources.create_default_dirs {
            resources.create_default_directories(config.resources.default_dirs.as_slice())?;
        }

        let clock = FrameClock::from_config(&config.engine);
        log::info!(
            "Engine '{}' ready (fixed step {:.4}s, resources at {})",
            config.engine.title,
            config.engine.fixed_time_step,
            resources.base_dir().display()
        );

        Ok(Self {
            config,
            resources,
            events: Arc::new(EventBus::new()),
            scene: Scene::default(),
            clock,
            view: default_view(),
            running: true,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared resource cache (clone the `Arc` to hand it to behaviors)
    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    /// Shared event bus
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn view(&self) -> &RenderView {
        &self.view
    }

    pub fn set_view(&mut self, view: RenderView) {
        self.view = view;
    }

    /// False once [`shutdown`](Self::shutdown) has run
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Make `scene` current
    ///
    /// The previous scene is cleaned up first, then the new one is
    /// initialized. If initialization fails the new scene stays current
    /// (partially initialized) and the error is returned.
    pub fn set_scene(&mut self, scene: Scene) -> Result<(), BehaviorError> {
        let mut previous = std::mem::replace(&mut self.scene, scene);
        if previous.is_active() || previous.root_count() > 0 {
            log::debug!("Cleaning up scene '{}'", previous.name());
            previous.cleanup();
        }

        log::info!(
            "Activating scene '{}' ({} roots)",
            self.scene.name(),
            self.scene.root_count()
        );
        self.events
            .queue(SCENE_CHANGED_EVENT, Some(Arc::new(self.scene.name().to_string())));
        self.scene.initialize()
    }

    /// Run one frame of `frame_time` seconds of wall time
    pub fn tick(&mut self, frame_time: f32) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.running {
            return report;
        }

        self.clock.advance(frame_time);
        let step = self.clock.fixed_time_step();
        while self.clock.consume_fixed_step() {
            if let Err(e) = self.scene.update(step) {
                log::error!("Update failed in scene '{}': {}", self.scene.name(), e);
                report.failures += 1;
            }
            report.fixed_steps += 1;
        }

        report.events = self.events.process_events();

        match self.scene.render(&self.view) {
            Ok(()) => report.rendered = self.scene.is_active(),
            Err(e) => {
                log::error!("Render failed in scene '{}': {}", self.scene.name(), e);
                report.failures += 1;
            }
        }

        if self.config.debug.log_frame_stats && self.clock.frame_count() % FRAME_STATS_INTERVAL == 0 {
            log::info!(
                "Frame {}: {:.1} fps average, {:.2}s elapsed",
                self.clock.frame_count(),
                self.clock.average_fps(),
                self.clock.elapsed()
            );
        }
        report
    }

    /// Clean up the scene, drop events and force-unload every resource
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        self.events.emit_immediate(SHUTDOWN_EVENT, None);
        self.scene.cleanup();
        self.events.clear();
        let unloaded = self.resources.cleanup();
        log::info!(
            "Engine '{}' shut down after {} frames ({} resources unloaded)",
            self.config.engine.title,
            self.clock.frame_count(),
            unloaded
        );
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Camera looking at the origin from above and behind
fn default_view() -> RenderView {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0);
    RenderView::new(view, projection)
}
