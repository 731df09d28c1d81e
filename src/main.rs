//! Phantasm - headless scene graph engine
//!
//! Runs the demo scene for `engine.max_frames` frames at the fixed time step,
//! then shuts down.

use std::process::ExitCode;

use phantasm::config::AppConfig;
use phantasm::scene::demo_scene;
use phantasm::Engine;

fn main() -> ExitCode {
    // Load configuration before logging so the level can come from it
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // RUST_LOG takes precedence over debug.log_level
    env_logger::Builder::new()
        .filter_level(config.debug.level_filter())
        .parse_default_env()
        .init();
    if let Some(e) = config_error {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }
    log::info!("Starting {}", config.engine.title);

    let frames = config.engine.max_frames;
    let frame_time = config.engine.fixed_time_step;

    let mut engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Failed to start engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let scene = match demo_scene(engine.resources().clone()) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("Failed to build demo scene: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = engine.set_scene(scene) {
        log::error!("Failed to initialize demo scene: {}", e);
    }

    let mut failures = 0;
    for _ in 0..frames {
        failures += engine.tick(frame_time).failures;
    }
    log::info!(
        "Ran {} frames ({:.2}s simulated, {} hook failures)",
        engine.clock().frame_count(),
        engine.clock().elapsed(),
        failures
    );

    engine.shutdown();
    ExitCode::SUCCESS
}
