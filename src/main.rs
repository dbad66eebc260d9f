use std::process::ExitCode;

use crate::abs::App;
use crate::config::Config;
use crate::input::InputState;
use crate::render::Renderer;

mod abs;
mod config;
mod input;
mod logging;
mod render;

fn main() -> ExitCode {
    let (config, config_error) = Config::load();

    if let Err(e) = logging::init(config.log_level) {
        eprintln!("failed to set up logging: {e}");
    }
    if let Some(e) = config_error {
        log::warn!("{e}; using the default configuration");
    }

    let mut app = match App::new(&config.window) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let program = render::load_program(&app.gl, &config.shaders);
    let renderer = match Renderer::new(&app.gl, config.clear_color, program) {
        Ok(renderer) => renderer,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if renderer.has_program() {
        log::info!("drawing {} vertices per frame", renderer.mesh().vertex_count());
    }

    let mut input = InputState::default();

    while !input.should_close() {
        input.begin_frame();
        for event in app.poll_events() {
            input.handle_event(&event);
        }
        input.process_input();

        if let Some(viewport) = input.take_viewport() {
            viewport.apply(&app.gl);
        }

        renderer.render_frame();
        app.swap();
    }

    log::info!("window closed");
    ExitCode::SUCCESS
}
