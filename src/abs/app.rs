//! SDL2 and OpenGL application management.
//!
//! This module defines the [`App`] struct which encapsulates the SDL2
//! and OpenGL context necessary for creating a windowed application.

use std::sync::Arc;

use glow::HasContext;
use sdl2::event::{Event, WindowEvent};

use crate::config::WindowConfig;
use crate::input::InputEvent;

/// The oldest OpenGL version the renderer's shaders are written for.
pub const GL_VERSION: (u8, u8) = (3, 3);

/// Errors that prevent the application from starting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to initialize SDL: {0}")]
    Sdl(String),
    #[error("failed to create window: {0}")]
    Window(#[from] sdl2::video::WindowBuildError),
    #[error("failed to create OpenGL context: {0}")]
    Context(String),
    #[error("OpenGL {major}.{minor} is loaded, but {}.{} core is required", GL_VERSION.0, GL_VERSION.1)]
    Loader { major: u32, minor: u32 },
}

/// The [`App`] struct encapsulates the SDL2 and OpenGL context.
pub struct App {
    pub sdl: sdl2::Sdl,
    pub video_subsystem: sdl2::VideoSubsystem,
    pub window: sdl2::video::Window,
    pub gl_context: sdl2::video::GLContext,
    pub gl: Arc<glow::Context>,
    pub event_pump: sdl2::EventPump,
}

impl App {
    /// Creates a new [`App`] with a core profile OpenGL 3.3 context current on this thread.
    pub fn new(config: &WindowConfig) -> Result<Self, AppError> {
        let sdl = sdl2::init().map_err(AppError::Sdl)?;
        let video_subsystem = sdl.video().map_err(AppError::Sdl)?;
        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(GL_VERSION.0, GL_VERSION.1);

        let mut builder = video_subsystem.window(&config.title, config.width, config.height);
        builder.opengl().resizable();
        if config.hidden {
            builder.hidden();
        }
        let window = builder.build()?;

        let gl_context = window.gl_create_context().map_err(AppError::Context)?;
        window.gl_make_current(&gl_context).map_err(AppError::Context)?;
        let gl = unsafe {
            glow::Context::from_loader_function(|s| video_subsystem.gl_get_proc_address(s) as *const _)
        };

        let version = gl.version();
        if (version.major, version.minor) < (GL_VERSION.0 as u32, GL_VERSION.1 as u32) || version.is_embedded {
            return Err(AppError::Loader {
                major: version.major,
                minor: version.minor,
            });
        }
        log::info!(
            "OpenGL {}.{} ({}), window {}x{}",
            version.major,
            version.minor,
            version.vendor_info,
            config.width,
            config.height
        );

        let event_pump = sdl.event_pump().map_err(AppError::Sdl)?;

        Ok(Self {
            sdl,
            video_subsystem,
            window,
            gl_context,
            gl: Arc::new(gl),
            event_pump,
        })
    }

    /// Drains pending window-system events.
    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for event in self.event_pump.poll_iter() {
            let translated = match event {
                Event::Quit { .. } => InputEvent::Quit,
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => InputEvent::KeyDown(keycode),
                Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => InputEvent::KeyUp(keycode),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => {
                    // The event carries the size in screen coordinates; the viewport wants pixels.
                    let (width, height) = self.window.drawable_size();
                    InputEvent::FramebufferResized { width, height }
                }
                _ => continue,
            };
            events.push(translated);
        }
        events
    }

    /// Presents the back buffer.
    pub fn swap(&self) {
        self.window.gl_swap_window();
    }
}
