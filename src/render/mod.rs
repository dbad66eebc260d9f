//! Per-frame rendering of the triangle.

use std::sync::Arc;

use glow::HasContext;

use crate::abs::{Mesh, MeshError, ShaderProgram, TRIANGLE};
use crate::config::ShaderConfig;

/// Loads and builds the configured shader program.
///
/// Failures are logged and yield `None`: the app keeps running and only clears the screen.
pub fn load_program(gl: &Arc<glow::Context>, shaders: &ShaderConfig) -> Option<ShaderProgram> {
    let (vertex, fragment) = match shaders.sources() {
        Ok(Some(sources)) => sources,
        Ok(None) => {
            log::info!("no shaders configured, only clearing the screen");
            return None;
        }
        Err(e) => {
            log::error!("{e}");
            return None;
        }
    };

    match ShaderProgram::build(gl, &vertex, &fragment) {
        Ok(program) => Some(program),
        Err(e) => {
            // The builder logs the driver output; the error only names what failed.
            log::warn!("continuing without a shader program: {e}");
            None
        }
    }
}

/// Owns the GPU objects for the triangle and draws them.
pub struct Renderer {
    gl: Arc<glow::Context>,
    clear_color: [f32; 4],
    mesh: Mesh,
    program: Option<ShaderProgram>,
}

impl Renderer {
    /// Uploads the triangle. `program` is `None` when the shaders failed to build.
    pub fn new(
        gl: &Arc<glow::Context>,
        clear_color: [f32; 4],
        program: Option<ShaderProgram>,
    ) -> Result<Self, MeshError> {
        let mesh = Mesh::new(gl, &TRIANGLE, glow::TRIANGLES)?;
        Ok(Self {
            gl: Arc::clone(gl),
            clear_color,
            mesh,
            program,
        })
    }

    pub fn render_frame(&self) {
        let [r, g, b, a] = self.clear_color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }

        if let Some(program) = &self.program {
            let bound = program.use_program();
            self.mesh.draw(&bound);
        }
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}
