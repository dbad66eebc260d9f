//! This module contains the thin OpenGL layer of the renderer,
//! including application setup, shader compilation, and vertex data upload.

pub mod app;
pub mod mesh;
pub mod shader;
pub mod viewport;

pub use app::*;
pub use mesh::*;
pub use shader::*;
pub use viewport::*;
