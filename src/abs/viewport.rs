//! The rectangle of the framebuffer OpenGL renders into.

use glow::HasContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    /// Covers the whole framebuffer of the given size in pixels.
    pub fn from_framebuffer(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width.min(i32::MAX as u32) as i32,
            height: height.min(i32::MAX as u32) as i32,
        }
    }

    pub fn apply(&self, gl: &glow::Context) {
        unsafe {
            gl.viewport(self.x, self.y, self.width, self.height);
        }
    }
}
