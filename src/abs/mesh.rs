//! Mesh management module.
//!
//! This module defines the [`Mesh`] struct for managing vertex data on the GPU side.
//! Vertices should implement the [`Vertex`] trait.

use std::sync::Arc;

use glam::Vec3;
use glow::HasContext;

use super::shader::BoundProgram;

/// Errors produced while uploading a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to create {what}: {reason}")]
    Create { what: &'static str, reason: String },
}

/// A single `f32` vertex attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: i32,
}

/// Trait that defines the memory layout of a vertex.
pub trait Vertex: bytemuck::Pod {
    /// The attributes of the vertex, in shader location order.
    const ATTRIBUTES: &'static [VertexAttribute];

    /// Distance in bytes between two consecutive vertices.
    fn stride() -> i32 {
        std::mem::size_of::<Self>() as i32
    }

    /// Sets up the vertex attribute pointers for the vertex.
    fn vertex_attribs(gl: &glow::Context) {
        for attribute in Self::ATTRIBUTES {
            unsafe {
                gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    Self::stride(),
                    attribute.offset,
                );
                gl.enable_vertex_attrib_array(attribute.location);
            }
        }
    }
}

/// A vertex with only a position, read by the shaders as `layout (location = 0) in vec3 aPos`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TriangleVertex {
    pub position: Vec3,
}

impl TriangleVertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
        }
    }
}

impl Vertex for TriangleVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[VertexAttribute {
        location: 0,
        components: 3,
        offset: 0,
    }];
}

/// The triangle drawn every frame, in normalized device coordinates.
pub const TRIANGLE: [TriangleVertex; 3] = [
    TriangleVertex::new(-0.5, -0.5, 0.0),
    TriangleVertex::new(0.5, -0.5, 0.0),
    TriangleVertex::new(0.0, 0.5, 0.0),
];

/// Represents non-indexed vertex data stored on the GPU side.
pub struct Mesh {
    gl: Arc<glow::Context>,
    draw_mode: u32,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: usize,
}

impl Mesh {
    /// Uploads the given vertices once and records their layout in a vertex array.
    pub fn new<V: Vertex>(gl: &Arc<glow::Context>, vertices: &[V], draw_mode: u32) -> Result<Self, MeshError> {
        unsafe {
            let vao = gl.create_vertex_array().map_err(|reason| MeshError::Create {
                what: "vertex array",
                reason,
            })?;
            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(reason) => {
                    gl.delete_vertex_array(vao);
                    return Err(MeshError::Create {
                        what: "vertex buffer",
                        reason,
                    });
                }
            };

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(vertices), glow::STATIC_DRAW);

            V::vertex_attribs(gl);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            log::debug!("uploaded {} vertices ({} bytes)", vertices.len(), std::mem::size_of_val(vertices));

            Ok(Self {
                gl: Arc::clone(gl),
                draw_mode,
                vao,
                vbo,
                vertex_count: vertices.len(),
            })
        }
    }

    /// Draws the mesh with the currently bound program.
    pub fn draw(&self, _program: &BoundProgram<'_>) {
        unsafe {
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl.draw_arrays(self.draw_mode, 0, self.vertex_count as i32);
            self.gl.bind_vertex_array(None);
        }
    }

    /// Returns the amount of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_vertex_array(self.vao);
        }
    }
}
