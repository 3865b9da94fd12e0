//! GPU Geometry
//!
//! [`Geometry`] owns the vertex and index buffers of one mesh, or stands for
//! the buffer-less full-screen triangle used by post-process passes.
//!
//! Buffers carry `STORAGE` usage in addition to `VERTEX`/`INDEX` because the
//! tessellated renderer fetches control points from storage buffers instead
//! of the vertex input stage.

use wgpu::util::DeviceExt;

use crate::assets::mesh::{Mesh, Vertex};

/// Primitive type of an indexed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    /// Patches of `control_points` vertices, expanded by the tessellated pipeline.
    Patches { control_points: u32 },
}

#[derive(Debug, Default)]
pub enum Geometry {
    #[default]
    Empty,
    /// Three implicit vertices generated from `vertex_index`.
    FullScreenTriangle,
    Indexed {
        vertex_buffer: wgpu::Buffer,
        index_buffer: wgpu::Buffer,
        index_count: u32,
        mode: DrawMode,
    },
}

impl Geometry {
    /// Uploads a mesh as an indexed triangle (or patch) list.
    #[must_use]
    pub fn from_mesh(device: &wgpu::Device, mesh: &Mesh, mode: DrawMode, label: &str) -> Self {
        if mesh.indices.is_empty() {
            log::warn!("Geometry '{label}': mesh has no faces");
            return Self::Empty;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE,
        });

        Self::Indexed {
            vertex_buffer,
            index_buffer,
            index_count: (mesh.indices.len() * 3) as u32,
            mode,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::FullScreenTriangle => 1,
            Self::Indexed { index_count, .. } => index_count / 3,
        }
    }

    /// Number of patches for patch-mode geometry, triangles otherwise.
    #[must_use]
    pub fn patch_count(&self) -> u32 {
        match self {
            Self::Indexed {
                index_count,
                mode: DrawMode::Patches { control_points },
                ..
            } => index_count / (*control_points).max(1),
            _ => self.triangle_count(),
        }
    }

    #[must_use]
    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        match self {
            Self::Indexed { vertex_buffer, .. } => Some(vertex_buffer),
            _ => None,
        }
    }

    #[must_use]
    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        match self {
            Self::Indexed { index_buffer, .. } => Some(index_buffer),
            _ => None,
        }
    }

    /// Vertex input layout matching [`Vertex`].
    #[must_use]
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x2,
        ];
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Issues the draw for triangle or full-screen geometry.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        match self {
            Self::Empty => {}
            Self::FullScreenTriangle => pass.draw(0..3, 0..1),
            Self::Indexed {
                vertex_buffer,
                index_buffer,
                index_count,
                mode: DrawMode::Triangles,
            } => {
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*index_count, 0, 0..1);
            }
            Self::Indexed {
                mode: DrawMode::Patches { .. },
                ..
            } => {
                log::warn!("Geometry::render called on patch geometry, use render_patches");
            }
        }
    }

    /// Issues the instanced subdivision draw for patch geometry.
    ///
    /// Each instance is one patch; each instance expands to `3·level²`
    /// vertices. The control points are read from storage buffers bound by
    /// the caller.
    pub fn render_patches(&self, pass: &mut wgpu::RenderPass<'_>, level: u32) {
        let Self::Indexed {
            mode: DrawMode::Patches { .. },
            ..
        } = self
        else {
            log::warn!("Geometry::render_patches called on non-patch geometry");
            return;
        };
        let level = level.max(1);
        pass.draw(0..3 * level * level, 0..self.patch_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_screen_triangle_counts_one_triangle() {
        assert!(Geometry::FullScreenTriangle.is_usable());
        assert_eq!(Geometry::FullScreenTriangle.triangle_count(), 1);
        assert!(!Geometry::Empty.is_usable());
        assert_eq!(Geometry::default().triangle_count(), 0);
    }

    #[test]
    fn vertex_layout_matches_vertex_struct() {
        let layout = Geometry::vertex_layout();
        assert_eq!(layout.array_stride, 56);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36, 48]);
    }
}
