//! Patch Subdivision
//!
//! Emulated tessellation: a triangle patch at level `L` is split into `L²`
//! sub-triangles on a uniform barycentric grid and drawn as `3·L²` vertices per
//! instance. The vertex shader maps `vertex_index` to integer barycentric
//! weights with the same arithmetic as [`subdivision_weights`].
//!
//! Grid point `(i, j)` has weights `(L - i - j, i, j)` for the patch corners
//! `(P0, P1, P2)`. Row `r` (points with `j == r`) holds `L - r` "up" triangles
//! and `L - r - 1` "down" triangles, interleaved; rows before `r` hold
//! `r·(2L - r)` triangles. Both triangle kinds keep the patch's winding.

use glam::{Mat4, Vec2, Vec4Swizzles};

/// Screen-space edge length, in pixels, the level selection aims for.
pub const TARGET_EDGE_PIXELS: f32 = 8.0;

/// Triangles in rows `0..row` of a level-`level` grid.
#[inline]
#[must_use]
pub fn triangles_before_row(level: u32, row: u32) -> u32 {
    row * (2 * level - row)
}

/// Integer barycentric weights of subdivision vertex `vertex_index`.
///
/// The weights sum to `level`; the vertex position is
/// `(w0·P0 + w1·P1 + w2·P2) / level`.
#[must_use]
pub fn subdivision_weights(level: u32, vertex_index: u32) -> [u32; 3] {
    let level = level.max(1);
    let triangle = (vertex_index / 3).min(level * level - 1);
    let corner = vertex_index % 3;

    let l = level as f32;
    let mut row = (l - (l * l - triangle as f32).max(0.0).sqrt()).floor() as u32;
    row = row.min(level - 1);
    while row + 1 < level && triangles_before_row(level, row + 1) <= triangle {
        row += 1;
    }
    while row > 0 && triangles_before_row(level, row) > triangle {
        row -= 1;
    }

    let k = triangle - triangles_before_row(level, row);
    let (i, j) = if k % 2 == 0 {
        let u = k / 2;
        [(u, row), (u + 1, row), (u, row + 1)][corner as usize]
    } else {
        let d = (k - 1) / 2;
        [(d + 1, row), (d + 1, row + 1), (d, row + 1)][corner as usize]
    };
    [level - i - j, i, j]
}

/// Tessellation level for a mesh of bounding radius `radius` (model space).
///
/// Aims for sub-triangle edges of about [`TARGET_EDGE_PIXELS`] on screen,
/// assuming `patch_count` patches spread evenly over the bounding sphere. A
/// camera inside the sphere, or a sphere crossing the camera plane, gets the
/// maximum level.
#[must_use]
pub fn tess_level_for(
    radius: f32,
    model_view: Mat4,
    projection: Mat4,
    viewport: Vec2,
    max_level: u32,
    patch_count: u32,
) -> u32 {
    let max_level = max_level.max(1);
    let scale = model_view
        .x_axis
        .xyz()
        .length()
        .max(model_view.y_axis.xyz().length())
        .max(model_view.z_axis.xyz().length());
    let world_radius = radius * scale;
    let depth = -model_view.w_axis.z;

    if world_radius <= 0.0 || !depth.is_finite() || depth <= world_radius {
        return max_level;
    }

    // Pixels per world unit at the sphere's depth.
    let pixels_per_unit = projection.y_axis.y * viewport.y * 0.5 / depth;

    let patch_area = 4.0 * std::f32::consts::PI * world_radius * world_radius / patch_count.max(1) as f32;
    let patch_edge = (4.0 * patch_area / 3f32.sqrt()).sqrt();
    let edge_pixels = patch_edge * pixels_per_unit;

    let level = (edge_pixels / TARGET_EDGE_PIXELS).ceil();
    if !level.is_finite() {
        return max_level;
    }
    (level as u32).clamp(1, max_level)
}
