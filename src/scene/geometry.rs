//! Vertex format and small mesh builders shared by the scene renderers.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use super::wall::WallUniforms;

/// Vertex data for all geometry-driven modes (world position + RGBA)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl ColorVertex {
    pub fn new(position: Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }
}

/// Everything the GPU needs for one frame, rebuilt by the active renderer
///
/// Vectors are cleared rather than dropped between frames so their capacity
/// carries over.
#[derive(Debug, Default)]
pub struct DrawList {
    /// Line segments, two vertices each
    pub lines: Vec<ColorVertex>,
    pub triangles: Vec<ColorVertex>,
    pub points: Vec<ColorVertex>,
    /// Fullscreen procedural pass (wall mode)
    pub wall: Option<WallUniforms>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.triangles.clear();
        self.points.clear();
        self.wall = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.triangles.is_empty()
            && self.points.is_empty()
            && self.wall.is_none()
    }
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Two counter-clockwise triangles per face
const CUBE_TRIANGLES: [[usize; 3]; 12] = [
    [4, 5, 6],
    [4, 6, 7], // +z
    [1, 0, 3],
    [1, 3, 2], // -z
    [5, 1, 2],
    [5, 2, 6], // +x
    [0, 4, 7],
    [0, 7, 3], // -x
    [7, 6, 2],
    [7, 2, 3], // +y
    [0, 1, 5],
    [0, 5, 4], // -y
];

/// Vertices appended by [`push_box`]
pub const BOX_VERTEX_COUNT: usize = 36;

/// Append an axis-aligned box (centre, half extents) transformed by `transform`
pub fn push_box(
    out: &mut Vec<ColorVertex>,
    transform: Mat4,
    center: Vec3,
    half: Vec3,
    color: [f32; 4],
) {
    for tri in CUBE_TRIANGLES {
        for corner in tri {
            let local = center + Vec3::from_array(CUBE_CORNERS[corner]) * half;
            out.push(ColorVertex::new(transform.transform_point3(local), color));
        }
    }
}

/// Unit icosahedron edges (30 segments on the unit sphere)
pub fn icosahedron_edges() -> Vec<(Vec3, Vec3)> {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let raw = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ];
    let corners: Vec<Vec3> = raw.iter().map(|c| Vec3::from_array(*c).normalize()).collect();

    // Neighbouring corners are exactly one edge length apart; everything else is farther
    let edge = corners[0].distance(corners[1]);
    let mut edges = Vec::with_capacity(30);
    for i in 0..corners.len() {
        for j in (i + 1)..corners.len() {
            if (corners[i].distance(corners[j]) - edge).abs() < 1e-3 {
                edges.push((corners[i], corners[j]));
            }
        }
    }
    edges
}

/// Linear interpolation used by every "follow" smoother
pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosahedron_has_thirty_edges() {
        let edges = icosahedron_edges();
        assert_eq!(edges.len(), 30);
        for (a, b) in edges {
            assert!((a.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_push_box_bounds() {
        let mut out = Vec::new();
        push_box(
            &mut out,
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.5, 1.0, 0.25),
            [1.0; 4],
        );
        assert_eq!(out.len(), BOX_VERTEX_COUNT);
        for v in &out {
            assert!((9.5..=10.5).contains(&v.position[0]));
            assert!((0.0..=2.0).contains(&v.position[1]));
            assert!((-0.25..=0.25).contains(&v.position[2]));
        }
    }

    #[test]
    fn test_lerp_moves_toward_target() {
        assert_eq!(lerp(0.0, 10.0, 0.3), 3.0);
        assert_eq!(lerp(5.0, 5.0, 0.3), 5.0);
    }
}
