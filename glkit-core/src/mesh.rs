/// Mesh containers and procedural mesh generators
use tracing::warn;

use crate::material::{MaterialRef, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT, ATTR_TEXCOORD};
use crate::math::{self, Vec2, Vec3, Vec4};
use crate::tangent;

/// Deepest sphere subdivision accepted. Vertex count grows as `12 * 4^n`.
pub const MAX_SPHERE_SUBDIVISIONS: u32 = 8;

/// A single vertex gathered from a mesh part's attribute arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub texcoord: Option<Vec2>,
    pub normal: Option<Vec3>,
    /// xyz tangent, w handedness sign.
    pub tangent: Option<Vec4>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            texcoord: None,
            normal: None,
            tangent: None,
        }
    }
}

/// A run of faces sharing one material, with its own attribute buffers.
///
/// Attribute arrays are flat: 3 floats per position and normal, 2 per
/// texcoord, 4 per tangent. Optional attributes are empty when absent.
/// Indices start at 0 for every part.
#[derive(Debug, Clone, Default)]
pub struct MeshPart {
    /// Name from the `g`/`o` line that opened this part, if any.
    pub name: Option<String>,
    pub positions: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub normals: Vec<f32>,
    pub tangents: Vec<f32>,
    pub indices: Vec<u32>,
    /// Parts without a material are never drawn.
    pub material: Option<MaterialRef>,
}

impl MeshPart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn has_texcoords(&self) -> bool {
        !self.texcoords.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    /// Gather vertex `index` from the attribute arrays.
    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        if index >= self.vertex_count() {
            return None;
        }
        let i = index;
        Some(Vertex {
            position: [
                self.positions[i * 3],
                self.positions[i * 3 + 1],
                self.positions[i * 3 + 2],
            ],
            texcoord: self
                .texcoords
                .get(i * 2..i * 2 + 2)
                .map(|t| [t[0], t[1]]),
            normal: self
                .normals
                .get(i * 3..i * 3 + 3)
                .map(|n| [n[0], n[1], n[2]]),
            tangent: self
                .tangents
                .get(i * 4..i * 4 + 4)
                .map(|t| [t[0], t[1], t[2], t[3]]),
        })
    }

    /// Append a vertex. Optional attributes are only appended when present,
    /// so callers keep them consistent across the part.
    pub fn push_vertex(&mut self, vertex: &Vertex) {
        self.positions.extend_from_slice(&vertex.position);
        if let Some(t) = vertex.texcoord {
            self.texcoords.extend_from_slice(&t);
        }
        if let Some(n) = vertex.normal {
            self.normals.extend_from_slice(&n);
        }
        if let Some(t) = vertex.tangent {
            self.tangents.extend_from_slice(&t);
        }
    }

    /// Flat data and component count of a named shader attribute.
    pub fn attribute(&self, name: &str) -> Option<(&[f32], usize)> {
        let (data, components) = match name {
            ATTR_POSITION => (&self.positions, 3),
            ATTR_TEXCOORD => (&self.texcoords, 2),
            ATTR_NORMAL => (&self.normals, 3),
            ATTR_TANGENT => (&self.tangents, 4),
            _ => return None,
        };
        if data.is_empty() {
            None
        } else {
            Some((data.as_slice(), components))
        }
    }
}

/// An ordered list of mesh parts.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub parts: Vec<MeshPart>,
    /// Draw straight from the vertex stream instead of through the index buffer.
    pub use_draw_arrays: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: Vec<MeshPart>) -> Self {
        Self {
            parts,
            use_draw_arrays: false,
        }
    }

    /// Assign `material` to every part.
    pub fn with_material(mut self, material: MaterialRef) -> Self {
        for part in &mut self.parts {
            part.material = Some(material.clone());
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(MeshPart::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.parts
            .iter()
            .map(|p| {
                if self.use_draw_arrays {
                    p.vertex_count() / 3
                } else {
                    p.indices.len() / 3
                }
            })
            .sum()
    }

    /// Axis-aligned bounds over all parts, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self
            .parts
            .iter()
            .flat_map(|p| p.positions.chunks_exact(3))
            .map(|c| [c[0], c[1], c[2]]);
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                std::array::from_fn(|i| lo[i].min(p[i])),
                std::array::from_fn(|i| hi[i].max(p[i])),
            )
        }))
    }

    /// Cube spanning -1..1 on every axis. Each face has its own 4 vertices
    /// with a flat normal, texcoords and tangents.
    pub fn create_cube() -> Self {
        let mut part = MeshPart::new();
        for (face, (normal, corners)) in CUBE_FACES.iter().enumerate() {
            let (t, w) = tangent::face_tangent(
                [corners[0], corners[1], corners[2]],
                [FACE_UVS[0], FACE_UVS[1], FACE_UVS[2]],
            )
            .map(|(t, b)| (t, tangent::handedness(*normal, t, b)))
            .unwrap_or_else(|| (tangent::fallback_tangent(*normal), 1.0));
            let tangent = math::extend(t, w);

            for (corner, uv) in corners.iter().zip(FACE_UVS) {
                part.push_vertex(&Vertex {
                    position: *corner,
                    texcoord: Some(uv),
                    normal: Some(*normal),
                    tangent: Some(tangent),
                });
            }
            let base = (face * 4) as u32;
            part.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::from_parts(vec![part])
    }

    /// Skybox cage spanning `-half_extent..half_extent`, wound to be visible
    /// from inside. Positions only: the skybox shader samples by direction.
    pub fn create_cube_map(half_extent: f32) -> Self {
        let mut part = MeshPart::new();
        for (face, (_, corners)) in CUBE_FACES.iter().enumerate() {
            for corner in corners {
                part.positions
                    .extend_from_slice(&math::mult_scalar(half_extent, *corner));
            }
            let base = (face * 4) as u32;
            part.indices
                .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        Self::from_parts(vec![part])
    }

    /// Unit sphere from recursive subdivision of a regular tetrahedron.
    ///
    /// Vertices are not shared between triangles, so the mesh holds
    /// `4 * 4^subdivisions` triangles and three times as many vertices, with
    /// sequential indices. Normals equal positions.
    pub fn create_sphere(subdivisions: u32, material: Option<MaterialRef>) -> Self {
        let depth = if subdivisions > MAX_SPHERE_SUBDIVISIONS {
            warn!(
                "Sphere subdivision {} clamped to {}",
                subdivisions, MAX_SPHERE_SUBDIVISIONS
            );
            MAX_SPHERE_SUBDIVISIONS
        } else {
            subdivisions
        };

        let vertex_total = 12 * 4usize.pow(depth);
        let mut part = MeshPart {
            positions: Vec::with_capacity(vertex_total * 3),
            normals: Vec::with_capacity(vertex_total * 3),
            indices: Vec::with_capacity(vertex_total),
            material,
            ..MeshPart::default()
        };

        let [a, b, c, d] = TETRAHEDRON.map(math::normalize);
        divide_triangle(&mut part, a, b, c, depth);
        divide_triangle(&mut part, d, c, b, depth);
        divide_triangle(&mut part, a, d, b, depth);
        divide_triangle(&mut part, a, c, d, depth);

        Self::from_parts(vec![part])
    }
}

fn divide_triangle(part: &mut MeshPart, a: Vec3, b: Vec3, c: Vec3, depth: u32) {
    if depth == 0 {
        for v in [a, b, c] {
            let next = part.vertex_count() as u32;
            part.indices.push(next);
            part.positions.extend_from_slice(&v);
            part.normals.extend_from_slice(&v);
        }
        return;
    }

    let ab = math::normalize(math::mid(a, b));
    let ac = math::normalize(math::mid(a, c));
    let bc = math::normalize(math::mid(b, c));
    divide_triangle(part, a, ab, ac, depth - 1);
    divide_triangle(part, ab, b, bc, depth - 1);
    divide_triangle(part, bc, c, ac, depth - 1);
    divide_triangle(part, ab, bc, ac, depth - 1);
}

const TETRAHEDRON: [Vec3; 4] = [
    [0.0, 0.0, -1.0],
    [0.0, 0.942809, 0.333333],
    [-0.816497, -0.471405, 0.333333],
    [0.816497, -0.471405, 0.333333],
];

/// Texcoords of each face's corners, top-left origin.
const FACE_UVS: [Vec2; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Outward normal and corners of each cube face, counter-clockwise from outside.
const CUBE_FACES: [(Vec3, [Vec3; 4]); 6] = [
    // Front
    (
        [0.0, 0.0, 1.0],
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
    ),
    // Back
    (
        [0.0, 0.0, -1.0],
        [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
    ),
    // Top
    (
        [0.0, 1.0, 0.0],
        [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
    ),
    // Bottom
    (
        [0.0, -1.0, 0.0],
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
    ),
    // Right
    (
        [1.0, 0.0, 0.0],
        [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
    ),
    // Left
    (
        [-1.0, 0.0, 0.0],
        [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
    ),
];
