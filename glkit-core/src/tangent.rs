//! Tangent-space generation for normal mapping.
//!
//! Tangents are stored as 4 floats per vertex: xyz is the unit tangent and w
//! is the handedness sign (+1 or -1). The shader rebuilds the bitangent as
//! `cross(normal, tangent.xyz) * tangent.w`.

use std::collections::HashMap;

use crate::math::{self, Vec2, Vec3};

/// UV determinants smaller than this are treated as zero-area.
const DEGENERATE_EPSILON: f32 = 1e-10;

/// Tangent and bitangent of one triangle, solved from its texcoord derivatives.
///
/// Edges are `p1 - p0` and `p2 - p1`. Returns `None` when the texcoords span
/// no area (or the positions are degenerate), since the 2x2 system then has
/// no solution.
pub fn face_tangent(positions: [Vec3; 3], uvs: [Vec2; 3]) -> Option<(Vec3, Vec3)> {
    let e1 = math::sub(positions[1], positions[0]);
    let e2 = math::sub(positions[2], positions[1]);
    let (du1, dv1) = (uvs[1][0] - uvs[0][0], uvs[1][1] - uvs[0][1]);
    let (du2, dv2) = (uvs[2][0] - uvs[1][0], uvs[2][1] - uvs[1][1]);

    let det = du1 * dv2 - du2 * dv1;
    if !det.is_finite() || det.abs() < DEGENERATE_EPSILON {
        return None;
    }
    let r = 1.0 / det;

    let tangent = math::mult_scalar(
        r,
        math::sub(math::mult_scalar(dv2, e1), math::mult_scalar(dv1, e2)),
    );
    let bitangent = math::mult_scalar(
        r,
        math::sub(math::mult_scalar(du1, e2), math::mult_scalar(du2, e1)),
    );

    let len = math::length(tangent);
    if !len.is_finite() || len == 0.0 {
        return None;
    }
    Some((math::normalize(tangent), bitangent))
}

/// +1 when (tangent, bitangent, normal) is right-handed, -1 otherwise.
pub fn handedness(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> f32 {
    if math::dot(math::cross(normal, tangent), bitangent) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// A unit vector perpendicular to `normal`, used where texcoords cannot
/// define a tangent.
pub fn fallback_tangent(normal: Vec3) -> Vec3 {
    let n = math::normalize(normal);
    if math::length(n) < 0.5 {
        return [1.0, 0.0, 0.0];
    }
    let reference = if n[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let along = math::mult_scalar(math::dot(reference, n), n);
    math::normalize(math::sub(reference, along))
}

fn vec3_at(data: &[f32], slot: usize) -> Vec3 {
    [data[slot * 3], data[slot * 3 + 1], data[slot * 3 + 2]]
}

fn vec2_at(data: &[f32], slot: usize) -> Vec2 {
    [data[slot * 2], data[slot * 2 + 1]]
}

/// Per-vertex tangents for a non-indexed triangle list, where every three
/// consecutive vertices form a triangle.
///
/// `positions` and `normals` hold 3 floats per vertex, `texcoords` 2. When
/// `normals` is empty the geometric face normal decides handedness and the
/// fallback direction. Returns 4 floats per vertex, or nothing when there
/// are fewer texcoords than vertices.
pub fn triangle_list_tangents(positions: &[f32], texcoords: &[f32], normals: &[f32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    if texcoords.len() / 2 < vertex_count || (!normals.is_empty() && normals.len() / 3 < vertex_count) {
        return Vec::new();
    }
    let mut tangents = Vec::with_capacity(vertex_count * 4);

    for first in (0..vertex_count - vertex_count % 3).step_by(3) {
        let slots = [first, first + 1, first + 2];
        let p = slots.map(|s| vec3_at(positions, s));
        let uv = slots.map(|s| vec2_at(texcoords, s));

        let face_normal = math::normalize(math::cross(
            math::sub(p[1], p[0]),
            math::sub(p[2], p[1]),
        ));
        let n = slots.map(|s| {
            if normals.is_empty() {
                face_normal
            } else {
                vec3_at(normals, s)
            }
        });

        match face_tangent(p, uv) {
            Some((t, b)) => {
                for normal in n {
                    tangents.extend_from_slice(&math::extend(t, handedness(normal, t, b)));
                }
            }
            None => {
                for normal in n {
                    tangents.extend_from_slice(&math::extend(fallback_tangent(normal), 1.0));
                }
            }
        }
    }

    tangents
}

/// Smooth tangents across faces that share a texcoord.
///
/// `texcoord_indices[slot]` is the source texcoord index of each vertex slot.
/// Slots sharing a texcoord index are averaged separately for each
/// handedness sign, and the normalized average is written back to every slot
/// of that bucket. Mirrored UV islands keep their own tangents.
pub fn average_shared_tangents(tangents: &mut [f32], texcoord_indices: &[u32]) {
    let slot_count = (tangents.len() / 4).min(texcoord_indices.len());

    let mut groups: HashMap<u32, Vec<usize>> = HashMap::new();
    for (slot, &texcoord) in texcoord_indices.iter().take(slot_count).enumerate() {
        groups.entry(texcoord).or_default().push(slot);
    }

    for slots in groups.values().filter(|slots| slots.len() > 1) {
        for sign in [1.0_f32, -1.0] {
            let bucket: Vec<usize> = slots
                .iter()
                .copied()
                .filter(|&s| tangents[s * 4 + 3] * sign > 0.0)
                .collect();
            if bucket.len() < 2 {
                continue;
            }

            let sum = bucket.iter().fold([0.0; 3], |acc, &s| {
                math::add(acc, [tangents[s * 4], tangents[s * 4 + 1], tangents[s * 4 + 2]])
            });
            // Opposing tangents cancel out; keep the per-face values then.
            if math::length(sum) <= f32::EPSILON {
                continue;
            }
            let average = math::normalize(sum);

            for &s in &bucket {
                tangents[s * 4..s * 4 + 3].copy_from_slice(&average);
            }
        }
    }
}
