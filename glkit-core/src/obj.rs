/// Wavefront OBJ parser producing per-group mesh parts with tangents
use std::path::Path;

use nom::{
    character::complete::{char, u32 as decimal},
    combinator::{all_consuming, opt},
    number::complete::float,
    sequence::preceded,
    Finish, IResult,
};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::material::MaterialRef;
use crate::math::{Vec2, Vec3};
use crate::mesh::{Mesh, MeshPart};
use crate::tangent;

/// One corner of a face, with 0-based indices into the file's attribute lists.
#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: usize,
    texcoord: usize,
    normal: usize,
    line: usize,
}

#[derive(Debug, Default)]
struct Group {
    name: Option<String>,
    /// Opened by a `g`/`o` line rather than being the implicit leading group.
    marked: bool,
    /// Triangle list: every three entries form a triangle.
    corners: Vec<FaceVertex>,
}

#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    normals: Vec<Vec3>,
    groups: Vec<Group>,
}

impl Mesh {
    /// Parse OBJ text. See [`parse_obj`].
    pub fn from_obj(text: &str, materials: &[MaterialRef]) -> Result<Mesh> {
        parse_obj(text, materials)
    }

    /// Read and parse an OBJ file.
    pub fn load_obj(path: impl AsRef<Path>, materials: &[MaterialRef]) -> Result<Mesh> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        debug!("Loading OBJ from {}", path.display());
        parse_obj(&text, materials)
    }
}

/// Parse OBJ text into a mesh with one part per `g`/`o` group.
///
/// Groups without faces are dropped, and the n-th remaining `g`/`o` group
/// gets `materials[n]` (or no material when the list is shorter). Faces
/// before the first `g`/`o` line form a leading part with no material,
/// unless the file has no groups at all, in which case that single part
/// takes `materials[0]`. Polygons are
/// fan-triangulated, so concave faces come out wrong. Texcoord `v` is
/// flipped to `1 - v`. Tangents are computed when the file has texcoords.
pub fn parse_obj(text: &str, materials: &[MaterialRef]) -> Result<Mesh> {
    let data = read_lines(text)?;

    let filled = || data.groups.iter().filter(|g| !g.corners.is_empty());
    let has_markers = filled().any(|g| g.marked);
    let mut materials = materials.iter();

    let mut parts = Vec::new();
    for group in filled() {
        let mut part = build_part(&data, group)?;
        if group.marked || !has_markers {
            part.material = materials.next().cloned();
        }
        parts.push(part);
    }

    let mesh = Mesh::from_parts(parts);
    debug!(
        "Parsed OBJ: {} positions, {} texcoords, {} normals, {} parts, {} triangles",
        data.positions.len(),
        data.texcoords.len(),
        data.normals.len(),
        mesh.parts.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn read_lines(text: &str) -> Result<ObjData> {
    let mut data = ObjData {
        groups: vec![Group::default()],
        ..ObjData::default()
    };

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => data.positions.push(read_floats::<3>(tokens, line, "v")?),
            "vt" => {
                let [u, v] = read_floats::<2>(tokens, line, "vt")?;
                data.texcoords.push([u, 1.0 - v]);
            }
            "vn" => data.normals.push(read_floats::<3>(tokens, line, "vn")?),
            "g" | "o" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                match data.groups.last_mut() {
                    Some(current) if current.corners.is_empty() => {
                        current.name = name;
                        current.marked = true;
                    }
                    _ => data.groups.push(Group {
                        name,
                        marked: true,
                        corners: Vec::new(),
                    }),
                }
            }
            "f" => {
                let refs = tokens
                    .map(|token| read_face_vertex(token, line))
                    .collect::<Result<Vec<_>>>()?;
                if refs.len() < 3 {
                    return Err(Error::parse(
                        line,
                        format!("face needs at least 3 vertices, got {}", refs.len()),
                    ));
                }
                if let Some(group) = data.groups.last_mut() {
                    group.corners.extend_from_slice(&refs[..3]);
                    for k in 3..refs.len() {
                        group
                            .corners
                            .extend_from_slice(&[refs[0], refs[k - 1], refs[k]]);
                    }
                }
            }
            _ if keyword.starts_with('#') => {}
            _ => trace!("Skipping unsupported OBJ directive '{}' on line {}", keyword, line),
        }
    }

    Ok(data)
}

fn number(input: &str) -> IResult<&str, f32> {
    float(input)
}

fn index(input: &str) -> IResult<&str, u32> {
    decimal(input)
}

/// Read the first `N` numbers of a directive. Extra components (such as the
/// optional `w` of `v`) are ignored.
fn read_floats<'a, const N: usize>(
    mut tokens: impl Iterator<Item = &'a str>,
    line: usize,
    keyword: &str,
) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    for (k, value) in values.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            Error::parse(line, format!("'{keyword}' needs {} components, got {k}", N))
        })?;
        *value = match all_consuming(number)(token).finish() {
            Ok((_, v)) if v.is_finite() => v,
            _ => return Err(Error::parse(line, format!("invalid number '{token}'"))),
        };
    }
    Ok(values)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`, all 1-based.
fn face_ref(input: &str) -> IResult<&str, (u32, Option<u32>, Option<u32>)> {
    let (input, v) = index(input)?;
    let (input, vt) = opt(preceded(char('/'), opt(index)))(input)?;
    let (input, vn) = opt(preceded(char('/'), opt(index)))(input)?;
    Ok((input, (v, vt.flatten(), vn.flatten())))
}

fn read_face_vertex(token: &str, line: usize) -> Result<FaceVertex> {
    if token.starts_with('-') || token.contains("/-") {
        return Err(Error::parse(
            line,
            format!("relative index in '{token}' is not supported"),
        ));
    }
    let (_, (v, vt, vn)) = all_consuming(face_ref)(token)
        .finish()
        .map_err(|_| Error::parse(line, format!("invalid face vertex '{token}'")))?;

    let zero_based = |i: u32| {
        i.checked_sub(1)
            .map(|i| i as usize)
            .ok_or_else(|| Error::parse(line, format!("index 0 in '{token}', indices start at 1")))
    };
    Ok(FaceVertex {
        position: zero_based(v)?,
        texcoord: vt.map(zero_based).transpose()?.unwrap_or(0),
        normal: vn.map(zero_based).transpose()?.unwrap_or(0),
        line,
    })
}

fn lookup<const N: usize>(
    list: &[[f32; N]],
    index: usize,
    what: &str,
    corner: &FaceVertex,
) -> Result<[f32; N]> {
    list.get(index).copied().ok_or_else(|| {
        Error::parse(
            corner.line,
            format!("{what} index {} out of range ({} defined)", index + 1, list.len()),
        )
    })
}

fn build_part(data: &ObjData, group: &Group) -> Result<MeshPart> {
    let has_texcoords = !data.texcoords.is_empty();
    let has_normals = !data.normals.is_empty();
    let count = group.corners.len();

    let mut part = MeshPart {
        name: group.name.clone(),
        positions: Vec::with_capacity(count * 3),
        indices: Vec::with_capacity(count),
        ..MeshPart::default()
    };
    let mut texcoord_indices = Vec::with_capacity(if has_texcoords { count } else { 0 });

    for (slot, corner) in group.corners.iter().enumerate() {
        part.positions
            .extend_from_slice(&lookup(&data.positions, corner.position, "position", corner)?);
        if has_texcoords {
            part.texcoords
                .extend_from_slice(&lookup(&data.texcoords, corner.texcoord, "texcoord", corner)?);
            texcoord_indices.push(corner.texcoord as u32);
        }
        if has_normals {
            part.normals
                .extend_from_slice(&lookup(&data.normals, corner.normal, "normal", corner)?);
        }
        part.indices.push(slot as u32);
    }

    if has_texcoords {
        part.tangents =
            tangent::triangle_list_tangents(&part.positions, &part.texcoords, &part.normals);
        tangent::average_shared_tangents(&mut part.tangents, &texcoord_indices);
    }

    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
f 1/1 2/2 3/3
";

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    fn parse_line_of(text: &str) -> usize {
        match parse_obj(text, &[]) {
            Err(Error::Parse { line, .. }) => line,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_single_triangle() {
        let mesh = parse_obj(TRIANGLE, &[]).unwrap();
        assert_eq!(mesh.parts.len(), 1);
        let part = &mesh.parts[0];
        assert_eq!(part.indices, vec![0, 1, 2]);
        assert_close(&part.texcoords, &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(!part.has_normals());
        assert!(part.material.is_none());
        for slot in 0..3 {
            let t = part.vertex(slot).unwrap().tangent.unwrap();
            assert_close(&t, &[1.0, 0.0, 0.0, -1.0]);
        }
    }

    #[test]
    fn test_triangle_with_vertex_normals() {
        let text = TRIANGLE.replace("f 1/1 2/2 3/3", "vn 0 0 1\nf 1/1/1 2/2/1 3/3/1");
        let mesh = parse_obj(&text, &[]).unwrap();
        let part = &mesh.parts[0];
        assert_eq!(part.vertex_count(), 3);
        assert_eq!(part.indices, vec![0, 1, 2]);
        assert_close(&part.normals, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_close(&part.tangents[0..4], &[1.0, 0.0, 0.0, -1.0]);
        assert_eq!(part.tangents.len(), 12);
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";
        let mesh = parse_obj(text, &[]).unwrap();
        let part = &mesh.parts[0];
        assert_eq!(part.indices.len(), 6);
        assert_eq!(part.vertex_count(), 6);
        assert!(!part.has_tangents());
        let corners: Vec<Vec3> = (0..6).map(|i| part.vertex(i).unwrap().position).collect();
        assert_eq!(corners[3], [0.0, 0.0, 0.0]);
        assert_eq!(corners[4], [1.0, 1.0, 0.0]);
        assert_eq!(corners[5], [0.0, 1.0, 0.0]);
        assert_eq!(part.vertex(5).unwrap().normal, Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_groups_split_parts_and_take_materials_in_order() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
g first
f 1 2 3
f 3 2 1
o second
f 1 2 3
";
        let materials = [Material::pbr().into_ref(), Material::skybox().into_ref()];
        let mesh = parse_obj(text, &materials).unwrap();
        assert_eq!(mesh.parts.len(), 3);

        assert_eq!(mesh.parts[0].name, None);
        assert_eq!(mesh.parts[1].name.as_deref(), Some("first"));
        assert_eq!(mesh.parts[2].name.as_deref(), Some("second"));
        assert_eq!(mesh.parts[1].indices, vec![0, 1, 2, 3, 4, 5]);

        let material_name = |i: usize| {
            mesh.parts[i]
                .material
                .as_ref()
                .map(|m| m.borrow().name.clone())
        };
        assert_eq!(material_name(0), None);
        assert_eq!(material_name(1).as_deref(), Some("pbr"));
        assert_eq!(material_name(2).as_deref(), Some("skybox"));
    }

    #[test]
    fn test_ungrouped_file_takes_first_material() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let materials = [Material::lambert().into_ref(), Material::pbr().into_ref()];
        let mesh = parse_obj(text, &materials).unwrap();
        assert_eq!(mesh.parts.len(), 1);
        let material = mesh.parts[0].material.as_ref().unwrap();
        assert_eq!(material.borrow().name, "lambert");
    }

    #[test]
    fn test_leading_faces_do_not_shift_group_materials() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\ng first\nf 1 2 3\n";
        let mesh = parse_obj(text, &[Material::pbr().into_ref()]).unwrap();
        assert_eq!(mesh.parts.len(), 2);
        assert!(mesh.parts[0].material.is_none());
        let first = mesh.parts[1].material.as_ref().unwrap();
        assert_eq!(first.borrow().name, "pbr");
    }

    #[test]
    fn test_empty_groups_collapse() {
        let text = "g a\no b\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\ng trailing\n";
        let mesh = parse_obj(text, &[]).unwrap();
        assert_eq!(mesh.parts.len(), 1);
        assert_eq!(mesh.parts[0].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_comments_and_unknown_directives_are_skipped() {
        let text = format!("# exported\nmtllib scene.mtl\nusemtl brick\ns 1\n\n{TRIANGLE}");
        let mesh = parse_obj(&text, &[]).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_errors_report_line_numbers() {
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 x\n"), 2);
        assert_eq!(parse_line_of("v 0 0\n"), 1);
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 1 2\n"), 5);
        assert_eq!(parse_line_of("v 0 0 0\nf 0 1 1\n"), 2);
        assert_eq!(parse_line_of("v 0 0 0\nf -1 -1 -1\n"), 2);
        assert_eq!(parse_line_of("v 0 0 0\nf 1 a 1\n"), 2);
        assert_eq!(parse_line_of("v 0 0 nan\n"), 1);
        // Range checks run after the whole file is read.
        assert_eq!(parse_line_of("v 0 0 0\nv 1 0 0\nf 1 2 9\nv 0 1 0\n"), 3);
        assert_eq!(parse_line_of(&format!("{TRIANGLE}f 1/4 2/1 3/1\n")), 8);
    }

    #[test]
    fn test_shared_texcoords_average_tangents() {
        // Two triangles with the same texcoords but different planes.
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 0 1
vt 0 0
vt 1 0
vt 0 1
f 1/1 2/2 3/3
f 1/1 4/2 3/3
";
        let mesh = parse_obj(text, &[]).unwrap();
        let part = &mesh.parts[0];
        let (s, c) = std::f32::consts::FRAC_PI_8.sin_cos();
        for slot in 0..6 {
            let t = part.vertex(slot).unwrap().tangent.unwrap();
            assert_close(&t, &[c, 0.0, s, -1.0]);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = Mesh::load_obj("/nonexistent/model.obj", &[]);
        assert!(matches!(result, Err(Error::Io(..))));
    }
}
