/// GLKit Web - WASM bindings for mesh building and matrix math
///
/// JavaScript owns the WebGL context. This module hands it typed arrays:
/// per-part vertex attributes and indices, and row-major matrices that go
/// through `flatten` before `uniformMatrix4fv`.
use glkit_core::math::{self, Mat4};
use glkit_core::{Mesh, MeshPart, Operand, RotationState, Transform};
use wasm_bindgen::prelude::*;

fn to_js(error: glkit_core::Error) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct WebMesh {
    mesh: Mesh,
}

#[wasm_bindgen]
impl WebMesh {
    /// Parse OBJ text. Each `g`/`o` group becomes a part.
    #[wasm_bindgen(js_name = parseObj)]
    pub fn parse_obj(text: &str) -> Result<WebMesh, JsValue> {
        let mesh = Mesh::from_obj(text, &[]).map_err(to_js)?;
        Ok(WebMesh { mesh })
    }

    #[wasm_bindgen(js_name = createCube)]
    pub fn create_cube() -> WebMesh {
        WebMesh {
            mesh: Mesh::create_cube(),
        }
    }

    #[wasm_bindgen(js_name = createCubeMap)]
    pub fn create_cube_map(half_extent: f32) -> WebMesh {
        WebMesh {
            mesh: Mesh::create_cube_map(half_extent),
        }
    }

    #[wasm_bindgen(js_name = createSphere)]
    pub fn create_sphere(subdivisions: u32) -> WebMesh {
        WebMesh {
            mesh: Mesh::create_sphere(subdivisions, None),
        }
    }

    #[wasm_bindgen(getter, js_name = partCount)]
    pub fn part_count(&self) -> usize {
        self.mesh.parts.len()
    }

    #[wasm_bindgen(getter, js_name = useDrawArrays)]
    pub fn use_draw_arrays(&self) -> bool {
        self.mesh.use_draw_arrays
    }

    #[wasm_bindgen(js_name = partName)]
    pub fn part_name(&self, part: usize) -> Option<String> {
        self.part(part).and_then(|p| p.name.clone())
    }

    /// Positions of one part, 3 floats per vertex. Empty for a bad index.
    pub fn positions(&self, part: usize) -> Vec<f32> {
        self.part(part).map(|p| p.positions.clone()).unwrap_or_default()
    }

    /// 2 floats per vertex, empty when the part has none.
    pub fn texcoords(&self, part: usize) -> Vec<f32> {
        self.part(part).map(|p| p.texcoords.clone()).unwrap_or_default()
    }

    pub fn normals(&self, part: usize) -> Vec<f32> {
        self.part(part).map(|p| p.normals.clone()).unwrap_or_default()
    }

    /// 4 floats per vertex, w holding the handedness sign.
    pub fn tangents(&self, part: usize) -> Vec<f32> {
        self.part(part).map(|p| p.tangents.clone()).unwrap_or_default()
    }

    pub fn indices(&self, part: usize) -> Vec<u32> {
        self.part(part).map(|p| p.indices.clone()).unwrap_or_default()
    }
}

impl WebMesh {
    fn part(&self, index: usize) -> Option<&MeshPart> {
        self.mesh.parts.get(index)
    }
}

#[wasm_bindgen]
pub fn perspective(y_fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Vec<f32> {
    math::perspective(y_fov_degrees, aspect, near, far).to_vec()
}

/// View matrix. Each vector is passed as a 3-element array.
#[wasm_bindgen(js_name = lookAt)]
pub fn look_at(at: &[f32], eye: &[f32], up: &[f32]) -> Vec<f32> {
    math::look_at(
        math::vec3_from_slice(at),
        math::vec3_from_slice(eye),
        math::vec3_from_slice(up),
    )
    .to_vec()
}

/// Model matrix: uniform scale, rotation about X, Y, Z in degrees, then translation.
#[wasm_bindgen(js_name = modelMatrix)]
#[allow(clippy::too_many_arguments)]
pub fn model_matrix(scale: f32, rx: f32, ry: f32, rz: f32, tx: f32, ty: f32, tz: f32) -> Vec<f32> {
    Transform::new()
        .with_uniform_scale(scale)
        .with_rotation(RotationState::new(rx, ry, rz))
        .with_translation([tx, ty, tz])
        .model_matrix()
        .to_vec()
}

#[wasm_bindgen(js_name = normalMatrix)]
pub fn normal_matrix(model: &[f32]) -> Result<Vec<f32>, JsValue> {
    let model: Mat4 = model
        .try_into()
        .map_err(|_| JsValue::from_str("normalMatrix expects 16 values"))?;
    Ok(math::normal_matrix(&model).map_err(to_js)?.to_vec())
}

fn operand(values: &[f32]) -> Result<Operand, JsValue> {
    Operand::from_slice(values).map_err(to_js)
}

/// Sum of two operands of the same shape.
#[wasm_bindgen]
pub fn add(a: &[f32], b: &[f32]) -> Result<Vec<f32>, JsValue> {
    let sum = operand(a)?.add(&operand(b)?).map_err(to_js)?;
    Ok(sum.as_slice().to_vec())
}

#[wasm_bindgen]
pub fn sub(a: &[f32], b: &[f32]) -> Result<Vec<f32>, JsValue> {
    let difference = operand(a)?.sub(&operand(b)?).map_err(to_js)?;
    Ok(difference.as_slice().to_vec())
}

/// Product of two operands. The shape of each is read from its length, so a
/// one-element array is a scalar and a 16-element array a 4x4 matrix.
#[wasm_bindgen]
pub fn mult(a: &[f32], b: &[f32]) -> Result<Vec<f32>, JsValue> {
    let product = operand(a)?.mult(&operand(b)?).map_err(to_js)?;
    Ok(product.as_slice().to_vec())
}

/// Column-major copy of a row-major matrix, ready for `uniformMatrix4fv`.
#[wasm_bindgen]
pub fn flatten(m: &[f32]) -> Result<Vec<f32>, JsValue> {
    let flat = operand(m)?.transpose().map_err(to_js)?;
    Ok(flat.as_slice().to_vec())
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_buffers() {
        let cube = WebMesh::create_cube();
        assert_eq!(cube.part_count(), 1);
        assert_eq!(cube.positions(0).len(), 72);
        assert_eq!(cube.tangents(0).len(), 96);
        assert_eq!(cube.indices(0).len(), 36);
        assert!(cube.positions(1).is_empty());
    }

    #[test]
    fn test_flatten_for_upload() {
        let m = model_matrix(1.0, 0.0, 0.0, 0.0, 4.0, 5.0, 6.0);
        assert_eq!([m[3], m[7], m[11]], [4.0, 5.0, 6.0]);
        let flat = flatten(&m).unwrap();
        assert_eq!(&flat[12..15], &[4.0, 5.0, 6.0]);

        let p = flatten(&perspective(90.0, 1.0, 1.0, 3.0)).unwrap();
        assert_eq!(p[11], -1.0);
        assert!((p[14] + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_untyped_math() {
        let scale = model_matrix(2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let moved = model_matrix(1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        let m = mult(&scale, &moved).unwrap();
        // Scaling after translation doubles the offset.
        assert_eq!([m[3], m[7], m[11]], [2.0, 4.0, 6.0]);

        let p = mult(&m, &[0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(p, vec![2.0, 4.0, 6.0, 1.0]);
        assert_eq!(mult(&[2.0], &[1.0, 2.0, 3.0]).unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(add(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![4.0, 6.0]);
        assert_eq!(sub(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![-2.0, -2.0]);
    }

    #[test]
    fn test_normal_matrix_of_translation() {
        let m = model_matrix(1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        let n = normal_matrix(&m).unwrap();
        assert_eq!(&n[0..3], &[1.0, 0.0, 0.0]);
    }
}
