/// Model transforms and the per-draw matrix uniforms
use crate::error::Result;
use crate::material::UniformValue;
use crate::math::{self, Mat4, Vec3, IDENTITY4};
use crate::projection::Camera;

/// Rotation state around three axes (in degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in degrees), wrapping into [0, 360)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x = (self.x + dx).rem_euclid(360.0);
        self.y = (self.y + dy).rem_euclid(360.0);
        self.z = (self.z + dz).rem_euclid(360.0);
    }

    /// Rotation about X, then Y, then Z
    pub fn matrix(&self) -> Mat4 {
        let m = math::rotate(&IDENTITY4, self.x, [1.0, 0.0, 0.0]);
        let m = math::rotate(&m, self.y, [0.0, 1.0, 0.0]);
        math::rotate(&m, self.z, [0.0, 0.0, 1.0])
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Placement of an object in the world: scaled, then rotated, then translated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: RotationState,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: RotationState::zero(),
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationState) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_uniform_scale(mut self, factor: f32) -> Self {
        self.scale = [factor; 3];
        self
    }

    pub fn model_matrix(&self) -> Mat4 {
        let scaled = math::scale(&IDENTITY4, self.scale);
        let rotated = math::mult_mat(&self.rotation.matrix(), &scaled);
        math::translate(&rotated, self.translation)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(model: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
        math::mult_mat(projection, &math::mult_mat(view, model))
    }

    /// Matrix uniforms for drawing this object through `camera`.
    ///
    /// `UMatNormal` is the inverse transpose of the model matrix, so normals
    /// come out in world space next to `UCamPosition`.
    pub fn uniforms(&self, camera: &Camera) -> Result<Vec<(&'static str, UniformValue)>> {
        let model = self.model_matrix();
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        let model_view = math::mult_mat(&view, &model);
        let mvp = math::mult_mat(&projection, &model_view);
        let view_inverse = math::inverse(&view)?;
        let eye = [view_inverse[3], view_inverse[7], view_inverse[11]];

        Ok(vec![
            ("UMatModel", UniformValue::Mat4(model)),
            ("UMatView", UniformValue::Mat4(view)),
            ("UMatMV", UniformValue::Mat4(model_view)),
            ("UMatProj", UniformValue::Mat4(projection)),
            ("UMatMVP", UniformValue::Mat4(mvp)),
            ("UMatNormal", UniformValue::Mat4(math::normal_matrix(&model)?)),
            ("UMatViewInv", UniformValue::Mat4(view_inverse)),
            ("UCamPosition", UniformValue::Vec4(math::extend(eye, 1.0))),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert_eq!(state.x, 0.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(state.z, 0.0);

        state.rotate(10.0, 20.0, 30.0);
        assert!((state.x - 10.0).abs() < 1e-6);
        assert!((state.y - 20.0).abs() < 1e-6);
        assert!((state.z - 30.0).abs() < 1e-6);

        state.rotate(-20.0, 350.0, 0.0);
        assert!((state.x - 350.0).abs() < 1e-4);
        assert!((state.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_identity_rotation() {
        assert_eq!(RotationState::zero().matrix(), IDENTITY4);
        assert_eq!(Transform::new().model_matrix(), IDENTITY4);
    }

    #[test]
    fn test_model_matrix_order() {
        let transform = Transform::new()
            .with_uniform_scale(2.0)
            .with_rotation(RotationState::new(0.0, 90.0, 0.0))
            .with_translation([3.0, 0.0, 0.0]);
        let p = math::mult_mat_vec(&transform.model_matrix(), [1.0, 0.0, 0.0, 1.0]);
        // (1,0,0) scaled to (2,0,0), turned to (0,0,-2), moved to (3,0,-2).
        assert_close(&p, &[3.0, 0.0, -2.0, 1.0]);
    }

    #[test]
    fn test_uniforms() {
        let camera = Camera::default();
        let transform = Transform::new().with_translation([0.0, 1.0, 0.0]);
        let uniforms = transform.uniforms(&camera).unwrap();
        assert_eq!(uniforms.len(), 8);

        let get = |name: &str| uniforms.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        match get("UCamPosition") {
            Some(UniformValue::Vec4(p)) => assert_close(&p, &[0.0, 0.0, 5.0, 1.0]),
            other => panic!("unexpected {other:?}"),
        }

        let model = transform.model_matrix();
        let expected = Transform::mvp_matrix(
            &model,
            &camera.view_matrix(),
            &camera.projection_matrix(),
        );
        assert_eq!(get("UMatMVP"), Some(UniformValue::Mat4(expected)));
        // Pure translation leaves normals alone.
        match get("UMatNormal") {
            Some(UniformValue::Mat4(n)) => assert_close(&math::upper_left(&n), &math::upper_left(&IDENTITY4)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
