/// Camera and projection utilities
use serde::Deserialize;

use crate::error::Result;
use crate::math::{self, Mat4, Vec3};
use crate::settings::Settings;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    Orthographic,
    #[default]
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub at: Vec3,
    pub eye: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub y_fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self::default();
        camera.set_viewport(width, height);
        camera
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            at: settings.camera.at,
            eye: settings.camera.eye,
            up: settings.camera.up,
            y_fov: settings.projection.y_fov,
            aspect: settings.projection.aspect,
            near: settings.projection.near,
            far: settings.projection.far,
            mode: settings.projection.mode,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Mat4 {
        math::look_at(self.at, self.eye, self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        match self.mode {
            ProjectionMode::Perspective => {
                math::perspective(self.y_fov, self.aspect, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = math::length(math::sub(self.eye, self.at));
                let width = height * self.aspect;
                math::orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Camera position recovered from the inverse of the view matrix
    pub fn world_position(&self) -> Result<Vec3> {
        let inv = math::inverse(&self.view_matrix())?;
        Ok([inv[3], inv[7], inv[11]])
    }

    /// Project a point to screen space: pixel x, pixel y and NDC depth.
    /// Points behind the camera or outside the view volume give `None`.
    pub fn project_to_screen(
        &self,
        point: Vec3,
        model_matrix: &Mat4,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = math::mult_mat(
            &self.projection_matrix(),
            &math::mult_mat(&self.view_matrix(), model_matrix),
        );
        let clip = math::mult_mat_vec(&mvp, math::extend(point, 1.0));
        Self::clip_to_screen(clip, width, height)
    }

    /// Perspective divide and viewport mapping of a clip-space position
    pub fn clip_to_screen(clip: [f32; 4], width: u32, height: u32) -> Option<(f32, f32, f32)> {
        // Prevent division by near-zero w and drop points behind the eye
        if clip[3] < 1e-6 {
            return None;
        }

        let ndc_x = clip[0] / clip[3];
        let ndc_y = clip[1] / clip[3];
        let depth = clip[2] / clip[3];

        // Clip test
        if !(-1.0..=1.0).contains(&ndc_x)
            || !(-1.0..=1.0).contains(&ndc_y)
            || !(-1.0..=1.0).contains(&depth)
        {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::IDENTITY4;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(camera.y_fov, 65.0);
    }

    #[test]
    fn test_world_position_is_eye() {
        let mut camera = Camera::default();
        camera.eye = [2.0, -3.0, 4.0];
        camera.at = [0.5, 0.0, 0.0];
        let p = camera.world_position().unwrap();
        for (a, e) in p.iter().zip(camera.eye) {
            assert!((a - e).abs() < 1e-4);
        }
    }

    #[test]
    fn test_project_center_and_behind() {
        let camera = Camera::new(800, 600);
        let (x, y, depth) = camera
            .project_to_screen([0.0, 0.0, 0.0], &IDENTITY4, 800, 600)
            .unwrap();
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!(depth > -1.0 && depth < 1.0);

        // Behind the eye at z = 5
        assert!(camera
            .project_to_screen([0.0, 0.0, 10.0], &IDENTITY4, 800, 600)
            .is_none());
    }

    #[test]
    fn test_up_is_up_on_screen() {
        let camera = Camera::new(800, 600);
        let (_, y, _) = camera
            .project_to_screen([0.0, 1.0, 0.0], &IDENTITY4, 800, 600)
            .unwrap();
        assert!(y < 300.0);
    }

    #[test]
    fn test_orthographic_keeps_size_with_depth() {
        let mut camera = Camera::new(800, 600);
        camera.mode = ProjectionMode::Orthographic;
        let near = camera
            .project_to_screen([1.0, 0.0, 1.0], &IDENTITY4, 800, 600)
            .unwrap();
        let far = camera
            .project_to_screen([1.0, 0.0, -1.0], &IDENTITY4, 800, 600)
            .unwrap();
        assert!((near.0 - far.0).abs() < 1e-3);
        assert!(near.2 < far.2);
    }
}
