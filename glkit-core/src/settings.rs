/// Viewer settings loaded from TOML
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::math::Vec3;
use crate::projection::ProjectionMode;

/// Camera placement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub at: Vec3,
    pub eye: Vec3,
    pub up: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            at: [0.0, 0.0, 0.0],
            eye: [0.0, 0.0, 5.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

/// Viewing volume. `y_fov` is in degrees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    pub y_fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            y_fov: 65.0,
            aspect: 16.0 / 9.0,
            near: 0.03,
            far: 1000.0,
            mode: ProjectionMode::Perspective,
        }
    }
}

/// Everything a viewer reads at startup. Missing keys take their defaults.
///
/// ```toml
/// sphere_subdivisions = 3
///
/// [camera]
/// eye = [0.0, 2.0, 6.0]
///
/// [projection]
/// y_fov = 50.0
/// mode = "orthographic"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub projection: ProjectionSettings,
    pub sphere_subdivisions: u32,
    pub skybox_half_extent: f32,
    /// Direction the light travels, in world space.
    pub light_direction: Vec3,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            projection: ProjectionSettings::default(),
            sphere_subdivisions: 4,
            skybox_half_extent: 100.0,
            light_direction: [-0.4, -0.6, -1.0],
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        let settings = Self::from_toml_str(&text)?;
        debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
            sphere_subdivisions = 2

            [camera]
            eye = [1.0, 2.0, 3.0]

            [projection]
            far = 50.0
            mode = "orthographic"
            "#,
        )
        .unwrap();
        assert_eq!(settings.sphere_subdivisions, 2);
        assert_eq!(settings.camera.eye, [1.0, 2.0, 3.0]);
        assert_eq!(settings.camera.up, [0.0, 1.0, 0.0]);
        assert_eq!(settings.projection.far, 50.0);
        assert_eq!(settings.projection.near, 0.03);
        assert_eq!(settings.projection.mode, ProjectionMode::Orthographic);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let result = Settings::from_toml_str("[camera]\neye = \"up there\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/glkit.toml"),
            Err(Error::Io(..))
        ));
    }
}
