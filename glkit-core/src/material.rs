//! Material and shader-interface data contract.
//!
//! A [`Material`] does not own GPU objects. It names the vertex attributes its
//! shader reads and the uniforms it declares, and holds uniform values staged
//! for the next draw. The GPU binding layer reads both tables when it draws a
//! mesh part that uses the material.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::math::{Mat4, Vec3, Vec4};

pub const ATTR_POSITION: &str = "AVertexPosition";
pub const ATTR_TEXCOORD: &str = "AVertexTexCoord";
pub const ATTR_NORMAL: &str = "AVertexNormal";
pub const ATTR_TANGENT: &str = "AVertexTangent";

/// Shared handle to a material. Mesh parts referencing the same material see
/// the same staged uniforms.
pub type MaterialRef = Rc<RefCell<Material>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
    /// Texture unit index for a 2D sampler.
    Sampler2D,
    /// Texture unit index for a cube sampler.
    SamplerCube,
}

/// A uniform value. Matrices are row-major; the binding layer flattens them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn fits(&self, kind: UniformKind) -> bool {
        matches!(
            (self, kind),
            (Self::Int(_), UniformKind::Int | UniformKind::Sampler2D | UniformKind::SamplerCube)
                | (Self::Float(_), UniformKind::Float)
                | (Self::Vec3(_), UniformKind::Vec3)
                | (Self::Vec4(_), UniformKind::Vec4)
                | (Self::Mat4(_), UniformKind::Mat4)
        )
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat4(_) => "mat4",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub kind: UniformKind,
    /// Value waiting to be uploaded. `None` until something stages one.
    pub value: Option<UniformValue>,
}

/// Attribute and uniform tables of one shader program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderInterface {
    /// Attribute name to component count.
    pub attributes: BTreeMap<String, usize>,
    pub uniforms: BTreeMap<String, Uniform>,
}

impl ShaderInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, components: usize) -> Self {
        self.attributes.insert(name.to_string(), components);
        self
    }

    pub fn with_uniform(mut self, name: &str, kind: UniformKind) -> Self {
        self.uniforms.insert(name.to_string(), Uniform { kind, value: None });
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Whether `stage` would take `value`, without staging it.
    pub fn accepts(&self, name: &str, value: UniformValue) -> Result<bool> {
        let Some(uniform) = self.uniforms.get(name) else {
            return Ok(false);
        };
        if !value.fits(uniform.kind) {
            return Err(Error::ShapeMismatch {
                op: "set uniform",
                left: format!("{name} ({:?})", uniform.kind),
                right: value.shape().to_string(),
            });
        }
        Ok(true)
    }

    /// Stage `value` for upload. Returns `Ok(false)` when the shader declares
    /// no uniform called `name`.
    pub fn stage(&mut self, name: &str, value: UniformValue) -> Result<bool> {
        if !self.accepts(name, value)? {
            return Ok(false);
        }
        if let Some(uniform) = self.uniforms.get_mut(name) {
            uniform.value = Some(value);
        }
        Ok(true)
    }

    pub fn staged(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).and_then(|u| u.value)
    }

    /// Staged uniforms in name order, skipping the ones never set.
    pub fn staged_values(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        self.uniforms
            .iter()
            .filter_map(|(name, u)| u.value.map(|v| (name.as_str(), v)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub shader: ShaderInterface,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: ShaderInterface) -> Self {
        Self {
            name: name.into(),
            shader,
        }
    }

    pub fn into_ref(self) -> MaterialRef {
        Rc::new(RefCell::new(self))
    }

    /// Metallic/roughness material with normal mapping and image-based lighting.
    pub fn pbr() -> Self {
        let shader = ShaderInterface::new()
            .with_attribute(ATTR_POSITION, 3)
            .with_attribute(ATTR_TEXCOORD, 2)
            .with_attribute(ATTR_NORMAL, 3)
            .with_attribute(ATTR_TANGENT, 4)
            .with_uniform("UCamPosition", UniformKind::Vec4)
            .with_uniform("UCamPosSky", UniformKind::Vec4)
            .with_uniform("ULightPosition", UniformKind::Vec4)
            .with_uniform("ULightDirectDir", UniformKind::Vec3)
            .with_uniform("UMatModel", UniformKind::Mat4)
            .with_uniform("UMatView", UniformKind::Mat4)
            .with_uniform("UMatMV", UniformKind::Mat4)
            .with_uniform("UMatProj", UniformKind::Mat4)
            .with_uniform("UMatMVP", UniformKind::Mat4)
            .with_uniform("UMatNormal", UniformKind::Mat4)
            .with_uniform("UMatViewInv", UniformKind::Mat4)
            .with_uniform("UMatCameraRot", UniformKind::Mat4)
            .with_uniform("UEnvMipLevels", UniformKind::Float)
            .with_uniform("UEnvMipLevelsMin", UniformKind::Float)
            .with_uniform("UTexCubeEnv", UniformKind::SamplerCube)
            .with_uniform("UTexCubeIrradiance", UniformKind::SamplerCube)
            .with_uniform("UTexCubeSpecIBL", UniformKind::SamplerCube)
            .with_uniform("UTextureEnvBRDF", UniformKind::Sampler2D)
            .with_uniform("UTextureBaseColor", UniformKind::Sampler2D)
            .with_uniform("UTextureNormal", UniformKind::Sampler2D)
            .with_uniform("UTextureMetallic", UniformKind::Sampler2D)
            .with_uniform("UTextureRoughness", UniformKind::Sampler2D);
        Self::new("pbr", shader)
    }

    /// Environment cube drawn around the camera. Reads positions only.
    pub fn skybox() -> Self {
        let shader = ShaderInterface::new()
            .with_attribute(ATTR_POSITION, 3)
            .with_uniform("UMatMVP", UniformKind::Mat4)
            .with_uniform("UTexCubeEnv", UniformKind::SamplerCube);
        Self::new("skybox", shader)
    }

    /// Flat lambert shading from vertex normals.
    pub fn lambert() -> Self {
        let shader = ShaderInterface::new()
            .with_attribute(ATTR_POSITION, 3)
            .with_attribute(ATTR_NORMAL, 3)
            .with_uniform("UMatMVP", UniformKind::Mat4)
            .with_uniform("UMatNormal", UniformKind::Mat4)
            .with_uniform("ULightDirectDir", UniformKind::Vec3);
        Self::new("lambert", shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::IDENTITY4;

    #[test]
    fn test_stage_declared_uniform() {
        let mut material = Material::skybox();
        assert!(material
            .shader
            .stage("UMatMVP", UniformValue::Mat4(IDENTITY4))
            .unwrap());
        assert_eq!(
            material.shader.staged("UMatMVP"),
            Some(UniformValue::Mat4(IDENTITY4))
        );
    }

    #[test]
    fn test_stage_unknown_uniform_is_ignored() {
        let mut material = Material::skybox();
        assert!(!material
            .shader
            .stage("URoughness", UniformValue::Float(0.5))
            .unwrap());
        assert_eq!(material.shader.staged_values().count(), 0);
    }

    #[test]
    fn test_stage_wrong_kind_fails() {
        let mut material = Material::pbr();
        let result = material.shader.stage("UMatMVP", UniformValue::Float(1.0));
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
        assert_eq!(material.shader.staged("UMatMVP"), None);

        // Samplers take texture unit numbers.
        assert!(material
            .shader
            .stage("UTextureNormal", UniformValue::Int(5))
            .unwrap());
    }

    #[test]
    fn test_pbr_reads_tangents() {
        let pbr = Material::pbr();
        assert_eq!(pbr.shader.attributes.get(ATTR_TANGENT), Some(&4));
        assert!(!Material::skybox().shader.has_attribute(ATTR_NORMAL));
    }
}
