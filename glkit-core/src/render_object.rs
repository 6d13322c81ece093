//! Per-part GPU buffers for a mesh, and drawing through a rendering backend.
//!
//! The backend owns the actual graphics API. [`RenderObject`] only decides
//! which buffers exist, which material each part draws with, and in what
//! order calls are made.

use std::rc::Rc;

use tracing::{trace, warn};

use crate::error::Result;
use crate::material::{
    Material, UniformValue, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT, ATTR_TEXCOORD,
};
use crate::mesh::{Mesh, MeshPart};

/// The graphics calls a [`RenderObject`] needs.
pub trait RenderBackend {
    /// Handle to a buffer living on the backend.
    type Buffer;

    fn create_vertex_buffer(&mut self, data: &[f32], components: usize) -> Result<Self::Buffer>;

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<Self::Buffer>;

    /// Activate the material's program and upload its staged uniforms.
    fn use_material(&mut self, material: &Material) -> Result<()>;

    fn bind_attribute(&mut self, name: &str, buffer: &Self::Buffer, components: usize) -> Result<()>;

    fn draw_elements(&mut self, indices: &Self::Buffer, count: usize) -> Result<()>;

    fn draw_arrays(&mut self, vertex_count: usize) -> Result<()>;
}

/// Buffers created for one mesh part.
pub struct PartBuffers<B: RenderBackend> {
    pub position: B::Buffer,
    pub texcoord: Option<B::Buffer>,
    pub normal: Option<B::Buffer>,
    pub tangent: Option<B::Buffer>,
    /// Absent when the mesh draws with arrays.
    pub index: Option<B::Buffer>,
    pub index_count: usize,
    pub vertex_count: usize,
}

impl<B: RenderBackend> PartBuffers<B> {
    fn create(backend: &mut B, part: &MeshPart, indexed: bool) -> Result<Self> {
        let mut optional = |name: &str| -> Result<Option<B::Buffer>> {
            part.attribute(name)
                .map(|(data, components)| backend.create_vertex_buffer(data, components))
                .transpose()
        };
        let texcoord = optional(ATTR_TEXCOORD)?;
        let normal = optional(ATTR_NORMAL)?;
        let tangent = optional(ATTR_TANGENT)?;

        let position = backend.create_vertex_buffer(&part.positions, 3)?;
        let index = if indexed {
            Some(backend.create_index_buffer(&part.indices)?)
        } else {
            None
        };

        Ok(Self {
            position,
            texcoord,
            normal,
            tangent,
            index,
            index_count: part.indices.len(),
            vertex_count: part.vertex_count(),
        })
    }

    /// Buffer and component count for a shader attribute name.
    pub fn attribute(&self, name: &str) -> Option<(&B::Buffer, usize)> {
        match name {
            ATTR_POSITION => Some((&self.position, 3)),
            ATTR_TEXCOORD => self.texcoord.as_ref().map(|b| (b, 2)),
            ATTR_NORMAL => self.normal.as_ref().map(|b| (b, 3)),
            ATTR_TANGENT => self.tangent.as_ref().map(|b| (b, 4)),
            _ => None,
        }
    }
}

/// A mesh uploaded to a backend, ready to draw.
pub struct RenderObject<B: RenderBackend> {
    mesh: Rc<Mesh>,
    buffers: Vec<PartBuffers<B>>,
}

impl<B: RenderBackend> RenderObject<B> {
    pub fn new(backend: &mut B, mesh: Rc<Mesh>) -> Result<Self> {
        let indexed = !mesh.use_draw_arrays;
        let buffers = mesh
            .parts
            .iter()
            .map(|part| PartBuffers::create(backend, part, indexed))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { mesh, buffers })
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn buffers(&self) -> &[PartBuffers<B>] {
        &self.buffers
    }

    /// Stage `value` on every part whose material declares `name`.
    ///
    /// Returns the number of parts that accepted it. A value of the wrong
    /// kind for a declared uniform is an error, and then no part is staged.
    pub fn set_uniform_value(&self, name: &str, value: UniformValue) -> Result<usize> {
        let materials = || self.mesh.parts.iter().filter_map(|p| p.material.as_ref());
        for material in materials() {
            material.borrow().shader.accepts(name, value)?;
        }

        let mut accepted = 0;
        for material in materials() {
            if material.borrow_mut().shader.stage(name, value)? {
                accepted += 1;
            }
        }
        if accepted == 0 {
            trace!("No part uses uniform '{}'", name);
        }
        Ok(accepted)
    }

    /// Stage a batch of uniforms, as produced by [`crate::Transform::uniforms`].
    pub fn set_uniform_values<'a>(
        &self,
        values: impl IntoIterator<Item = (&'a str, UniformValue)>,
    ) -> Result<()> {
        for (name, value) in values {
            self.set_uniform_value(name, value)?;
        }
        Ok(())
    }

    /// Draw every part that has a material. Parts without one are skipped.
    pub fn render(&self, backend: &mut B) -> Result<()> {
        for (index, (part, buffers)) in self.mesh.parts.iter().zip(&self.buffers).enumerate() {
            let Some(material) = part.material.as_ref() else {
                continue;
            };
            let material = material.borrow();

            backend.use_material(&material)?;
            for name in material.shader.attributes.keys() {
                match buffers.attribute(name) {
                    Some((buffer, components)) => backend.bind_attribute(name, buffer, components)?,
                    None => warn!(
                        "Material '{}' reads {} but mesh part {} has no such data",
                        material.name, name, index
                    ),
                }
            }

            match &buffers.index {
                Some(indices) => backend.draw_elements(indices, buffers.index_count)?,
                None => backend.draw_arrays(buffers.vertex_count)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MaterialRef, ShaderInterface, UniformKind};
    use crate::math::IDENTITY4;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        UseMaterial(String, Vec<String>),
        Bind(String, usize),
        DrawElements(usize, usize),
        DrawArrays(usize),
    }

    #[derive(Default)]
    struct RecordingBackend {
        buffers: Vec<usize>,
        calls: Vec<Call>,
    }

    impl RenderBackend for RecordingBackend {
        type Buffer = usize;

        fn create_vertex_buffer(&mut self, data: &[f32], _components: usize) -> Result<usize> {
            self.buffers.push(data.len());
            Ok(self.buffers.len() - 1)
        }

        fn create_index_buffer(&mut self, indices: &[u32]) -> Result<usize> {
            self.buffers.push(indices.len());
            Ok(self.buffers.len() - 1)
        }

        fn use_material(&mut self, material: &Material) -> Result<()> {
            let staged = material
                .shader
                .staged_values()
                .map(|(name, _)| name.to_string())
                .collect();
            self.calls
                .push(Call::UseMaterial(material.name.clone(), staged));
            Ok(())
        }

        fn bind_attribute(&mut self, name: &str, _buffer: &usize, components: usize) -> Result<()> {
            self.calls.push(Call::Bind(name.to_string(), components));
            Ok(())
        }

        fn draw_elements(&mut self, indices: &usize, count: usize) -> Result<()> {
            self.calls.push(Call::DrawElements(*indices, count));
            Ok(())
        }

        fn draw_arrays(&mut self, vertex_count: usize) -> Result<()> {
            self.calls.push(Call::DrawArrays(vertex_count));
            Ok(())
        }
    }

    fn two_part_mesh(first: Option<MaterialRef>, second: Option<MaterialRef>) -> Mesh {
        let mut a = Mesh::create_cube().parts.remove(0);
        a.material = first;
        let mut b = Mesh::create_sphere(0, None).parts.remove(0);
        b.material = second;
        Mesh::from_parts(vec![a, b])
    }

    fn draw_count(calls: &[Call]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, Call::DrawElements(..) | Call::DrawArrays(_)))
            .count()
    }

    #[test]
    fn test_buffers_follow_part_attributes() {
        let mut backend = RecordingBackend::default();
        let mesh = Rc::new(two_part_mesh(None, None));
        let object = RenderObject::new(&mut backend, mesh).unwrap();

        let cube = &object.buffers()[0];
        assert!(cube.texcoord.is_some() && cube.tangent.is_some());
        assert_eq!(cube.index_count, 36);
        let sphere = &object.buffers()[1];
        assert!(sphere.texcoord.is_none() && sphere.normal.is_some());
        assert_eq!(backend.buffers[sphere.position], 12 * 3);
    }

    #[test]
    fn test_render_skips_parts_without_material() {
        let mut backend = RecordingBackend::default();
        let mesh = Rc::new(two_part_mesh(None, Some(Material::lambert().into_ref())));
        let object = RenderObject::new(&mut backend, mesh).unwrap();

        object.render(&mut backend).unwrap();
        assert_eq!(draw_count(&backend.calls), 1);
        assert_eq!(
            backend.calls.last(),
            Some(&Call::DrawElements(object.buffers()[1].index.unwrap(), 12))
        );

        let mut backend = RecordingBackend::default();
        let object = RenderObject::new(&mut backend, Rc::new(two_part_mesh(None, None))).unwrap();
        object.render(&mut backend).unwrap();
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_render_binds_material_attributes() {
        let mut backend = RecordingBackend::default();
        let mesh = Rc::new(Mesh::create_cube().with_material(Material::pbr().into_ref()));
        let object = RenderObject::new(&mut backend, mesh).unwrap();
        object.render(&mut backend).unwrap();

        let binds: Vec<_> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Bind(name, components) => Some((name.as_str(), *components)),
                _ => None,
            })
            .collect();
        assert_eq!(binds.len(), 4);
        assert!(binds.contains(&(ATTR_TANGENT, 4)));
        assert!(binds.contains(&(ATTR_TEXCOORD, 2)));
    }

    #[test]
    fn test_missing_attribute_still_draws() {
        let mut backend = RecordingBackend::default();
        // The cube map has no normals but lambert reads them.
        let mesh = Rc::new(Mesh::create_cube_map(10.0).with_material(Material::lambert().into_ref()));
        let object = RenderObject::new(&mut backend, mesh).unwrap();
        object.render(&mut backend).unwrap();
        assert_eq!(draw_count(&backend.calls), 1);
        assert!(!backend
            .calls
            .contains(&Call::Bind(ATTR_NORMAL.to_string(), 3)));
    }

    #[test]
    fn test_draw_arrays_mode() {
        let mut backend = RecordingBackend::default();
        let mut mesh = Mesh::create_sphere(1, Some(Material::lambert().into_ref()));
        mesh.use_draw_arrays = true;
        let object = RenderObject::new(&mut backend, Rc::new(mesh)).unwrap();
        assert!(object.buffers()[0].index.is_none());

        object.render(&mut backend).unwrap();
        assert_eq!(backend.calls.last(), Some(&Call::DrawArrays(48)));
    }

    #[test]
    fn test_mismatched_uniform_stages_nothing() {
        let mut backend = RecordingBackend::default();
        let tint = |kind| {
            let shader = ShaderInterface::new().with_uniform("UTint", kind);
            Material::new("tinted", shader).into_ref()
        };
        let color = tint(UniformKind::Vec3);
        let mesh = Rc::new(two_part_mesh(
            Some(color.clone()),
            Some(tint(UniformKind::Float)),
        ));
        let object = RenderObject::new(&mut backend, mesh).unwrap();

        assert!(object
            .set_uniform_value("UTint", UniformValue::Vec3([1.0, 0.0, 0.0]))
            .is_err());
        assert_eq!(color.borrow().shader.staged("UTint"), None);
    }

    #[test]
    fn test_set_uniform_value_broadcasts() {
        let mut backend = RecordingBackend::default();
        let shared = Material::lambert().into_ref();
        let mesh = Rc::new(two_part_mesh(
            Some(shared.clone()),
            Some(Material::skybox().into_ref()),
        ));
        let object = RenderObject::new(&mut backend, mesh).unwrap();

        assert_eq!(
            object
                .set_uniform_value("UMatMVP", UniformValue::Mat4(IDENTITY4))
                .unwrap(),
            2
        );
        assert_eq!(
            object
                .set_uniform_value("ULightDirectDir", UniformValue::Vec3([0.0, 0.0, 1.0]))
                .unwrap(),
            1
        );
        assert_eq!(
            object
                .set_uniform_value("UTextureNormal", UniformValue::Int(0))
                .unwrap(),
            0
        );
        assert!(object
            .set_uniform_value("UMatMVP", UniformValue::Float(1.0))
            .is_err());

        assert!(shared.borrow().shader.staged("ULightDirectDir").is_some());
        object.render(&mut backend).unwrap();
        assert_eq!(
            backend.calls[0],
            Call::UseMaterial(
                "lambert".to_string(),
                vec!["ULightDirectDir".to_string(), "UMatMVP".to_string()]
            )
        );
    }
}
