/// Example: Load an OBJ file, summarize its parts and print one ASCII frame
///
/// Usage: cargo run --example load_obj -- path/to/file.obj
use anyhow::{Context, Result};
use glkit_core::{Camera, Material, Mesh, RenderObject, Settings, Transform, UniformValue};
use glkit_terminal::AsciiBackend;
use std::rc::Rc;

/// Pyramid with a textured base, used when no file is given
const PYRAMID: &str = "\
v -1 -1 -1
v 1 -1 -1
v 1 -1 1
v -1 -1 1
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vt 0.5 0.5
o base
f 1/1 2/2 3/3 4/4
o sides
f 4/1 3/2 5/5
f 3/2 2/3 5/5
f 2/3 1/4 5/5
f 1/4 4/1 5/5
";

fn main() -> Result<()> {
    let mesh = match std::env::args().nth(1) {
        Some(path) => Mesh::load_obj(&path, &[]).with_context(|| format!("failed to load {path}"))?,
        None => {
            eprintln!("No OBJ file provided, using a built-in pyramid...");
            Mesh::from_obj(PYRAMID, &[])?
        }
    };

    for (i, part) in mesh.parts.iter().enumerate() {
        println!(
            "part {} ({}): {} vertices, {} triangles, tangents: {}",
            i,
            part.name.as_deref().unwrap_or("unnamed"),
            part.vertex_count(),
            part.indices.len() / 3,
            part.has_tangents()
        );
    }

    let settings = Settings::default();
    let (width, height) = (60, 24);
    let mut camera = Camera::from_settings(&settings);
    camera.set_viewport(width, height);

    let mut backend = AsciiBackend::new(width as usize, height as usize);
    let object = RenderObject::new(
        &mut backend,
        Rc::new(mesh.with_material(Material::lambert().into_ref())),
    )?;
    let transform = Transform::new().with_rotation(glkit_core::RotationState::new(25.0, 30.0, 0.0));
    object.set_uniform_values(transform.uniforms(&camera)?)?;
    object.set_uniform_value("ULightDirectDir", UniformValue::Vec3(settings.light_direction))?;
    object.render(&mut backend)?;

    for row in backend.frame() {
        println!("{}", row.trim_end());
    }
    Ok(())
}
