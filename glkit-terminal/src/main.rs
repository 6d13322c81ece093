/// GLKit Terminal Viewer
///
/// Renders a procedural mesh or an OBJ file with the ASCII rasterizer.
/// Usage: glkit-terminal [cube|sphere|skybox|<file.obj>] [--settings <file.toml>]
///
/// Controls:
///   - WASD / Arrow Keys: Rotate the mesh
///   - E/R: Roll rotation
///   - Space: Toggle spinning
///   - Q/ESC: Quit
use anyhow::{bail, Context, Result};
use glkit_core::{Material, Mesh, Settings};
use glkit_terminal::TerminalApp;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut source = String::from("cube");
    let mut settings_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                settings_path = Some(args.next().context("--settings needs a file path")?)
            }
            _ if arg.starts_with("--") => bail!("unknown option '{arg}'"),
            _ => source = arg,
        }
    }

    let settings = match &settings_path {
        Some(path) => Settings::load(path).with_context(|| format!("failed to load {path}"))?,
        None => Settings::default(),
    };

    let material = Material::lambert().into_ref();
    let mesh = match source.as_str() {
        "cube" => Mesh::create_cube().with_material(material),
        "sphere" => Mesh::create_sphere(settings.sphere_subdivisions, Some(material)),
        "skybox" => Mesh::create_cube_map(settings.skybox_half_extent)
            .with_material(Material::skybox().into_ref()),
        path => Mesh::load_obj(path, &[])
            .with_context(|| format!("failed to load {path}"))?
            .with_material(material),
    };
    info!(
        "Loaded {}: {} vertices, {} triangles",
        source,
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    let mut app = TerminalApp::new(mesh, &settings)?;
    app.run()?;

    println!("Thank you for using GLKit Terminal Viewer!");
    Ok(())
}
