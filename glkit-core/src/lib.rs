/// GLKit Core Library - Shared math, mesh and rendering contracts
///
/// This library provides the stateless core of the viewer: row-major matrix
/// math, procedural and OBJ meshes with tangents, material uniform tables,
/// and the render object that drives a graphics backend.

pub mod convert;
pub mod error;
pub mod material;
pub mod math;
pub mod mesh;
pub mod obj;
pub mod projection;
pub mod render_object;
pub mod settings;
pub mod tangent;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use material::{Material, MaterialRef, ShaderInterface, UniformKind, UniformValue};
pub use math::Operand;
pub use mesh::{Mesh, MeshPart, Vertex};
pub use obj::parse_obj;
pub use projection::{Camera, ProjectionMode};
pub use render_object::{PartBuffers, RenderBackend, RenderObject};
pub use settings::Settings;
pub use transform::{RotationState, Transform};
