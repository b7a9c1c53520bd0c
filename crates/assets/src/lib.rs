//! Geometry assets: meshes, swept-mesh extrusion, a template registry and
//! sprite textures.

pub mod extrude;
pub mod mesh;
pub mod template;
pub mod texture;

pub use extrude::{Axis, MeshExtruder};
pub use mesh::{Aabb, Mesh, MeshBuilder, Vertex, bar_along_z, flat_quad};
pub use template::{Template, TemplateId, TemplateStore};
pub use texture::Texture;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),
    #[error("cross-section template has no geometry")]
    EmptyCrossSection,
}
