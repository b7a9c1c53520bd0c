use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AssetError;
use crate::mesh::Mesh;

/// Content-addressed template ID computed from the template's name and mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u64);

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A named mesh that generators place copies of, or extrude along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub mesh: Mesh,
}

/// Content-addressed template registry.
///
/// Registering the same name and mesh twice yields the same ID.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<TemplateId, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template and return its ID.
    pub fn register(&mut self, name: impl Into<String>, mesh: Mesh) -> TemplateId {
        let template = Template {
            name: name.into(),
            mesh,
        };
        let id = content_hash(&template);
        tracing::debug!(%id, name = %template.name, "template registered");
        self.templates.insert(id, template);
        id
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(&id)
    }

    /// Look up a template that must exist.
    pub fn require(&self, id: TemplateId) -> Result<&Template, AssetError> {
        self.get(id).ok_or(AssetError::TemplateNotFound(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn content_hash(template: &Template) -> TemplateId {
    let mut hasher = Sha256::new();
    hasher.update(template.name.as_bytes());
    let mesh = &template.mesh;
    for v in mesh.vertices.iter().chain(&mesh.normals) {
        for c in v.to_array() {
            hasher.update(c.to_le_bytes());
        }
    }
    for uv in &mesh.uvs {
        for c in uv.to_array() {
            hasher.update(c.to_le_bytes());
        }
    }
    for i in &mesh.triangles {
        hasher.update(i.to_le_bytes());
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    TemplateId(u64::from_le_bytes(bytes))
}
