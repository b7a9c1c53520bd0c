use parkscape_assets::{Mesh, TemplateId, Texture};
use parkscape_common::{Rgba, Transform};

/// One object to be added to the host scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// A copy of a registered template.
    Instance {
        template: TemplateId,
        transform: Transform,
        label: String,
    },
    /// A generated mesh with a flat colour.
    Mesh {
        mesh: Mesh,
        transform: Transform,
        colour: Rgba,
        label: String,
    },
    /// A quad carrying a decoded sprite texture.
    TexturedQuad {
        mesh: Mesh,
        texture: Texture,
        transform: Transform,
    },
}

impl Placement {
    pub fn transform(&self) -> &Transform {
        match self {
            Placement::Instance { transform, .. }
            | Placement::Mesh { transform, .. }
            | Placement::TexturedQuad { transform, .. } => transform,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Placement::Instance { label, .. } | Placement::Mesh { label, .. } => label,
            Placement::TexturedQuad { .. } => "textured quad",
        }
    }
}

/// Receives placements as generation produces them.
pub trait PlacementSink {
    fn place(&mut self, placement: Placement);
}

impl<S: PlacementSink + ?Sized> PlacementSink for &mut S {
    fn place(&mut self, placement: Placement) {
        (**self).place(placement);
    }
}

impl PlacementSink for Vec<Placement> {
    fn place(&mut self, placement: Placement) {
        self.push(placement);
    }
}
