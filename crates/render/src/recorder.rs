use std::collections::BTreeMap;
use std::fmt::Write as _;

use parkscape_assets::Aabb;

use crate::placement::{Placement, PlacementSink};

/// A placement sink that keeps everything it receives.
///
/// Used by tests and the CLI in place of a real scene.
#[derive(Debug, Default)]
pub struct SceneRecorder {
    placements: Vec<Placement>,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Instance { .. }))
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Mesh { .. }))
    }

    pub fn textured_quads(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::TexturedQuad { .. }))
    }

    /// Bounds of every placement origin.
    pub fn bounds(&self) -> Aabb {
        let origins: Vec<_> = self
            .placements
            .iter()
            .map(|p| p.transform().position)
            .collect();
        Aabb::from_points(&origins)
    }

    pub fn clear(&mut self) {
        self.placements.clear();
    }

    /// Human-readable summary of the recorded scene.
    pub fn describe(&self) -> String {
        let mut by_label: BTreeMap<&str, usize> = BTreeMap::new();
        let mut vertices = 0;
        for placement in &self.placements {
            *by_label.entry(placement.label()).or_default() += 1;
            if let Placement::Mesh { mesh, .. } | Placement::TexturedQuad { mesh, .. } = placement {
                vertices += mesh.vertex_count();
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "=== Scene ({} placements) ===", self.placements.len());
        let _ = writeln!(
            out,
            "Instances: {}  Meshes: {}  Textured quads: {}  Mesh vertices: {}",
            self.instances().count(),
            self.meshes().count(),
            self.textured_quads().count(),
            vertices
        );
        if !self.placements.is_empty() {
            let b = self.bounds();
            let _ = writeln!(
                out,
                "Bounds: ({:.2}, {:.2}, {:.2}) .. ({:.2}, {:.2}, {:.2})",
                b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
            );
        }
        for (label, count) in by_label {
            let _ = writeln!(out, "  {label}: {count}");
        }
        out
    }
}

impl PlacementSink for SceneRecorder {
    fn place(&mut self, placement: Placement) {
        tracing::trace!(label = placement.label(), "placement recorded");
        self.placements.push(placement);
    }
}
