use std::collections::BTreeMap;

use parkscape_assets::{TemplateStore, bar_along_z, flat_quad};
use parkscape_kernel::ContentKind;
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::generators::{
    Generator, PathSurfaceGenerator, PlacementGenerator, SubpositionGenerator, TrackMeshGenerator,
};
use crate::surface::SurfaceGenerator;

/// How track pieces are turned into placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStyle {
    /// One extruded mesh per piece.
    #[default]
    Mesh,
    /// One marker instance per waypoint, for inspecting routes.
    Subpositions,
}

/// Maps content kinds to their generator. Iteration follows kind order.
#[derive(Debug, Default)]
pub struct DispatchTable {
    generators: BTreeMap<ContentKind, Generator>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generators for every kind the pipeline knows how to place, registering
    /// their templates in `store`.
    pub fn standard(store: &mut TemplateStore, tracks: TrackStyle) -> Result<Self, GenerateError> {
        let scenery = store.register("scenery", flat_quad(0.25, 0.0));
        let wall = store.register("wall", bar_along_z(0.05, 0.25, 1.0));
        let entrance = store.register("entrance", flat_quad(0.5, 0.0));
        let banner = store.register("banner", flat_quad(0.1, 0.0));
        let marker = store.register("subposition marker", flat_quad(0.02, 0.0));
        let rail = store.register("track rail", bar_along_z(0.15, 0.03, 1.0));

        let mut table = Self::new();
        table.register(ContentKind::Surface, Generator::Surface(SurfaceGenerator::default()));
        table.register(ContentKind::Path, Generator::PathSurface(PathSurfaceGenerator::new()));
        let track = match tracks {
            TrackStyle::Mesh => Generator::TrackMesh(TrackMeshGenerator::new(store, rail)?),
            TrackStyle::Subpositions => {
                Generator::Subpositions(SubpositionGenerator::new(store, marker)?)
            }
        };
        table.register(ContentKind::Track, track);
        table.register(
            ContentKind::SmallScenery,
            Generator::Placement(PlacementGenerator::new(store, scenery, "Creating small scenery...")?),
        );
        table.register(
            ContentKind::LargeScenery,
            Generator::Placement(PlacementGenerator::new(store, scenery, "Creating large scenery...")?),
        );
        table.register(
            ContentKind::Wall,
            Generator::Placement(PlacementGenerator::new(store, wall, "Creating walls...")?),
        );
        table.register(
            ContentKind::Entrance,
            Generator::Placement(PlacementGenerator::new(store, entrance, "Creating entrances...")?),
        );
        table.register(
            ContentKind::Banner,
            Generator::Placement(PlacementGenerator::new(store, banner, "Creating banners...")?),
        );
        Ok(table)
    }

    /// Register a generator, returning the one it replaces.
    pub fn register(&mut self, kind: ContentKind, generator: Generator) -> Option<Generator> {
        self.generators.insert(kind, generator)
    }

    pub fn get(&self, kind: ContentKind) -> Option<&Generator> {
        self.generators.get(&kind)
    }

    pub fn get_mut(&mut self, kind: ContentKind) -> Option<&mut Generator> {
        self.generators.get_mut(&kind)
    }

    /// Registered kinds in ascending order.
    pub fn kinds(&self) -> Vec<ContentKind> {
        self.generators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_placeable_kinds() {
        let mut store = TemplateStore::new();
        let table = DispatchTable::standard(&mut store, TrackStyle::Mesh).unwrap();
        assert_eq!(
            table.kinds(),
            vec![
                ContentKind::Surface,
                ContentKind::Path,
                ContentKind::Track,
                ContentKind::SmallScenery,
                ContentKind::Entrance,
                ContentKind::Wall,
                ContentKind::LargeScenery,
                ContentKind::Banner,
            ]
        );
        assert!(matches!(table.get(ContentKind::Surface), Some(Generator::Surface(_))));
        assert_eq!(&*table.get(ContentKind::Surface).unwrap().label(), "Generating chunks...");
        assert!(table.get(ContentKind::Unknown(40)).is_none());
        assert!(matches!(table.get(ContentKind::Track), Some(Generator::TrackMesh(_))));
    }

    #[test]
    fn subposition_style_swaps_the_track_generator() {
        let mut store = TemplateStore::new();
        let table = DispatchTable::standard(&mut store, TrackStyle::Subpositions).unwrap();
        assert!(matches!(table.get(ContentKind::Track), Some(Generator::Subpositions(_))));
    }

    #[test]
    fn register_replaces() {
        let mut table = DispatchTable::new();
        assert!(table.is_empty());
        assert!(table
            .register(ContentKind::Path, Generator::PathSurface(PathSurfaceGenerator::new()))
            .is_none());
        assert!(table
            .register(ContentKind::Path, Generator::PathSurface(PathSurfaceGenerator::new()))
            .is_some());
        assert_eq!(table.len(), 1);
        assert!(table.get_mut(ContentKind::Path).is_some());
    }

    #[test]
    fn track_style_reads_from_json() {
        let style: TrackStyle = serde_json::from_str(r#""subpositions""#).unwrap();
        assert_eq!(style, TrackStyle::Subpositions);
    }
}
