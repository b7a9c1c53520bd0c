//! Per-cell generators, one variant per kind of content.
//!
//! Every generator turns one element of one tile into zero or more
//! [`Placement`]s and reports how many it emitted. Templates are checked
//! against the [`TemplateStore`] when a generator is built, so generation
//! itself never meets a missing template.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Quat, Vec3};
use parkscape_assets::{Mesh, MeshExtruder, TemplateId, TemplateStore, Texture, flat_quad};
use parkscape_common::{
    Pose, TILE_SIZE, Transform, coords_z_to_world, quarter_turn, rotation_from_packed,
    tile_to_world, waypoint_local,
};
use parkscape_kernel::{CellContent, SimulationProvider, TileCoord, TrackSegmentInfo};
use parkscape_render::{Placement, PlacementSink};

use crate::cache::SubpositionCache;
use crate::error::GenerateError;
use crate::snapshot::{MapSnapshot, SnapshotElement};
use crate::surface::{SURFACE_LABEL, SurfaceGenerator};

const TRACK_LABEL: &str = "Creating tracks...";
const PATH_LABEL: &str = "Creating paths...";

/// Height of a path surface above its element, in render units.
const PATH_SURFACE_HEIGHT: f32 = 0.01;

/// Distance from the tile centre to the centre of a quadrant.
const QUADRANT_OFFSET: f32 = TILE_SIZE / 4.0;

/// Everything a generator may touch while handling one cell.
pub struct CellContext<'c> {
    pub provider: &'c dyn SimulationProvider,
    pub cache: &'c mut SubpositionCache,
    pub sink: &'c mut dyn PlacementSink,
    pub snapshot: &'c MapSnapshot,
}

/// The closed set of generators.
#[derive(Debug)]
pub enum Generator {
    Surface(SurfaceGenerator),
    Placement(PlacementGenerator),
    Subpositions(SubpositionGenerator),
    TrackMesh(TrackMeshGenerator),
    PathSurface(PathSurfaceGenerator),
}

impl Generator {
    /// Progress label of this generator's walk.
    pub fn label(&self) -> Arc<str> {
        match self {
            Generator::Surface(_) => Arc::from(SURFACE_LABEL),
            Generator::Placement(g) => Arc::clone(&g.label),
            Generator::Subpositions(_) | Generator::TrackMesh(_) => Arc::from(TRACK_LABEL),
            Generator::PathSurface(_) => Arc::from(PATH_LABEL),
        }
    }

    /// Handle one element of one tile. Returns the number of placements emitted.
    pub fn generate(
        &mut self,
        ctx: &mut CellContext<'_>,
        cell: TileCoord,
        element: &SnapshotElement,
    ) -> Result<usize, GenerateError> {
        match self {
            Generator::Surface(g) => g.generate(ctx, cell, element),
            Generator::Placement(g) => Ok(g.generate(ctx, cell, element)),
            Generator::Subpositions(g) => g.generate(ctx, cell, element),
            Generator::TrackMesh(g) => g.generate(ctx, cell, element),
            Generator::PathSurface(g) => g.generate(ctx, cell, element),
        }
    }

    /// Emit whatever was gathered over a whole walk. Returns the number of placements.
    pub fn finish(&mut self, sink: &mut dyn PlacementSink) -> usize {
        match self {
            Generator::Surface(g) => g.finish(sink),
            _ => 0,
        }
    }

    /// Forget state left by a walk that never finished.
    pub fn reset(&mut self) {
        if let Generator::Surface(g) = self {
            g.reset();
        }
    }
}

/// Places one template instance per element, centred on the tile or, for
/// quadrant scenery, on its quadrant.
#[derive(Debug, Clone)]
pub struct PlacementGenerator {
    template: TemplateId,
    name: String,
    label: Arc<str>,
}

impl PlacementGenerator {
    pub fn new(
        store: &TemplateStore,
        template: TemplateId,
        label: impl Into<Arc<str>>,
    ) -> Result<Self, GenerateError> {
        let name = store.require(template)?.name.clone();
        Ok(Self {
            template,
            name,
            label: label.into(),
        })
    }

    fn generate(&self, ctx: &mut CellContext<'_>, cell: TileCoord, element: &SnapshotElement) -> usize {
        let content = element.content;
        let mut position = tile_to_world(cell.x, cell.y, content.base_height as f32);
        if let Some(scenery) = element.scenery.filter(|s| !s.full_tile) {
            position += quadrant_offset(scenery.quadrant);
        }
        let transform = Transform {
            position,
            // Instances are authored facing one quarter turn off the element rotation.
            rotation: quarter_turn(content.rotation.wrapping_add(1)),
            scale: Vec3::ONE,
        };
        ctx.sink.place(Placement::Instance {
            template: self.template,
            transform,
            label: format!(
                "{} [{}, {}, {}]",
                self.name, cell.x, cell.y, content.base_height
            ),
        });
        1
    }
}

/// Offset from a tile centre to the centre of a quadrant. Grid y runs along render z.
fn quadrant_offset(quadrant: u8) -> Vec3 {
    let d = QUADRANT_OFFSET;
    let (x, z) = match quadrant % 4 {
        0 => (-d, -d),
        1 => (-d, d),
        2 => (d, d),
        _ => (d, -d),
    };
    Vec3::new(x, 0.0, z)
}

/// Places a marker instance at every waypoint of a track piece's route.
#[derive(Debug, Clone)]
pub struct SubpositionGenerator {
    marker: TemplateId,
}

impl SubpositionGenerator {
    pub fn new(store: &TemplateStore, marker: TemplateId) -> Result<Self, GenerateError> {
        store.require(marker)?;
        Ok(Self { marker })
    }

    fn generate(
        &self,
        ctx: &mut CellContext<'_>,
        cell: TileCoord,
        element: &SnapshotElement,
    ) -> Result<usize, GenerateError> {
        let Some(track) = anchor_track(ctx.snapshot, cell, element)? else {
            return Ok(0);
        };
        let route = ctx.cache.route(ctx.provider, track.track_type);
        let anchor = anchor_pose(cell, element.content, track.height_offset as f32);

        for (i, w) in route.waypoints.iter().enumerate() {
            let local = Pose::new(
                waypoint_local(w.x, w.y, w.z),
                rotation_from_packed(w.direction, w.bank, w.pitch),
            );
            ctx.sink.place(Placement::Instance {
                template: self.marker,
                transform: Transform::from_pose(anchor.then(local)),
                label: format!(
                    "#{i} = ({}, {}, {}) dir: {}, bank: {}, pitch: {}",
                    w.x, w.y, w.z, w.direction, w.bank, w.pitch
                ),
            });
        }
        Ok(route.len())
    }
}

/// Extrudes a cross-section along the smoothed route of each track piece.
#[derive(Debug, Clone)]
pub struct TrackMeshGenerator {
    extruder: MeshExtruder,
}

impl TrackMeshGenerator {
    pub fn new(store: &TemplateStore, cross_section: TemplateId) -> Result<Self, GenerateError> {
        let mesh = store.require(cross_section)?.mesh.clone();
        Ok(Self {
            extruder: MeshExtruder::new(mesh)?,
        })
    }

    fn generate(
        &mut self,
        ctx: &mut CellContext<'_>,
        cell: TileCoord,
        element: &SnapshotElement,
    ) -> Result<usize, GenerateError> {
        let Some(track) = anchor_track(ctx.snapshot, cell, element)? else {
            return Ok(0);
        };
        let piece = ctx.cache.piece(ctx.provider, track.track_type);

        let flip = track.inverted && (track.normal_to_inverted || track.inverted_to_normal);
        let roll = Quat::from_rotation_z(PI);
        let poses: Vec<Pose> = piece
            .key_poses()
            .map(|pose| {
                if flip {
                    Pose::new(pose.position, pose.rotation * roll)
                } else {
                    pose
                }
            })
            .collect();

        self.extruder.clear();
        for pair in poses.windows(2) {
            self.extruder.add_segment(pair[0], pair[1], 0.0, 1.0, 0);
        }
        let mesh = self.extruder.to_mesh();
        if mesh.is_empty() {
            tracing::debug!(%cell, track_type = %track.track_type, "track route too short to extrude");
            return Ok(0);
        }

        let mut height_offset = track.height_offset as f32;
        if track.inverted {
            height_offset *= 2.0;
        }
        let anchor = anchor_pose(cell, element.content, height_offset);
        ctx.sink.place(Placement::Mesh {
            mesh,
            transform: Transform::from_pose(anchor),
            colour: ctx.provider.palette_entry(track.main_colour),
            label: format!(
                "Track [{}, {}, {}] type: {}, rot: {}, inv: {}",
                cell.x,
                cell.y,
                element.content.base_height,
                track.track_type,
                element.content.rotation,
                track.inverted
            ),
        });
        Ok(1)
    }
}

/// Lays a textured quad over every path tile.
#[derive(Debug, Clone)]
pub struct PathSurfaceGenerator {
    quad: Mesh,
}

impl Default for PathSurfaceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSurfaceGenerator {
    pub fn new() -> Self {
        Self {
            quad: flat_quad(TILE_SIZE / 2.0, PATH_SURFACE_HEIGHT),
        }
    }

    fn generate(
        &self,
        ctx: &mut CellContext<'_>,
        cell: TileCoord,
        element: &SnapshotElement,
    ) -> Result<usize, GenerateError> {
        let path = element.path.ok_or(GenerateError::MissingPathInfo {
            cell,
            index: element.index,
        })?;
        let texture = surface_texture(ctx.provider, path.surface_image);
        if texture.is_empty() {
            return Ok(0);
        }

        let transform = Transform {
            position: tile_to_world(cell.x, cell.y, element.content.base_height as f32),
            rotation: Quat::from_rotation_y(PI),
            scale: Vec3::ONE,
        };
        ctx.sink.place(Placement::TexturedQuad {
            mesh: self.quad.clone(),
            texture,
            transform,
        });
        Ok(1)
    }
}

/// Decode a sprite for a path surface. Sprites without pixels, or with a zero
/// dimension, give the placeholder.
fn surface_texture(provider: &dyn SimulationProvider, image: u32) -> Texture {
    let sprite = provider.sprite(image);
    if sprite.pixel_count() == 0 || sprite.area() == 0 {
        tracing::error!(
            image,
            width = sprite.width,
            height = sprite.height,
            pixels = sprite.pixel_count(),
            "surface sprite is empty"
        );
        return Texture::placeholder();
    }
    Texture::from_sprite(&sprite, |index| provider.palette_entry(index))
}

/// Track data of an anchor element, or `None` for a continuation tile whose
/// anchor is present in the snapshot.
fn anchor_track(
    snapshot: &MapSnapshot,
    cell: TileCoord,
    element: &SnapshotElement,
) -> Result<Option<TrackSegmentInfo>, GenerateError> {
    let track = element.track.ok_or(GenerateError::MissingTrackInfo {
        cell,
        index: element.index,
    })?;
    if track.is_anchor() {
        return Ok(Some(track));
    }
    if !snapshot.has_anchor(track.anchor, track.track_type) {
        return Err(GenerateError::MissingAnchor {
            cell,
            anchor: track.anchor,
            track_type: track.track_type,
        });
    }
    tracing::trace!(%cell, sequence = track.sequence_index, "continuation tile skipped");
    Ok(None)
}

/// Tile-centre pose of a track element, raised by a height offset in world z coordinates.
fn anchor_pose(cell: TileCoord, content: CellContent, height_offset: f32) -> Pose {
    Pose::new(
        tile_to_world(cell.x, cell.y, content.base_height as f32)
            + Vec3::Y * coords_z_to_world(height_offset),
        quarter_turn(content.rotation),
    )
}
