//! Terrain meshes built from surface elements.
//!
//! Surface tiles are gathered into square chunks while the map is walked. Each
//! chunk keeps three builders: the sloped top faces, the vertical edges where a
//! tile stands above its neighbour, and flat water. The chunks are turned into
//! mesh placements once the walk is over.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use parkscape_assets::{MeshBuilder, Vertex};
use parkscape_common::{HEIGHT_UNIT, Rgba, TILE_SIZE, Transform, tile_to_world};
use parkscape_kernel::{SurfaceInfo, TileCoord};
use parkscape_render::{Placement, PlacementSink};

use crate::error::GenerateError;
use crate::generators::CellContext;
use crate::snapshot::{MapSnapshot, SnapshotElement};

pub(crate) const SURFACE_LABEL: &str = "Generating chunks...";

/// Tiles per chunk side when none is given.
pub const DEFAULT_CHUNK_SIZE: u32 = 16;

/// Edge texture rows per base-height unit.
const VS_PER_HEIGHT_UNIT: f32 = 4.0;

const SURFACE_COLOUR: Rgba = Rgba::new(92, 148, 60, 255);
const EDGE_COLOUR: Rgba = Rgba::new(118, 92, 64, 255);
const WATER_COLOUR: Rgba = Rgba::new(64, 112, 196, 160);

#[derive(Debug, Default)]
struct Chunk {
    surface: MeshBuilder,
    edges: MeshBuilder,
    water: MeshBuilder,
}

/// One tile side: the neighbour's offset, the two top corners of this tile
/// seen from outside (left then right), and the facing corners of the neighbour.
struct Side {
    offset: (i32, i32),
    left: Corner,
    right: Corner,
    neighbour_left: u8,
    neighbour_right: u8,
}

#[derive(Clone, Copy)]
enum Corner {
    North,
    East,
    South,
    West,
}

const SIDES: [Side; 4] = [
    Side {
        offset: (0, 1),
        left: Corner::North,
        right: Corner::West,
        neighbour_left: SurfaceInfo::EAST_UP,
        neighbour_right: SurfaceInfo::SOUTH_UP,
    },
    Side {
        offset: (1, 0),
        left: Corner::East,
        right: Corner::North,
        neighbour_left: SurfaceInfo::SOUTH_UP,
        neighbour_right: SurfaceInfo::WEST_UP,
    },
    Side {
        offset: (0, -1),
        left: Corner::South,
        right: Corner::East,
        neighbour_left: SurfaceInfo::WEST_UP,
        neighbour_right: SurfaceInfo::NORTH_UP,
    },
    Side {
        offset: (-1, 0),
        left: Corner::West,
        right: Corner::South,
        neighbour_left: SurfaceInfo::NORTH_UP,
        neighbour_right: SurfaceInfo::EAST_UP,
    },
];

/// The four top corners of one tile in chunk-local space, with their heights
/// in base-height units.
struct TileCorners {
    vertices: [Vertex; 4],
    heights: [i32; 4],
}

impl TileCorners {
    fn new(local: (i32, i32), base_height: u8, info: &SurfaceInfo) -> Self {
        let (lx, ly) = local;
        // Grid y runs along render z; north is the far corner on both axes.
        let layout = [
            (Corner::North, SurfaceInfo::NORTH_UP, lx + 1, ly + 1),
            (Corner::East, SurfaceInfo::EAST_UP, lx + 1, ly),
            (Corner::South, SurfaceInfo::SOUTH_UP, lx, ly),
            (Corner::West, SurfaceInfo::WEST_UP, lx, ly + 1),
        ];
        let mut vertices = [Vertex::new(Vec3::ZERO, Vec3::ZERO, Vec2::ZERO); 4];
        let mut heights = [0; 4];
        for (corner, flag, x, z) in layout {
            let height = info.corner_height(base_height, flag);
            vertices[corner as usize] = Vertex::new(
                Vec3::new(x as f32 * TILE_SIZE, height as f32 * HEIGHT_UNIT, z as f32 * TILE_SIZE),
                Vec3::ZERO,
                Vec2::new(x as f32, z as f32),
            );
            heights[corner as usize] = height;
        }
        Self { vertices, heights }
    }

    fn vertex(&self, corner: Corner) -> Vertex {
        self.vertices[corner as usize]
    }

    fn height(&self, corner: Corner) -> i32 {
        self.heights[corner as usize]
    }
}

/// Builds chunked terrain meshes from the first surface element of each tile.
#[derive(Debug)]
pub struct SurfaceGenerator {
    chunk_size: i32,
    chunks: BTreeMap<(i32, i32), Chunk>,
}

impl Default for SurfaceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl SurfaceGenerator {
    /// A generator grouping `chunk_size` by `chunk_size` tiles per mesh. Zero is raised to one.
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, i32::MAX as u32) as i32,
            chunks: BTreeMap::new(),
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size as u32
    }

    /// Chunks holding geometry that has not been flushed yet.
    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Drop geometry gathered by an unfinished walk.
    pub fn reset(&mut self) {
        self.chunks.clear();
    }

    pub(crate) fn generate(
        &mut self,
        ctx: &mut CellContext<'_>,
        cell: TileCoord,
        element: &SnapshotElement,
    ) -> Result<usize, GenerateError> {
        // Stacked surfaces are not drawn; only the first one on a tile counts.
        if ctx
            .snapshot
            .first_surface(cell.x, cell.y)
            .is_some_and(|first| first.index != element.index)
        {
            return Ok(0);
        }
        let base_height = element.content.base_height;
        if base_height == 0 {
            return Ok(0);
        }
        let info = element.surface.ok_or(GenerateError::MissingSurfaceInfo {
            cell,
            index: element.index,
        })?;

        let key = (cell.x.div_euclid(self.chunk_size), cell.y.div_euclid(self.chunk_size));
        let local = (cell.x - key.0 * self.chunk_size, cell.y - key.1 * self.chunk_size);
        let corners = TileCorners::new(local, base_height, &info);
        let chunk = self.chunks.entry(key).or_default();

        let [north, east, south, west] = corners.vertices;
        let valley = info.slope & SurfaceInfo::WEST_EAST_VALLEY;
        if valley == 0 || valley == SurfaceInfo::WEST_EAST_VALLEY {
            // Split along the east-west diagonal so the fold follows the slope.
            chunk.surface.add_triangle(west, north, east);
            chunk.surface.add_triangle(east, south, west);
        } else {
            chunk.surface.add_quad(north, east, south, west);
        }

        if info.has_water() {
            let level = info.water_height as f32 * HEIGHT_UNIT;
            let [n, e, s, w] = [north, east, south, west].map(|v| {
                Vertex::new(Vec3::new(v.position.x, level, v.position.z), Vec3::Y, v.uv)
            });
            chunk.water.add_quad(n, e, s, w);
        }

        for side in &SIDES {
            add_edge(&mut chunk.edges, ctx.snapshot, cell, &info, &corners, side);
        }
        Ok(0)
    }

    /// Emit one mesh per non-empty chunk layer and forget the chunks.
    pub(crate) fn finish(&mut self, sink: &mut dyn PlacementSink) -> usize {
        let mut emitted = 0;
        for ((cx, cy), chunk) in std::mem::take(&mut self.chunks) {
            let origin = tile_to_world(cx * self.chunk_size, cy * self.chunk_size, 0.0)
                - Vec3::new(TILE_SIZE / 2.0, 0.0, TILE_SIZE / 2.0);
            let transform = Transform {
                position: origin,
                ..Transform::default()
            };
            let layers = [
                ("Surface", &chunk.surface, SURFACE_COLOUR),
                ("Edge", &chunk.edges, EDGE_COLOUR),
                ("Water", &chunk.water, WATER_COLOUR),
            ];
            for (name, builder, colour) in layers {
                if builder.vertex_count() == 0 {
                    continue;
                }
                let mut mesh = builder.to_mesh();
                if name == "Surface" {
                    mesh.recalculate_normals();
                }
                sink.place(Placement::Mesh {
                    mesh,
                    transform,
                    colour,
                    label: format!("{name} chunk ({cx}, {cy})"),
                });
                emitted += 1;
            }
        }
        tracing::debug!(meshes = emitted, "surface chunks flushed");
        emitted
    }
}

/// Add the wall between a tile and one neighbour when the tile stands above it.
///
/// A neighbour outside the loaded region, or without a surface, counts as
/// ground level.
fn add_edge(
    edges: &mut MeshBuilder,
    snapshot: &MapSnapshot,
    cell: TileCoord,
    info: &SurfaceInfo,
    corners: &TileCorners,
    side: &Side,
) {
    let (ox, oy) = side.offset;
    let (neighbour_base, neighbour) = snapshot
        .first_surface(cell.x + ox, cell.y + oy)
        .map(|e| (e.content.base_height, e.surface.unwrap_or_default()))
        .unwrap_or_default();

    let mut left_top = corners.vertex(side.left);
    let mut right_top = corners.vertex(side.right);
    let left_top_height = corners.height(side.left);
    let right_top_height = corners.height(side.right);
    if info.has_water() && neighbour.water_height != info.water_height {
        let level = info.water_height as f32 * HEIGHT_UNIT;
        left_top.position.y = level;
        right_top.position.y = level;
    }

    let left_bottom_height = neighbour.corner_height(neighbour_base, side.neighbour_left);
    let right_bottom_height = neighbour.corner_height(neighbour_base, side.neighbour_right);
    let left_bottom_y = left_bottom_height as f32 * HEIGHT_UNIT;
    let right_bottom_y = right_bottom_height as f32 * HEIGHT_UNIT;
    if left_top.position.y <= left_bottom_y && right_top.position.y <= right_bottom_y {
        return;
    }

    let normal = Vec3::new(ox as f32, 0.0, oy as f32);
    let u = if ox == 0 { cell.x } else { cell.y };
    let (left_u, right_u) = ((u + oy) as f32, (u + ox) as f32);
    let v = |height: i32| height as f32 / VS_PER_HEIGHT_UNIT;

    left_top.normal = normal;
    left_top.uv = Vec2::new(left_u, v(left_top_height));
    right_top.normal = normal;
    right_top.uv = Vec2::new(right_u, v(right_top_height));
    let left_bottom = Vertex::new(
        Vec3::new(left_top.position.x, left_bottom_y, left_top.position.z),
        normal,
        Vec2::new(left_u, v(left_bottom_height)),
    );
    let right_bottom = Vertex::new(
        Vec3::new(right_top.position.x, right_bottom_y, right_top.position.z),
        normal,
        Vec2::new(right_u, v(right_bottom_height)),
    );
    edges.add_quad(left_top, right_top, right_bottom, left_bottom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkscape_assets::Mesh;
    use parkscape_kernel::{CellContent, ContentKind, World};
    use parkscape_render::SceneRecorder;
    use parkscape_stream::{CellCoord, GridSize};

    use crate::cache::SubpositionCache;

    fn surface(world: &mut World, x: i32, y: i32, base: u8, info: SurfaceInfo) {
        world
            .place_surface(x, y, CellContent::new(ContentKind::Surface, 0, base), info)
            .unwrap();
    }

    /// Walk every surface of an 8x8 world through `generator`, then flush it.
    fn generate_all(generator: &mut SurfaceGenerator, world: &World) -> SceneRecorder {
        let snapshot = MapSnapshot::capture(world, CellCoord::new(0, 0), GridSize::new(8, 8));
        let mut cache = SubpositionCache::new();
        let mut scene = SceneRecorder::new();
        {
            let mut ctx = CellContext {
                provider: world,
                cache: &mut cache,
                sink: &mut scene,
                snapshot: &snapshot,
            };
            for y in 0..8 {
                for x in 0..8 {
                    let elements = snapshot.tile(x, y).unwrap_or_default().to_vec();
                    for element in elements.iter().filter(|e| e.content.kind == ContentKind::Surface) {
                        let placed = generator
                            .generate(&mut ctx, TileCoord::new(x, y), element)
                            .unwrap();
                        assert_eq!(placed, 0);
                    }
                }
            }
        }
        generator.finish(&mut scene);
        scene
    }

    fn layer<'s>(scene: &'s SceneRecorder, prefix: &str) -> Vec<&'s Mesh> {
        scene
            .placements()
            .iter()
            .filter_map(|p| match p {
                Placement::Mesh { mesh, label, .. } if label.starts_with(prefix) => Some(mesh),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn flat_tile_spans_its_cell() {
        let mut world = World::new(8, 8);
        surface(&mut world, 2, 3, 4, SurfaceInfo::flat());
        let scene = generate_all(&mut SurfaceGenerator::new(4), &world);

        let top = layer(&scene, "Surface chunk (0, 0)");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].triangle_count(), 2);
        assert!(top[0].normals.iter().all(|n| n.abs_diff_eq(Vec3::Y, 1e-6)));

        // The chunk sits half a tile back so the tile's corners land on its edges.
        let placed = &scene.placements()[0];
        let bounds = top[0].bounds();
        let min = placed.transform().position + bounds.min;
        let max = placed.transform().position + bounds.max;
        let centre = tile_to_world(2, 3, 4.0);
        assert!(min.abs_diff_eq(centre - Vec3::new(0.5, 0.0, 0.5), 1e-6));
        assert!(max.abs_diff_eq(centre + Vec3::new(0.5, 0.0, 0.5), 1e-6));
    }

    #[test]
    fn raised_corners_lift_their_vertices() {
        let mut world = World::new(8, 8);
        surface(&mut world, 1, 1, 4, SurfaceInfo::sloped(SurfaceInfo::NORTH_UP));
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);

        let top = layer(&scene, "Surface");
        let high = top[0]
            .vertices
            .iter()
            .filter(|v| (v.y - 6.0 * HEIGHT_UNIT).abs() < 1e-6)
            .count();
        assert_eq!(high, 1);
        // The north corner is local (2, 2) in the chunk at the origin.
        assert!(top[0].vertices.contains(&Vec3::new(2.0, 6.0 * HEIGHT_UNIT, 2.0)));
        assert!(top[0].normals.iter().all(|n| n.y > 0.0));
    }

    #[test]
    fn isolated_tile_gets_four_edges_down_to_the_ground() {
        let mut world = World::new(8, 8);
        surface(&mut world, 3, 3, 4, SurfaceInfo::flat());
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);

        let edges = layer(&scene, "Edge");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].triangle_count(), 8);
        let normals: Vec<Vec3> = edges[0].normals.clone();
        for side in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z] {
            assert!(normals.contains(&side));
        }
        assert_eq!(edges[0].bounds().min.y, 0.0);
    }

    #[test]
    fn lower_neighbour_only_gets_its_outer_edges() {
        let mut world = World::new(8, 8);
        surface(&mut world, 3, 3, 4, SurfaceInfo::flat());
        surface(&mut world, 4, 3, 2, SurfaceInfo::flat());
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);

        // Four sides of the high tile plus three of the low one.
        let edges = layer(&scene, "Edge");
        assert_eq!(edges[0].triangle_count(), 14);
        // The shared wall runs from the low tile's top up to the high tile's.
        let shared: Vec<&Vec3> = edges[0]
            .vertices
            .iter()
            .filter(|v| (v.x - 4.0).abs() < 1e-6 && v.y > 0.0)
            .collect();
        assert!(shared.iter().any(|v| (v.y - 2.0 * HEIGHT_UNIT).abs() < 1e-6));
        assert!(shared.iter().any(|v| (v.y - 4.0 * HEIGHT_UNIT).abs() < 1e-6));
    }

    #[test]
    fn equal_neighbours_share_no_edge() {
        let mut world = World::new(8, 8);
        surface(&mut world, 3, 3, 4, SurfaceInfo::flat());
        surface(&mut world, 4, 3, 4, SurfaceInfo::flat());
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);
        assert_eq!(layer(&scene, "Edge")[0].triangle_count(), 12);
        // Both tops weld along the shared side.
        assert_eq!(layer(&scene, "Surface")[0].vertex_count(), 6);
    }

    #[test]
    fn water_adds_a_flat_quad_and_raises_edges() {
        let mut world = World::new(8, 8);
        surface(&mut world, 2, 2, 2, SurfaceInfo::flat().with_water(6));
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);

        let water = layer(&scene, "Water");
        assert_eq!(water.len(), 1);
        assert_eq!(water[0].triangle_count(), 2);
        assert!(water[0].vertices.iter().all(|v| (v.y - 6.0 * HEIGHT_UNIT).abs() < 1e-6));
        assert!(water[0].normals.iter().all(|n| *n == Vec3::Y));
        // Edges climb to the water line, not the tile top.
        assert!((layer(&scene, "Edge")[0].bounds().max.y - 6.0 * HEIGHT_UNIT).abs() < 1e-6);
    }

    #[test]
    fn ground_level_and_stacked_surfaces_are_skipped() {
        let mut world = World::new(8, 8);
        surface(&mut world, 1, 1, 0, SurfaceInfo::flat());
        surface(&mut world, 2, 2, 4, SurfaceInfo::flat());
        surface(&mut world, 2, 2, 8, SurfaceInfo::flat());
        let scene = generate_all(&mut SurfaceGenerator::default(), &world);

        let top = layer(&scene, "Surface");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].triangle_count(), 2);
        assert_eq!(top[0].bounds().max.y, 4.0 * HEIGHT_UNIT);
    }

    #[test]
    fn tiles_group_into_chunks() {
        let mut world = World::new(8, 8);
        for (x, y) in [(0, 0), (1, 1), (2, 1), (5, 6)] {
            surface(&mut world, x, y, 2, SurfaceInfo::flat());
        }
        let mut generator = SurfaceGenerator::new(2);
        let scene = generate_all(&mut generator, &world);

        assert_eq!(layer(&scene, "Surface").len(), 3);
        assert!(scene.placements().iter().any(|p| p.label() == "Surface chunk (2, 3)"));
        let chunk = scene
            .placements()
            .iter()
            .find(|p| p.label() == "Surface chunk (1, 0)")
            .unwrap();
        assert!(chunk
            .transform()
            .position
            .abs_diff_eq(tile_to_world(2, 0, 0.0) - Vec3::new(0.5, 0.0, 0.5), 1e-6));
        assert_eq!(generator.pending_chunks(), 0);
    }

    #[test]
    fn surface_without_detail_is_an_error() {
        let world = World::new(4, 4);
        let snapshot = MapSnapshot::capture(&world, CellCoord::new(0, 0), GridSize::new(4, 4));
        let mut cache = SubpositionCache::new();
        let mut scene = SceneRecorder::new();
        let mut ctx = CellContext {
            provider: &world,
            cache: &mut cache,
            sink: &mut scene,
            snapshot: &snapshot,
        };
        let element = SnapshotElement::bare(0, CellContent::new(ContentKind::Surface, 0, 2));
        let mut generator = SurfaceGenerator::default();
        assert!(matches!(
            generator.generate(&mut ctx, TileCoord::new(1, 1), &element),
            Err(GenerateError::MissingSurfaceInfo { index: 0, .. })
        ));
    }

    #[test]
    fn reset_drops_pending_chunks() {
        let mut world = World::new(8, 8);
        surface(&mut world, 1, 1, 2, SurfaceInfo::flat());
        let snapshot = MapSnapshot::capture(&world, CellCoord::new(0, 0), GridSize::new(8, 8));
        let mut cache = SubpositionCache::new();
        let mut scene = SceneRecorder::new();
        let mut generator = SurfaceGenerator::new(0);
        assert_eq!(generator.chunk_size(), 1);
        let element = snapshot.tile(1, 1).unwrap()[0];
        let mut ctx = CellContext {
            provider: &world,
            cache: &mut cache,
            sink: &mut scene,
            snapshot: &snapshot,
        };
        generator.generate(&mut ctx, TileCoord::new(1, 1), &element).unwrap();
        assert_eq!(generator.pending_chunks(), 1);
        generator.reset();
        assert_eq!(generator.finish(&mut scene), 0);
        assert!(scene.is_empty());
    }
}
