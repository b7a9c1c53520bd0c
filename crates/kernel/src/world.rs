use std::cell::Cell;
use std::collections::BTreeMap;

use parkscape_common::Rgba;
use serde::{Deserialize, Serialize};

use crate::provider::SimulationProvider;
use crate::tile::{
    CellContent, ContentKind, MapSize, PathSurfaceInfo, SceneryInfo, SpriteData, SurfaceInfo,
    TileCoord, TileCounts, TrackSegmentInfo, TrackType, Waypoint,
};

/// Errors from building an in-memory world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("tile {0} is outside the {1}x{2} map")]
    OutOfBounds(TileCoord, u32, u32),
    #[error("element kind {expected:?} does not match its detail data")]
    DetailMismatch { expected: ContentKind },
}

/// Kind-specific data stored beside an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum ElementDetail {
    None,
    Track(TrackSegmentInfo),
    Path(PathSurfaceInfo),
    Surface(SurfaceInfo),
    Scenery(SceneryInfo),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredElement {
    content: CellContent,
    detail: ElementDetail,
}

/// Query counters, for checking how often the pipeline hits the provider.
#[derive(Debug, Default)]
pub struct QueryStats {
    pub element_queries: Cell<u64>,
    pub track_queries: Cell<u64>,
    pub route_length_queries: Cell<u64>,
    pub route_queries: Cell<u64>,
    pub palette_queries: Cell<u64>,
    pub sprite_queries: Cell<u64>,
}

impl QueryStats {
    fn bump(counter: &Cell<u64>) {
        counter.set(counter.get() + 1);
    }
}

/// An in-memory simulation world that answers provider queries.
///
/// Tiles are kept in a BTreeMap so iteration order is deterministic across
/// platforms. Used by tests and by the CLI in place of a live simulation.
#[derive(Debug)]
pub struct World {
    size: MapSize,
    tiles: BTreeMap<TileCoord, Vec<StoredElement>>,
    routes: BTreeMap<TrackType, Vec<Waypoint>>,
    palette: Vec<Rgba>,
    sprites: BTreeMap<u32, SpriteData>,
    stats: QueryStats,
}

impl World {
    /// Create an empty world with a greyscale palette.
    pub fn new(width: u32, height: u32) -> Self {
        let palette = (0..=255u8).map(|v| Rgba::new(v, v, v, 255)).collect();
        Self {
            size: MapSize { width, height },
            tiles: BTreeMap::new(),
            routes: BTreeMap::new(),
            palette,
            sprites: BTreeMap::new(),
            stats: QueryStats::default(),
        }
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    /// Query counters since creation or the last [`World::reset_stats`].
    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = QueryStats::default();
    }

    /// Number of elements across all tiles.
    pub fn element_count(&self) -> usize {
        self.tiles.values().map(Vec::len).sum()
    }

    fn check_bounds(&self, coord: TileCoord) -> Result<(), WorldError> {
        let MapSize { width, height } = self.size;
        if coord.x < 0 || coord.y < 0 || coord.x as u32 >= width || coord.y as u32 >= height {
            return Err(WorldError::OutOfBounds(coord, width, height));
        }
        Ok(())
    }

    fn push(&mut self, coord: TileCoord, element: StoredElement) -> Result<usize, WorldError> {
        self.check_bounds(coord)?;
        let stack = self.tiles.entry(coord).or_default();
        stack.push(element);
        Ok(stack.len() - 1)
    }

    fn push_detailed(
        &mut self,
        x: i32,
        y: i32,
        content: CellContent,
        expected: ContentKind,
        detail: ElementDetail,
    ) -> Result<usize, WorldError> {
        if content.kind != expected {
            return Err(WorldError::DetailMismatch { expected });
        }
        self.push(TileCoord::new(x, y), StoredElement { content, detail })
    }

    /// Stack an element without kind-specific data. Returns its element index.
    ///
    /// Surfaces placed this way are flat and dry; small scenery fills its tile.
    pub fn place(&mut self, x: i32, y: i32, content: CellContent) -> Result<usize, WorldError> {
        if matches!(content.kind, ContentKind::Track | ContentKind::Path) {
            return Err(WorldError::DetailMismatch {
                expected: content.kind,
            });
        }
        self.push(
            TileCoord::new(x, y),
            StoredElement {
                content,
                detail: ElementDetail::None,
            },
        )
    }

    /// Stack a track element. Returns its element index.
    pub fn place_track(
        &mut self,
        x: i32,
        y: i32,
        content: CellContent,
        info: TrackSegmentInfo,
    ) -> Result<usize, WorldError> {
        self.push_detailed(x, y, content, ContentKind::Track, ElementDetail::Track(info))
    }

    /// Stack a path element. Returns its element index.
    pub fn place_path(
        &mut self,
        x: i32,
        y: i32,
        content: CellContent,
        info: PathSurfaceInfo,
    ) -> Result<usize, WorldError> {
        self.push_detailed(x, y, content, ContentKind::Path, ElementDetail::Path(info))
    }

    /// Stack a surface element with slope and water data.
    pub fn place_surface(
        &mut self,
        x: i32,
        y: i32,
        content: CellContent,
        info: SurfaceInfo,
    ) -> Result<usize, WorldError> {
        self.push_detailed(x, y, content, ContentKind::Surface, ElementDetail::Surface(info))
    }

    /// Stack a small scenery element with quadrant data.
    pub fn place_scenery(
        &mut self,
        x: i32,
        y: i32,
        content: CellContent,
        info: SceneryInfo,
    ) -> Result<usize, WorldError> {
        self.push_detailed(
            x,
            y,
            content,
            ContentKind::SmallScenery,
            ElementDetail::Scenery(info),
        )
    }

    /// Define the waypoint route shared by every piece of a track type.
    pub fn define_route(&mut self, track_type: TrackType, waypoints: Vec<Waypoint>) {
        self.routes.insert(track_type, waypoints);
    }

    pub fn set_palette_entry(&mut self, index: u8, colour: Rgba) {
        self.palette[index as usize] = colour;
    }

    pub fn add_sprite(&mut self, image_index: u32, sprite: SpriteData) {
        self.sprites.insert(image_index, sprite);
    }

    fn stored(&self, x: i32, y: i32, index: usize) -> Option<&StoredElement> {
        self.tiles.get(&TileCoord::new(x, y))?.get(index)
    }

    /// Build a world with seeded procedural content: a surface on every tile,
    /// scattered paths and scenery, and rows of one- and two-tile track pieces.
    ///
    /// Given the same seed and size the result is identical on every platform.
    pub fn procedural(width: u32, height: u32, seed: u64) -> Self {
        let mut world = Self::new(width, height);
        let mut state = seed;
        let mut next = move || {
            state = splitmix64(state);
            state
        };

        world.define_route(STRAIGHT, straight_route());
        world.define_route(QUARTER_TURN, quarter_turn_route());
        world.define_route(DOUBLE_STRAIGHT, double_straight_route());
        for image in 1..=3u32 {
            world.add_sprite(image, checker_sprite(image as u8));
        }
        world.set_palette_entry(200, Rgba::new(220, 40, 40, 255));

        // Border tiles stay empty, as in the simulation.
        for y in 1..height.saturating_sub(1) as i32 {
            for x in 1..width.saturating_sub(1) as i32 {
                let roll = next();
                let base = 2 + (roll % 4) as u8 * 2;
                let surface = CellContent::new(ContentKind::Surface, 0, base);
                let mut terrain = match (roll >> 24) % 8 {
                    0 => SurfaceInfo::sloped(1 << ((roll >> 28) % 4)),
                    1 => SurfaceInfo::sloped(SurfaceInfo::WEST_EAST_VALLEY),
                    _ => SurfaceInfo::flat(),
                };
                if base == 2 && (roll >> 32) % 3 == 0 {
                    terrain = terrain.with_water(base + SurfaceInfo::HEIGHT_STEP);
                }
                check_placed(world.place_surface(x, y, surface, terrain));

                match (roll >> 8) % 10 {
                    0 | 1 => {
                        let path = CellContent::new(ContentKind::Path, 0, base);
                        let image = 1 + ((roll >> 16) % 3) as u32;
                        let info = PathSurfaceInfo { surface_image: image };
                        check_placed(world.place_path(x, y, path, info));
                    }
                    2 => {
                        let tree = CellContent::new(ContentKind::SmallScenery, (roll >> 16) as u8, base);
                        let info = if (roll >> 40) % 2 == 0 {
                            SceneryInfo::full_tile()
                        } else {
                            SceneryInfo::in_quadrant((roll >> 41) as u8)
                        };
                        check_placed(world.place_scenery(x, y, tree, info));
                    }
                    3 => {
                        let wall = CellContent::new(ContentKind::Wall, (roll >> 16) as u8, base);
                        check_placed(world.place(x, y, wall));
                    }
                    _ => {}
                }
            }
        }

        // A ride every fourth row: single-tile straights and turns, then one two-tile
        // piece. Rows need room for that last piece inside the border.
        let track_height = 10;
        let track_rows = if width >= 4 { height.saturating_sub(2) as i32 } else { 0 };
        for y in (2..track_rows).step_by(4) {
            let mut x = 1;
            while x + 2 < width as i32 - 1 {
                let anchor = TileCoord::new(x, y);
                let track_type = if next() % 3 == 0 { QUARTER_TURN } else { STRAIGHT };
                let info = TrackSegmentInfo {
                    main_colour: 200,
                    ..TrackSegmentInfo::anchor_at(track_type, anchor)
                };
                let content = CellContent::new(ContentKind::Track, 0, track_height);
                check_placed(world.place_track(x, y, content, info));
                x += 1;
            }
            let anchor = TileCoord::new(x, y);
            let info = TrackSegmentInfo::anchor_at(DOUBLE_STRAIGHT, anchor);
            let content = CellContent::new(ContentKind::Track, 0, track_height);
            check_placed(world.place_track(x, y, content, info));
            check_placed(world.place_track(x + 1, y, content, info.continuation(1)));
        }

        tracing::debug!(
            width,
            height,
            seed,
            elements = world.element_count(),
            "procedural world built"
        );
        world
    }
}

impl SimulationProvider for World {
    fn map_size(&self) -> MapSize {
        self.size
    }

    fn tile_counts(&self, x: i32, y: i32) -> TileCounts {
        let mut counts = TileCounts::default();
        if let Some(stack) = self.tiles.get(&TileCoord::new(x, y)) {
            for element in stack {
                counts.add(element.content.kind);
            }
        }
        counts
    }

    fn element_at(&self, x: i32, y: i32, index: usize) -> Option<CellContent> {
        QueryStats::bump(&self.stats.element_queries);
        self.stored(x, y, index).map(|e| e.content)
    }

    fn track_info_at(&self, x: i32, y: i32, index: usize) -> Option<TrackSegmentInfo> {
        QueryStats::bump(&self.stats.track_queries);
        match self.stored(x, y, index)?.detail {
            ElementDetail::Track(info) => Some(info),
            _ => None,
        }
    }

    fn path_info_at(&self, x: i32, y: i32, index: usize) -> Option<PathSurfaceInfo> {
        match self.stored(x, y, index)?.detail {
            ElementDetail::Path(info) => Some(info),
            _ => None,
        }
    }

    fn surface_info_at(&self, x: i32, y: i32, index: usize) -> Option<SurfaceInfo> {
        let stored = self.stored(x, y, index)?;
        match stored.detail {
            ElementDetail::Surface(info) => Some(info),
            _ if stored.content.kind == ContentKind::Surface => Some(SurfaceInfo::flat()),
            _ => None,
        }
    }

    fn scenery_info_at(&self, x: i32, y: i32, index: usize) -> Option<SceneryInfo> {
        let stored = self.stored(x, y, index)?;
        match stored.detail {
            ElementDetail::Scenery(info) => Some(info),
            _ if stored.content.kind == ContentKind::SmallScenery => Some(SceneryInfo::full_tile()),
            _ => None,
        }
    }

    fn route_length(&self, track_type: TrackType) -> usize {
        QueryStats::bump(&self.stats.route_length_queries);
        self.routes.get(&track_type).map_or(0, Vec::len)
    }

    fn route(&self, track_type: TrackType, length: usize) -> Vec<Waypoint> {
        QueryStats::bump(&self.stats.route_queries);
        self.routes
            .get(&track_type)
            .map(|route| route.iter().take(length).copied().collect())
            .unwrap_or_default()
    }

    fn palette_entry(&self, index: u8) -> Rgba {
        QueryStats::bump(&self.stats.palette_queries);
        self.palette[index as usize]
    }

    fn sprite(&self, image_index: u32) -> SpriteData {
        QueryStats::bump(&self.stats.sprite_queries);
        self.sprites.get(&image_index).cloned().unwrap_or_default()
    }
}

/// Track types used by [`World::procedural`].
pub const STRAIGHT: TrackType = TrackType(1);
pub const QUARTER_TURN: TrackType = TrackType(2);
pub const DOUBLE_STRAIGHT: TrackType = TrackType(3);

/// A straight across one tile, travelling towards negative x.
pub fn straight_route() -> Vec<Waypoint> {
    (0..32)
        .rev()
        .map(|x| Waypoint::new(x, 16, 0))
        .collect()
}

fn double_straight_route() -> Vec<Waypoint> {
    (-32..32)
        .rev()
        .map(|x| Waypoint::new(x, 16, 0))
        .collect()
}

/// A quarter turn inside one tile, from the +x edge to the -y edge.
pub fn quarter_turn_route() -> Vec<Waypoint> {
    const STEPS: i32 = 24;
    (0..=STEPS)
        .map(|i| {
            let a = (i as f32 / STEPS as f32) * std::f32::consts::FRAC_PI_2;
            let x = 32.0 - 16.0 * a.sin();
            let y = 16.0 * a.cos();
            let direction = (32 - (i * 8 / STEPS)) % 32;
            Waypoint::new(x.round() as i16, y.round() as i16, 0).with_orientation(
                direction as u8,
                0,
                0,
            )
        })
        .collect()
}

fn checker_sprite(shade: u8) -> SpriteData {
    let pixels = (0..16u8)
        .map(|i| if (i + i / 4) % 2 == 0 { shade * 40 } else { 255 - shade * 40 })
        .collect();
    SpriteData {
        width: 4,
        height: 4,
        offset_x: 0,
        offset_y: 0,
        pixels,
    }
}

/// Procedural content only targets in-bounds tiles with matching detail.
fn check_placed(result: Result<usize, WorldError>) {
    if let Err(err) = &result {
        tracing::error!(error = %err, "procedural placement rejected");
    }
    debug_assert!(result.is_ok(), "procedural placement rejected: {result:?}");
}

/// Splitmix64, a fast deterministic PRNG step function.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
