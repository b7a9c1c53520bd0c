use parkscape_common::Rgba;

use crate::tile::{
    CellContent, MapSize, PathSurfaceInfo, SceneryInfo, SpriteData, SurfaceInfo, TileCounts,
    TrackSegmentInfo, TrackType, Waypoint,
};

/// Read-only query interface onto the simulation that owns world state.
///
/// All queries are synchronous request/response and must not mutate the
/// world. Element indices address the stacked content of one tile, in the
/// order the simulation stores it.
pub trait SimulationProvider {
    /// Size of the whole grid, border included.
    fn map_size(&self) -> MapSize;

    /// Element counts for one tile.
    fn tile_counts(&self, x: i32, y: i32) -> TileCounts;

    /// The element at `index` on a tile, if any.
    fn element_at(&self, x: i32, y: i32, index: usize) -> Option<CellContent>;

    /// Track data for a track element at `index` on a tile.
    fn track_info_at(&self, x: i32, y: i32, index: usize) -> Option<TrackSegmentInfo>;

    /// Surface data for a path element at `index` on a tile.
    fn path_info_at(&self, x: i32, y: i32, index: usize) -> Option<PathSurfaceInfo>;

    /// Slope and water data for a surface element at `index` on a tile.
    fn surface_info_at(&self, x: i32, y: i32, index: usize) -> Option<SurfaceInfo>;

    /// Quadrant data for a small scenery element at `index` on a tile.
    fn scenery_info_at(&self, x: i32, y: i32, index: usize) -> Option<SceneryInfo>;

    /// Number of waypoints in the route of a track type.
    fn route_length(&self, track_type: TrackType) -> usize;

    /// The ordered route of a track type, `length` waypoints long.
    fn route(&self, track_type: TrackType, length: usize) -> Vec<Waypoint>;

    /// A palette colour.
    fn palette_entry(&self, index: u8) -> Rgba;

    /// Pixels of a sprite image. Unknown images have zero pixels.
    fn sprite(&self, image_index: u32) -> SpriteData;
}
