//! World Kernel: the read-only boundary to the simulation that owns world state.
//!
//! # Invariants
//! - Every provider query is synchronous and side-effect free.
//! - Tile content is an immutable snapshot per query.

pub mod provider;
pub mod tile;
pub mod world;

pub use provider::SimulationProvider;
pub use tile::{
    CellContent, ContentKind, MapSize, PathSurfaceInfo, SceneryInfo, SpriteData, SurfaceInfo,
    TileCoord, TileCounts, TrackSegmentInfo, TrackType, Waypoint,
};
pub use world::{QueryStats, World, WorldError};
