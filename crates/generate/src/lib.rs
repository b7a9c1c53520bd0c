//! Scene generation from a simulation map.
//!
//! A [`MapGenerator`] snapshots the playable area of a
//! [`SimulationProvider`](parkscape_kernel::SimulationProvider) and walks it
//! once per registered [`Generator`], turning tile content into placements on
//! a [`PlacementSink`](parkscape_render::PlacementSink). Track routes are
//! fetched once per track type and shared through the [`SubpositionCache`].
//!
//! The run is a lazy sequence of [`Progress`](parkscape_stream::Progress)
//! elements:
//!
//! - cells are visited row by row, one element per cell per phase;
//! - the first and last element of each phase flush;
//! - a generator error ends the sequence, and [`Generation::finish`] returns it;
//! - generators that gather geometry across a walk (terrain chunks) emit it
//!   when their walk ends.

mod cache;
mod dispatch;
mod error;
mod generators;
mod map;
mod piece;
mod snapshot;
mod surface;

pub use cache::{CacheStats, SubpositionCache, WaypointRoute};
pub use dispatch::{DispatchTable, TrackStyle};
pub use error::GenerateError;
pub use generators::{
    CellContext, Generator, PathSurfaceGenerator, PlacementGenerator, SubpositionGenerator,
    TrackMeshGenerator,
};
pub use map::{Generation, GenerationConfig, GenerationReport, MapGenerator};
pub use piece::{TrackPiece, segment_keys};
pub use snapshot::{MapSnapshot, SnapshotElement};
pub use surface::{DEFAULT_CHUNK_SIZE, SurfaceGenerator};
