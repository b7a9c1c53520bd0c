//! Placement output: what generators hand to the host scene.
//!
//! # Invariants
//! - Placements are emitted in generation order and never mutate world state.
//! - A sink owns what it receives; generators keep no handle to emitted geometry.

mod placement;
mod recorder;

pub use placement::{Placement, PlacementSink};
pub use recorder::SceneRecorder;
