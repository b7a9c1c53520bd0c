//! Shared types plus the conversions from simulation coordinates into render space.
//!
//! # Invariants
//! - Every conversion is pure: identical inputs give bit-identical outputs.
//! - Render space is Y-up; grid `x` maps to render `x`, grid `y` maps to render `z`.

pub mod coords;
pub mod rotation;
mod types;

pub use coords::{
    COORDS_PER_TILE, COORDS_Z_PER_HEIGHT_UNIT, HEIGHT_UNIT, SUBTILE_OFFSET, TILE_SIZE,
    coords_to_world, coords_z_to_world, quarter_turn, tile_to_world, waypoint_local,
};
pub use rotation::rotation_from_packed;
pub use types::{Pose, Rgba, Transform};
