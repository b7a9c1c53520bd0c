//! Grid, height and world-coordinate conversion into render space.

use glam::{Quat, Vec3};

/// Render units covered by one tile horizontally.
pub const TILE_SIZE: f32 = 1.0;

/// Render units covered by one base-height unit.
pub const HEIGHT_UNIT: f32 = 0.25;

/// Simulation world coordinates per tile, horizontally.
pub const COORDS_PER_TILE: i32 = 32;

/// Simulation world coordinates per base-height unit, vertically.
pub const COORDS_Z_PER_HEIGHT_UNIT: i32 = 8;

/// Offset applied to waypoint-local coordinates. Waypoints are authored from the
/// tile corner, anchors sit at the tile centre.
pub const SUBTILE_OFFSET: i32 = -(COORDS_PER_TILE / 2);

const COORDS_XY_SCALE: f32 = TILE_SIZE / COORDS_PER_TILE as f32;
const COORDS_Z_SCALE: f32 = HEIGHT_UNIT / COORDS_Z_PER_HEIGHT_UNIT as f32;

/// Render-space position of a tile anchor at the given base height.
pub fn tile_to_world(x: i32, y: i32, height: f32) -> Vec3 {
    Vec3::new(x as f32 * TILE_SIZE, height * HEIGHT_UNIT, y as f32 * TILE_SIZE)
}

/// Render-space position of simulation world coordinates, where `z` is up.
pub fn coords_to_world(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x * COORDS_XY_SCALE, z * COORDS_Z_SCALE, y * COORDS_XY_SCALE)
}

/// Height offset in world coordinates converted to render units.
pub fn coords_z_to_world(z: f32) -> f32 {
    z * COORDS_Z_SCALE
}

/// Position of a waypoint relative to its tile anchor.
pub fn waypoint_local(x: i16, y: i16, z: i16) -> Vec3 {
    coords_to_world(
        (x as i32 + SUBTILE_OFFSET) as f32,
        (y as i32 + SUBTILE_OFFSET) as f32,
        z as f32,
    )
}

/// Yaw for a tile element rotation given in quarter turns.
pub fn quarter_turn(rotation: u8) -> Quat {
    Quat::from_rotation_y(((rotation % 4) as f32 * 90.0).to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_to_world_is_pure() {
        let a = tile_to_world(17, 42, 14.0);
        let b = tile_to_world(17, 42, 14.0);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
    }

    #[test]
    fn tile_to_world_maps_grid_y_to_render_z() {
        let p = tile_to_world(3, 5, 8.0);
        assert_eq!(p, Vec3::new(3.0, 2.0, 5.0));
    }

    #[test]
    fn waypoint_at_tile_centre_maps_to_anchor() {
        let half = (COORDS_PER_TILE / 2) as i16;
        assert_eq!(waypoint_local(half, half, 0), Vec3::ZERO);

        let anchor = tile_to_world(3, 3, 4.0);
        assert_eq!(anchor + waypoint_local(half, half, 0), anchor);
    }

    #[test]
    fn waypoint_at_corner_is_half_a_tile_off() {
        let p = waypoint_local(0, 0, 0);
        assert_eq!(p, Vec3::new(-TILE_SIZE / 2.0, 0.0, -TILE_SIZE / 2.0));
    }

    #[test]
    fn one_height_unit_of_coords_matches_tile_height() {
        let z = COORDS_Z_PER_HEIGHT_UNIT as f32;
        assert_eq!(coords_to_world(0.0, 0.0, z).y, tile_to_world(0, 0, 1.0).y);
        assert_eq!(coords_z_to_world(z), HEIGHT_UNIT);
    }

    #[test]
    fn quarter_turn_wraps() {
        assert!(quarter_turn(4).abs_diff_eq(quarter_turn(0), 1e-6));
        let east = quarter_turn(1) * Vec3::X;
        assert!((east - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
