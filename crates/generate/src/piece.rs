//! Smoothed track pieces built from waypoint routes.
//!
//! Raw waypoints step in whole world coordinates and snap between packed
//! rotation codes, which gives a jagged mesh when extruded directly. A
//! [`TrackPiece`] averages each interior position over its neighbours and
//! interpolates rotations between the midpoints of runs of equal rotation.

use glam::{Quat, Vec3};
use parkscape_common::{Pose, quarter_turn, rotation_from_packed, waypoint_local};
use parkscape_kernel::Waypoint;

use crate::cache::WaypointRoute;

/// Neighbours averaged on each side of an interior waypoint.
const SMOOTH_RADIUS: usize = 3;

/// A route with smoothed local poses, one per waypoint, and its segment keys.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPiece {
    poses: Vec<Pose>,
    keys: Vec<usize>,
}

impl TrackPiece {
    pub fn from_route(route: &WaypointRoute) -> Self {
        let waypoints = &route.waypoints;
        let positions: Vec<Vec3> = waypoints
            .iter()
            .map(|w| waypoint_local(w.x, w.y, w.z))
            .collect();
        let rotations: Vec<Quat> = waypoints
            .iter()
            .map(|w| rotation_from_packed(w.direction, w.bank, w.pitch))
            .collect();
        let nodes = lerp_nodes(waypoints);

        let poses = (0..waypoints.len())
            .map(|i| {
                Pose::new(
                    smooth_position(&positions, i, SMOOTH_RADIUS),
                    smooth_rotation(&rotations, i, &nodes),
                )
            })
            .collect();
        Self {
            poses,
            keys: segment_keys(route),
        }
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// The route's [`segment_keys`], indexing into [`poses`](Self::poses).
    pub fn keys(&self) -> &[usize] {
        &self.keys
    }

    /// Poses at the segment keys, in route order.
    pub fn key_poses(&self) -> impl Iterator<Item = Pose> + '_ {
        self.keys.iter().map(|&key| self.poses[key])
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Length of the polyline through all poses, in render units.
    pub fn length(&self) -> f32 {
        self.poses
            .windows(2)
            .map(|pair| pair[0].position.distance(pair[1].position))
            .sum()
    }

    /// Rotation of a vehicle at `progress` along the piece, yawed by the
    /// element's quarter turns. Progress past either end is clamped.
    pub fn vehicle_rotation(&self, track_rotation: u8, progress: usize) -> Quat {
        let Some(last) = self.poses.len().checked_sub(1) else {
            return Quat::IDENTITY;
        };
        let rotation = self.poses[progress.min(last)].rotation;
        if track_rotation % 4 == 0 {
            rotation
        } else {
            quarter_turn(track_rotation) * rotation
        }
    }
}

/// Indices bounding each run of rotation-equal waypoints, first and last included.
///
/// Extruding only between consecutive keys collapses runs that would otherwise
/// produce one identical segment per waypoint.
pub fn segment_keys(route: &WaypointRoute) -> Vec<usize> {
    let waypoints = &route.waypoints;
    let Some(last) = waypoints.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut keys = vec![0];
    for i in 1..=last {
        if !Waypoint::has_equal_rotation(&waypoints[i - 1], &waypoints[i]) {
            keys.push(i - 1);
            keys.push(i);
        }
    }
    keys.push(last);
    keys.dedup();
    keys
}

/// Index 0, the midpoint of every run of equal rotation, and the last index.
fn lerp_nodes(waypoints: &[Waypoint]) -> Vec<usize> {
    let mut nodes = vec![0];
    let mut run_start = 0;
    for (i, waypoint) in waypoints.iter().enumerate() {
        if Waypoint::has_equal_rotation(&waypoints[run_start], waypoint) {
            continue;
        }
        nodes.push(run_start + (i - run_start) / 2);
        run_start = i;
    }
    nodes.push(waypoints.len().saturating_sub(1));
    nodes
}

fn smooth_position(positions: &[Vec3], index: usize, radius: usize) -> Vec3 {
    let upper = positions.len() - 1;
    if index == 0 || index == upper {
        return positions[index];
    }

    let (index, upper, mut radius) = (index as isize, upper as isize, radius as isize);
    let mut start = index - radius;
    if start < 0 {
        radius += start;
        start = 0;
    }
    let mut end = index + radius;
    if end > upper {
        start += end - upper;
        end = upper;
    }

    let window = &positions[start as usize..=end as usize];
    window.iter().sum::<Vec3>() / window.len() as f32
}

fn smooth_rotation(rotations: &[Quat], index: usize, nodes: &[usize]) -> Quat {
    let slot = match nodes.binary_search(&index) {
        Ok(_) => return rotations[index],
        Err(slot) => slot,
    };
    // Index 0 and the last index are always nodes, so `slot` has a node on each side.
    let (previous, next) = (nodes[slot - 1], nodes[slot]);
    let t = (index - previous) as f32 / (next - previous) as f32;
    rotations[previous].lerp(rotations[next], t)
}
