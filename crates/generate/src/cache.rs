use std::collections::HashMap;
use std::sync::Arc;

use parkscape_kernel::{SimulationProvider, TrackType, Waypoint};

use crate::piece::TrackPiece;

/// The waypoint route shared by every piece of one track type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaypointRoute {
    pub track_type: TrackType,
    pub waypoints: Vec<Waypoint>,
}

impl WaypointRoute {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Lookup counters for a [`SubpositionCache`].
///
/// `hits` and `misses` count route lookups only. Piece lookups are counted
/// apart, and a piece miss that fetches its route also counts as a route lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub piece_hits: u64,
    pub piece_misses: u64,
}

/// Memoises waypoint routes and smoothed pieces per track type.
///
/// A miss costs one `route_length` and one `route` query; every later lookup
/// of the same type returns the same `Arc` without touching the provider.
/// Entries live until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct SubpositionCache {
    routes: HashMap<TrackType, Arc<WaypointRoute>>,
    pieces: HashMap<TrackType, Arc<TrackPiece>>,
    stats: CacheStats,
}

impl SubpositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<P>(&mut self, provider: &P, track_type: TrackType) -> Arc<WaypointRoute>
    where
        P: SimulationProvider + ?Sized,
    {
        if let Some(route) = self.routes.get(&track_type) {
            self.stats.hits += 1;
            return Arc::clone(route);
        }

        self.stats.misses += 1;
        let length = provider.route_length(track_type);
        let waypoints = provider.route(track_type, length);
        if waypoints.len() != length {
            tracing::warn!(
                %track_type,
                expected = length,
                actual = waypoints.len(),
                "route length does not match the reported length"
            );
        }
        tracing::debug!(%track_type, waypoints = waypoints.len(), "route cached");

        let route = Arc::new(WaypointRoute {
            track_type,
            waypoints,
        });
        self.routes.insert(track_type, Arc::clone(&route));
        route
    }

    /// The smoothed piece for a track type, built from the cached route.
    pub fn piece<P>(&mut self, provider: &P, track_type: TrackType) -> Arc<TrackPiece>
    where
        P: SimulationProvider + ?Sized,
    {
        if let Some(piece) = self.pieces.get(&track_type) {
            self.stats.piece_hits += 1;
            return Arc::clone(piece);
        }

        self.stats.piece_misses += 1;
        let route = self.route(provider, track_type);
        let piece = Arc::new(TrackPiece::from_route(&route));
        self.pieces.insert(track_type, Arc::clone(&piece));
        piece
    }

    pub fn contains(&self, track_type: TrackType) -> bool {
        self.routes.contains_key(&track_type)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every cached route and piece. Counters are kept.
    pub fn clear(&mut self) {
        tracing::debug!(routes = self.routes.len(), "subposition cache cleared");
        self.routes.clear();
        self.pieces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkscape_kernel::World;

    fn world_with_route(track_type: TrackType, len: i16) -> World {
        let mut world = World::new(4, 4);
        world.define_route(
            track_type,
            (0..len).map(|x| Waypoint::new(x, 16, 0)).collect(),
        );
        world
    }

    #[test]
    fn miss_then_hit_returns_same_route() {
        let world = world_with_route(TrackType(7), 5);
        let mut cache = SubpositionCache::new();

        let first = cache.route(&world, TrackType(7));
        let second = cache.route(&world, TrackType(7));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 5);
        assert_eq!(world.stats().route_queries.get(), 1);
        assert_eq!(world.stats().route_length_queries.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                ..CacheStats::default()
            }
        );
    }

    #[test]
    fn unknown_type_caches_an_empty_route() {
        let world = World::new(4, 4);
        let mut cache = SubpositionCache::new();
        assert!(cache.route(&world, TrackType(99)).is_empty());
        assert!(cache.contains(TrackType(99)));
        cache.route(&world, TrackType(99));
        assert_eq!(world.stats().route_queries.get(), 1);
    }

    #[test]
    fn clear_forces_a_new_query() {
        let world = world_with_route(TrackType(3), 4);
        let mut cache = SubpositionCache::new();
        let before = cache.route(&world, TrackType(3));
        cache.clear();
        assert!(cache.is_empty());
        let after = cache.route(&world, TrackType(3));

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
        assert_eq!(world.stats().route_queries.get(), 2);
    }

    #[test]
    fn pieces_share_the_route_query() {
        let world = world_with_route(TrackType(2), 8);
        let mut cache = SubpositionCache::new();
        let route = cache.route(&world, TrackType(2));
        let piece = cache.piece(&world, TrackType(2));
        let again = cache.piece(&world, TrackType(2));

        assert!(Arc::ptr_eq(&piece, &again));
        assert_eq!(piece.len(), route.len());
        assert_eq!(world.stats().route_queries.get(), 1);
        // The piece miss reads the already cached route.
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                piece_hits: 1,
                piece_misses: 1,
            }
        );
    }

    #[test]
    fn piece_lookups_do_not_inflate_route_hits() {
        let world = world_with_route(TrackType(4), 6);
        let mut cache = SubpositionCache::new();
        for _ in 0..3 {
            cache.piece(&world, TrackType(4));
        }
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 0,
                misses: 1,
                piece_hits: 2,
                piece_misses: 1,
            }
        );
    }

    #[test]
    fn types_are_cached_independently() {
        let mut world = world_with_route(TrackType(1), 3);
        world.define_route(TrackType(2), vec![Waypoint::new(0, 0, 0)]);
        let mut cache = SubpositionCache::new();
        assert_eq!(cache.route(&world, TrackType(1)).len(), 3);
        assert_eq!(cache.route(&world, TrackType(2)).len(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(world.stats().route_queries.get(), 2);
    }
}
