use parkscape_kernel::{
    CellContent, ContentKind, PathSurfaceInfo, SceneryInfo, SimulationProvider, SurfaceInfo,
    TileCoord, TrackSegmentInfo, TrackType,
};
use parkscape_stream::{CellCoord, GridSize};

/// One element of a loaded tile, with its kind-specific data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotElement {
    /// Position in the tile's element stack.
    pub index: usize,
    pub content: CellContent,
    pub track: Option<TrackSegmentInfo>,
    pub path: Option<PathSurfaceInfo>,
    pub surface: Option<SurfaceInfo>,
    pub scenery: Option<SceneryInfo>,
}

impl SnapshotElement {
    /// An element with no kind-specific data attached.
    pub fn bare(index: usize, content: CellContent) -> Self {
        Self {
            index,
            content,
            track: None,
            path: None,
            surface: None,
            scenery: None,
        }
    }
}

/// The loaded region of the map, queried once per tile up front.
#[derive(Debug, Clone)]
pub struct MapSnapshot {
    origin: CellCoord,
    size: GridSize,
    tiles: Vec<Vec<SnapshotElement>>,
}

impl MapSnapshot {
    /// An empty snapshot covering `size` tiles starting at `origin`.
    pub fn new(origin: CellCoord, size: GridSize) -> Self {
        Self {
            origin,
            size,
            tiles: vec![Vec::new(); size.cell_count() as usize],
        }
    }

    /// Load every tile of the region at once.
    pub fn capture<P>(provider: &P, origin: CellCoord, size: GridSize) -> Self
    where
        P: SimulationProvider + ?Sized,
    {
        let mut snapshot = Self::new(origin, size);
        for y in 0..size.height as i32 {
            for x in 0..size.width as i32 {
                snapshot.load_tile(provider, CellCoord::new(origin.x + x, origin.y + y));
            }
        }
        snapshot
    }

    pub fn origin(&self) -> CellCoord {
        self.origin
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    fn slot(&self, x: i32, y: i32) -> Option<usize> {
        let (dx, dy) = (x - self.origin.x, y - self.origin.y);
        if dx < 0 || dy < 0 || dx as u32 >= self.size.width || dy as u32 >= self.size.height {
            return None;
        }
        Some(dy as usize * self.size.width as usize + dx as usize)
    }

    /// Query one tile from the provider and store it. Cells outside the region are ignored.
    pub fn load_tile<P>(&mut self, provider: &P, cell: CellCoord)
    where
        P: SimulationProvider + ?Sized,
    {
        let Some(slot) = self.slot(cell.x, cell.y) else {
            return;
        };
        let counts = provider.tile_counts(cell.x, cell.y);
        let mut elements = Vec::with_capacity(counts.total as usize);
        for index in 0..counts.total as usize {
            let Some(content) = provider.element_at(cell.x, cell.y, index) else {
                continue;
            };
            let mut element = SnapshotElement::bare(index, content);
            match content.kind {
                ContentKind::Track => element.track = provider.track_info_at(cell.x, cell.y, index),
                ContentKind::Path => element.path = provider.path_info_at(cell.x, cell.y, index),
                ContentKind::Surface => {
                    element.surface = provider.surface_info_at(cell.x, cell.y, index);
                }
                ContentKind::SmallScenery => {
                    element.scenery = provider.scenery_info_at(cell.x, cell.y, index);
                }
                _ => {}
            }
            elements.push(element);
        }
        tracing::trace!(x = cell.x, y = cell.y, elements = elements.len(), "tile loaded");
        self.tiles[slot] = elements;
    }

    /// Elements of a loaded tile, or `None` outside the region.
    pub fn tile(&self, x: i32, y: i32) -> Option<&[SnapshotElement]> {
        self.slot(x, y).map(|slot| self.tiles[slot].as_slice())
    }

    /// The first surface element of a tile, if the tile is loaded and has one.
    pub fn first_surface(&self, x: i32, y: i32) -> Option<&SnapshotElement> {
        self.tile(x, y)?
            .iter()
            .find(|e| e.content.kind == ContentKind::Surface)
    }

    /// Whether `anchor` is inside the region and holds sequence index 0 of `track_type`.
    pub fn has_anchor(&self, anchor: TileCoord, track_type: TrackType) -> bool {
        self.tile(anchor.x, anchor.y).is_some_and(|elements| {
            elements.iter().any(|e| {
                e.track
                    .is_some_and(|t| t.track_type == track_type && t.is_anchor())
            })
        })
    }

    pub fn element_count(&self) -> usize {
        self.tiles.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkscape_kernel::World;

    #[test]
    fn capture_keeps_element_order_and_detail() {
        let mut world = World::new(4, 4);
        world
            .place(1, 1, CellContent::new(ContentKind::Surface, 0, 2))
            .unwrap();
        world
            .place_track(
                1,
                1,
                CellContent::new(ContentKind::Track, 1, 2),
                TrackSegmentInfo::anchor_at(TrackType(5), TileCoord::new(1, 1)),
            )
            .unwrap();

        let snapshot = MapSnapshot::capture(&world, CellCoord::new(0, 0), GridSize::new(4, 4));
        let tile = snapshot.tile(1, 1).unwrap();
        assert_eq!(tile.len(), 2);
        assert_eq!(tile[0].content.kind, ContentKind::Surface);
        assert_eq!(tile[1].index, 1);
        assert_eq!(tile[1].track.map(|t| t.track_type), Some(TrackType(5)));
        assert!(snapshot.has_anchor(TileCoord::new(1, 1), TrackType(5)));
        assert!(!snapshot.has_anchor(TileCoord::new(1, 1), TrackType(6)));
        assert_eq!(snapshot.element_count(), 2);
    }

    #[test]
    fn region_bounds_are_respected() {
        let world = World::new(6, 6);
        let snapshot = MapSnapshot::capture(&world, CellCoord::new(1, 1), GridSize::new(4, 4));
        assert!(snapshot.tile(0, 0).is_none());
        assert!(snapshot.tile(1, 1).is_some());
        assert!(snapshot.tile(4, 4).is_some());
        assert!(snapshot.tile(5, 4).is_none());
        assert!(!snapshot.has_anchor(TileCoord::new(0, 0), TrackType(1)));
    }

    #[test]
    fn capture_loads_surface_and_scenery_detail() {
        let mut world = World::new(4, 4);
        let slope = SurfaceInfo::sloped(SurfaceInfo::WEST_UP).with_water(8);
        world
            .place(2, 2, CellContent::new(ContentKind::Wall, 0, 2))
            .unwrap();
        world
            .place_surface(2, 2, CellContent::new(ContentKind::Surface, 0, 4), slope)
            .unwrap();
        world
            .place_scenery(
                2,
                2,
                CellContent::new(ContentKind::SmallScenery, 0, 4),
                SceneryInfo::in_quadrant(1),
            )
            .unwrap();

        let snapshot = MapSnapshot::capture(&world, CellCoord::new(0, 0), GridSize::new(4, 4));
        let tile = snapshot.tile(2, 2).unwrap();
        assert_eq!(tile[0].surface, None);
        assert_eq!(tile[1].surface, Some(slope));
        assert_eq!(tile[2].scenery, Some(SceneryInfo::in_quadrant(1)));
        assert_eq!(snapshot.first_surface(2, 2).map(|e| e.index), Some(1));
        assert!(snapshot.first_surface(1, 1).is_none());
        assert!(snapshot.first_surface(9, 9).is_none());
    }
}
