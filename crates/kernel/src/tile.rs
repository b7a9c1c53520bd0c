use serde::{Deserialize, Serialize};

/// Integer tile coordinate on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Size of the world grid in tiles, border included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

/// The kind of content stacked on a tile.
///
/// `Unknown` carries kind codes the pipeline does not recognise; they are
/// ignored by generation instead of being treated as corrupt data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentKind {
    Surface,
    Path,
    Track,
    SmallScenery,
    Entrance,
    Wall,
    LargeScenery,
    Banner,
    Corrupt,
    Unknown(u8),
}

impl ContentKind {
    /// Decode the simulation's raw kind code. Never fails.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Surface,
            1 => Self::Path,
            2 => Self::Track,
            3 => Self::SmallScenery,
            4 => Self::Entrance,
            5 => Self::Wall,
            6 => Self::LargeScenery,
            7 => Self::Banner,
            8 => Self::Corrupt,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Path => "path",
            Self::Track => "track",
            Self::SmallScenery => "small scenery",
            Self::Entrance => "entrance",
            Self::Wall => "wall",
            Self::LargeScenery => "large scenery",
            Self::Banner => "banner",
            Self::Corrupt => "corrupt",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// One element stacked on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContent {
    pub kind: ContentKind,
    /// Quarter turns, 0..=3.
    pub rotation: u8,
    /// Base height in height units.
    pub base_height: u8,
    pub invisible: bool,
}

impl CellContent {
    pub fn new(kind: ContentKind, rotation: u8, base_height: u8) -> Self {
        Self {
            kind,
            rotation: rotation % 4,
            base_height,
            invisible: false,
        }
    }
}

/// Per-tile element counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileCounts {
    pub total: u16,
    pub surfaces: u16,
    pub paths: u16,
    pub tracks: u16,
    pub small_scenery: u16,
    pub entrances: u16,
    pub walls: u16,
    pub large_scenery: u16,
    pub banners: u16,
}

impl TileCounts {
    /// Count one more element of the given kind.
    pub fn add(&mut self, kind: ContentKind) {
        self.total += 1;
        match kind {
            ContentKind::Surface => self.surfaces += 1,
            ContentKind::Path => self.paths += 1,
            ContentKind::Track => self.tracks += 1,
            ContentKind::SmallScenery => self.small_scenery += 1,
            ContentKind::Entrance => self.entrances += 1,
            ContentKind::Wall => self.walls += 1,
            ContentKind::LargeScenery => self.large_scenery += 1,
            ContentKind::Banner => self.banners += 1,
            ContentKind::Corrupt | ContentKind::Unknown(_) => {}
        }
    }
}

/// Identifies a kind of track piece; all pieces of one type share a waypoint route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackType(pub u16);

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Track data for one tile of a possibly multi-tile track piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSegmentInfo {
    pub track_type: TrackType,
    /// 0 marks the anchor tile; other values are continuation tiles.
    pub sequence_index: u8,
    /// Height offset of the track above the element, in world z coordinates.
    pub height_offset: i8,
    /// Tile holding sequence index 0 of the same piece.
    pub anchor: TileCoord,
    pub chain_lift: bool,
    pub cable_lift: bool,
    pub inverted: bool,
    pub normal_to_inverted: bool,
    pub inverted_to_normal: bool,
    pub main_colour: u8,
    pub additional_colour: u8,
    pub supports_colour: u8,
}

impl TrackSegmentInfo {
    /// Anchor-tile info for a single-tile piece.
    pub fn anchor_at(track_type: TrackType, anchor: TileCoord) -> Self {
        Self {
            track_type,
            sequence_index: 0,
            height_offset: 0,
            anchor,
            chain_lift: false,
            cable_lift: false,
            inverted: false,
            normal_to_inverted: false,
            inverted_to_normal: false,
            main_colour: 0,
            additional_colour: 0,
            supports_colour: 0,
        }
    }

    /// Continuation-tile info pointing back at its anchor.
    pub fn continuation(self, sequence_index: u8) -> Self {
        Self {
            sequence_index,
            ..self
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.sequence_index == 0
    }
}

/// Surface data for a path element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSurfaceInfo {
    pub surface_image: u32,
}

/// Terrain data for a surface element.
///
/// `slope` holds one raised-corner bit per compass corner plus
/// [`SurfaceInfo::DOUBLE_HEIGHT`], which lifts the corner opposite the
/// single lowered one by a second step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceInfo {
    pub slope: u8,
    /// Water level in base-height units. 0 is dry land.
    pub water_height: u8,
}

impl SurfaceInfo {
    pub const NORTH_UP: u8 = 0b0001;
    pub const EAST_UP: u8 = 0b0010;
    pub const SOUTH_UP: u8 = 0b0100;
    pub const WEST_UP: u8 = 0b1000;
    pub const ALL_CORNERS_UP: u8 = 0b1111;
    pub const DOUBLE_HEIGHT: u8 = 0b1_0000;
    /// Both of the corners on the east-west diagonal raised.
    pub const WEST_EAST_VALLEY: u8 = Self::EAST_UP | Self::WEST_UP;
    /// Base-height units one raised corner adds.
    pub const HEIGHT_STEP: u8 = 2;

    pub fn flat() -> Self {
        Self::default()
    }

    pub fn sloped(slope: u8) -> Self {
        Self {
            slope,
            water_height: 0,
        }
    }

    pub fn with_water(self, water_height: u8) -> Self {
        Self {
            water_height,
            ..self
        }
    }

    /// Height of one corner in base-height units, given the element's base.
    pub fn corner_height(&self, base_height: u8, corner: u8) -> i32 {
        let step = Self::HEIGHT_STEP as i32;
        let corners = self.slope & Self::ALL_CORNERS_UP;
        let mut height = base_height as i32;
        if corners & corner != 0 {
            height += step;
        }
        if self.slope & Self::DOUBLE_HEIGHT != 0 {
            // The corner opposite `corner` is the one two bits along the ring.
            let opposite = ((corner << 2) | (corner >> 2)) & Self::ALL_CORNERS_UP;
            if corners == Self::ALL_CORNERS_UP & !opposite {
                height += step;
            }
        }
        height
    }

    pub fn has_water(&self) -> bool {
        self.water_height > 0
    }
}

/// Placement data for a small scenery element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SceneryInfo {
    /// Occupies the whole tile rather than one quadrant.
    pub full_tile: bool,
    /// Quadrant 0..=3, used when `full_tile` is false.
    pub quadrant: u8,
}

impl SceneryInfo {
    pub fn full_tile() -> Self {
        Self {
            full_tile: true,
            quadrant: 0,
        }
    }

    pub fn in_quadrant(quadrant: u8) -> Self {
        Self {
            full_tile: false,
            quadrant: quadrant % 4,
        }
    }
}

/// One local sample along a track piece's route.
///
/// Coordinates are world coordinates relative to the anchor tile's corner:
/// 32 per tile horizontally, 8 per height unit vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// 32 yaw steps; 0 faces negative x.
    pub direction: u8,
    pub bank: u8,
    /// Vehicle sprite code.
    pub pitch: u8,
}

impl Waypoint {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    pub fn with_orientation(self, direction: u8, bank: u8, pitch: u8) -> Self {
        Self {
            direction,
            bank,
            pitch,
            ..self
        }
    }

    /// True when direction, bank and pitch are all equal.
    pub fn has_equal_rotation(a: &Waypoint, b: &Waypoint) -> bool {
        a.direction == b.direction && a.bank == b.bank && a.pitch == b.pitch
    }
}

/// Palette-indexed sprite pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpriteData {
    pub width: u16,
    pub height: u16,
    pub offset_x: i16,
    pub offset_y: i16,
    pub pixels: Vec<u8>,
}

impl SpriteData {
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Width times height. Zero when either dimension is zero.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_round_trips_known_codes() {
        assert_eq!(ContentKind::from_raw(2), ContentKind::Track);
        assert_eq!(ContentKind::from_raw(8), ContentKind::Corrupt);
    }

    #[test]
    fn content_kind_keeps_unknown_codes() {
        assert_eq!(ContentKind::from_raw(42), ContentKind::Unknown(42));
        assert_eq!(ContentKind::from_raw(42).name(), "unknown");
    }

    #[test]
    fn cell_content_wraps_rotation() {
        assert_eq!(CellContent::new(ContentKind::Wall, 6, 2).rotation, 2);
    }

    #[test]
    fn tile_counts_track_kinds() {
        let mut counts = TileCounts::default();
        counts.add(ContentKind::Surface);
        counts.add(ContentKind::Track);
        counts.add(ContentKind::Unknown(99));
        assert_eq!(counts.total, 3);
        assert_eq!(counts.surfaces, 1);
        assert_eq!(counts.tracks, 1);
    }

    #[test]
    fn equal_rotation_ignores_position() {
        let a = Waypoint::new(0, 0, 0).with_orientation(8, 1, 2);
        let b = Waypoint::new(31, 16, 8).with_orientation(8, 1, 2);
        let c = b.with_orientation(8, 0, 2);
        assert!(Waypoint::has_equal_rotation(&a, &b));
        assert!(!Waypoint::has_equal_rotation(&a, &c));
    }

    #[test]
    fn continuation_keeps_anchor() {
        let anchor = TrackSegmentInfo::anchor_at(TrackType(7), TileCoord::new(3, 3));
        let cont = anchor.continuation(2);
        assert!(anchor.is_anchor());
        assert!(!cont.is_anchor());
        assert_eq!(cont.anchor, TileCoord::new(3, 3));
    }

    #[test]
    fn single_corner_slope_raises_one_corner() {
        let info = SurfaceInfo::sloped(SurfaceInfo::NORTH_UP);
        assert_eq!(info.corner_height(4, SurfaceInfo::NORTH_UP), 6);
        assert_eq!(info.corner_height(4, SurfaceInfo::EAST_UP), 4);
        assert_eq!(info.corner_height(4, SurfaceInfo::SOUTH_UP), 4);
    }

    #[test]
    fn double_height_lifts_the_peak_twice() {
        // Everything but south raised: north is the peak.
        let slope = SurfaceInfo::NORTH_UP
            | SurfaceInfo::EAST_UP
            | SurfaceInfo::WEST_UP
            | SurfaceInfo::DOUBLE_HEIGHT;
        let info = SurfaceInfo::sloped(slope);
        assert_eq!(info.corner_height(2, SurfaceInfo::NORTH_UP), 6);
        assert_eq!(info.corner_height(2, SurfaceInfo::EAST_UP), 4);
        assert_eq!(info.corner_height(2, SurfaceInfo::WEST_UP), 4);
        assert_eq!(info.corner_height(2, SurfaceInfo::SOUTH_UP), 2);
    }

    #[test]
    fn scenery_quadrant_wraps() {
        assert_eq!(SceneryInfo::in_quadrant(6).quadrant, 2);
        assert!(SceneryInfo::full_tile().full_tile);
        assert!(!SurfaceInfo::flat().has_water());
    }
}
