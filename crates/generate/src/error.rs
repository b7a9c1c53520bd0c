use parkscape_assets::AssetError;
use parkscape_kernel::{TileCoord, TrackType};

/// Errors that stop a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("track piece at {cell} (type {track_type}) has no anchor at {anchor}")]
    MissingAnchor {
        cell: TileCoord,
        anchor: TileCoord,
        track_type: TrackType,
    },
    #[error("track element {index} at {cell} has no track data")]
    MissingTrackInfo { cell: TileCoord, index: usize },
    #[error("path element {index} at {cell} has no surface data")]
    MissingPathInfo { cell: TileCoord, index: usize },
    #[error("surface element {index} at {cell} has no terrain data")]
    MissingSurfaceInfo { cell: TileCoord, index: usize },
}
