//! Grid walks and cooperative scheduling.
//!
//! A generation run is a lazy sequence of [`Progress`] elements, one per grid
//! cell. The host drives the sequence through a [`CooperativeRunner`], which
//! hands control back between cells whenever a flush element arrives or the
//! update interval has elapsed.
//!
//! # Invariants
//! - Cells are visited row-major: `y` outer, `x` inner.
//! - `current` never exceeds `total`; the first and last elements of a walk flush.
//! - Suspension only happens between cells.

mod grid;
mod progress;
mod scheduler;

pub use grid::{CellCoord, GridCursor, GridSize, GridWalk};
pub use progress::{Progress, ProgressSink};
pub use scheduler::{
    Clock, CooperativeRunner, FrameTimer, ManualClock, MonotonicClock, RunSummary,
    RunnerState, SchedulerConfig, Slice,
};
