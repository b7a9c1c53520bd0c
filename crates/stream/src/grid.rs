use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::progress::Progress;

/// A cell coordinate on the simulation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height of a walked region, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> u32 {
        self.width.saturating_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

/// Row-major cursor over a rectangular region.
///
/// Every visited cell produces a [`Progress`] whose `current` is the number
/// of cells visited so far. The first and last cells flush.
#[derive(Debug, Clone)]
pub struct GridCursor {
    label: Arc<str>,
    size: GridSize,
    origin: CellCoord,
    visited: u32,
}

impl GridCursor {
    pub fn new(label: impl Into<Arc<str>>, size: GridSize) -> Self {
        Self {
            label: label.into(),
            size,
            origin: CellCoord::new(0, 0),
            visited: 0,
        }
    }

    /// Offset every produced coordinate by `origin`.
    pub fn with_origin(mut self, origin: CellCoord) -> Self {
        self.origin = origin;
        self
    }

    pub fn label(&self) -> &Arc<str> {
        &self.label
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn remaining(&self) -> u32 {
        self.size.cell_count() - self.visited
    }

    pub fn advance(&mut self) -> Option<(CellCoord, Progress)> {
        let total = self.size.cell_count();
        if self.visited >= total {
            return None;
        }
        let index = self.visited;
        self.visited += 1;

        let cell = CellCoord::new(
            self.origin.x + (index % self.size.width) as i32,
            self.origin.y + (index / self.size.width) as i32,
        );
        let flush = self.visited == 1 || self.visited == total;
        let progress = Progress {
            label: Arc::clone(&self.label),
            current: self.visited,
            total,
            flush,
        };
        Some((cell, progress))
    }
}

impl Iterator for GridCursor {
    type Item = (CellCoord, Progress);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining() as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridCursor {}
impl FusedIterator for GridCursor {}

/// A grid cursor that runs a fallible callback for each cell before producing
/// the cell's progress element.
///
/// The first `Err` is produced once; the walk is exhausted afterwards.
pub struct GridWalk<F, E> {
    cursor: GridCursor,
    callback: F,
    failed: bool,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> GridWalk<F, E>
where
    F: FnMut(CellCoord) -> Result<(), E>,
{
    pub fn new(label: impl Into<Arc<str>>, size: GridSize, callback: F) -> Self {
        Self::from_cursor(GridCursor::new(label, size), callback)
    }

    pub fn from_cursor(cursor: GridCursor, callback: F) -> Self {
        Self {
            cursor,
            callback,
            failed: false,
            _error: PhantomData,
        }
    }

    pub fn label(&self) -> &Arc<str> {
        self.cursor.label()
    }
}

impl<F, E> Iterator for GridWalk<F, E>
where
    F: FnMut(CellCoord) -> Result<(), E>,
{
    type Item = Result<Progress, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (cell, progress) = self.cursor.advance()?;
        match (self.callback)(cell) {
            Ok(()) => Some(Ok(progress)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl<F, E> FusedIterator for GridWalk<F, E> where F: FnMut(CellCoord) -> Result<(), E> {}
