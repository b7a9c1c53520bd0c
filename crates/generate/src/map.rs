//! The map generation run.
//!
//! A run first snapshots every tile of the playable area ("Loading tiles..."),
//! then walks the area once per registered generator, in kind order. Each
//! visited cell produces one [`Progress`] element, so the whole run is a lazy
//! progress sequence that a [`CooperativeRunner`](parkscape_stream::CooperativeRunner)
//! can drive slice by slice.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parkscape_kernel::{ContentKind, SimulationProvider, TileCoord};
use parkscape_render::PlacementSink;
use parkscape_stream::{CellCoord, GridCursor, GridSize, Progress};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, SubpositionCache};
use crate::dispatch::{DispatchTable, TrackStyle};
use crate::error::GenerateError;
use crate::generators::CellContext;
use crate::snapshot::MapSnapshot;

const LOADING_LABEL: &str = "Loading tiles...";

/// Generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Leave out the one-tile border around the map.
    pub skip_border: bool,
    pub track_style: TrackStyle,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            skip_border: true,
            track_style: TrackStyle::default(),
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub tiles: u32,
    /// Elements handed to a generator.
    pub elements: u64,
    pub placements: BTreeMap<ContentKind, u64>,
    pub cache: CacheStats,
    pub elapsed: Duration,
    /// False when the run was stopped before its last cell.
    pub completed: bool,
}

impl GenerationReport {
    pub fn total_placements(&self) -> u64 {
        self.placements.values().sum()
    }
}

/// Runs the registered generators over a provider's map.
#[derive(Debug)]
pub struct MapGenerator {
    config: GenerationConfig,
    dispatch: DispatchTable,
}

impl MapGenerator {
    pub fn new(config: GenerationConfig, dispatch: DispatchTable) -> Self {
        Self { config, dispatch }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Start a run. Nothing is queried until the returned sequence is advanced.
    pub fn run<'a>(
        &'a mut self,
        provider: &'a dyn SimulationProvider,
        cache: &'a mut SubpositionCache,
        sink: &'a mut dyn PlacementSink,
    ) -> Generation<'a> {
        for kind in self.dispatch.kinds() {
            if let Some(generator) = self.dispatch.get_mut(kind) {
                generator.reset();
            }
        }
        let map = provider.map_size();
        let (origin, region) = if self.config.skip_border {
            (
                CellCoord::new(1, 1),
                GridSize::new(map.width.saturating_sub(2), map.height.saturating_sub(2)),
            )
        } else {
            (CellCoord::new(0, 0), GridSize::new(map.width, map.height))
        };

        let phases = self
            .dispatch
            .kinds()
            .into_iter()
            .filter_map(|kind| self.dispatch.get(kind).map(|g| (kind, g.label())))
            .collect();

        let span = tracing::info_span!(
            "generate_map",
            width = region.width,
            height = region.height
        );
        span.in_scope(|| {
            tracing::debug!(label = LOADING_LABEL, tiles = region.cell_count(), "phase started");
        });

        Generation {
            provider,
            cache,
            sink,
            dispatch: &mut self.dispatch,
            phases,
            origin,
            region,
            snapshot: MapSnapshot::new(origin, region),
            phase: Phase::Loading(GridCursor::new(LOADING_LABEL, region).with_origin(origin)),
            report: GenerationReport::default(),
            error: None,
            started: Instant::now(),
            span,
        }
    }
}

enum Phase {
    Loading(GridCursor),
    Generating { slot: usize, cursor: GridCursor },
    Done,
}

/// A generation run in progress: a lazy sequence of progress elements, one per
/// visited cell across all phases.
///
/// The sequence ends early when a generator fails; [`Generation::finish`]
/// then returns the error. Placements emitted before the failure stay emitted.
pub struct Generation<'a> {
    provider: &'a dyn SimulationProvider,
    cache: &'a mut SubpositionCache,
    sink: &'a mut dyn PlacementSink,
    dispatch: &'a mut DispatchTable,
    phases: Vec<(ContentKind, Arc<str>)>,
    origin: CellCoord,
    region: GridSize,
    snapshot: MapSnapshot,
    phase: Phase,
    report: GenerationReport,
    error: Option<GenerateError>,
    started: Instant,
    span: tracing::Span,
}

impl Generation<'_> {
    pub fn snapshot(&self) -> &MapSnapshot {
        &self.snapshot
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// The run's outcome. A run that has not reached its end reports
    /// `completed: false`.
    pub fn finish(self) -> Result<GenerationReport, GenerateError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut report = self.report;
        report.cache = self.cache.stats();
        if !report.completed {
            report.elapsed = self.started.elapsed();
        }
        Ok(report)
    }

    fn start_phase(&mut self, slot: usize) {
        let Some((kind, label)) = self.phases.get(slot).cloned() else {
            self.complete();
            return;
        };
        tracing::debug!(kind = kind.name(), %label, "phase started");
        let cursor = GridCursor::new(label, self.region).with_origin(self.origin);
        self.phase = Phase::Generating { slot, cursor };
    }

    /// Let the generator of a finished walk emit what it gathered.
    fn finish_phase(&mut self, slot: usize) {
        let kind = self.phases[slot].0;
        let Some(generator) = self.dispatch.get_mut(kind) else {
            return;
        };
        let placed = generator.finish(&mut *self.sink);
        if placed > 0 {
            *self.report.placements.entry(kind).or_default() += placed as u64;
            tracing::debug!(kind = kind.name(), placed, "phase flushed");
        }
    }

    fn generate_cell(&mut self, slot: usize, cell: CellCoord) -> Result<(), GenerateError> {
        let kind = self.phases[slot].0;
        let Some(generator) = self.dispatch.get_mut(kind) else {
            return Ok(());
        };
        let Some(elements) = self.snapshot.tile(cell.x, cell.y) else {
            return Ok(());
        };

        let tile = TileCoord::new(cell.x, cell.y);
        let mut ctx = CellContext {
            provider: self.provider,
            cache: &mut *self.cache,
            sink: &mut *self.sink,
            snapshot: &self.snapshot,
        };
        for element in elements.iter().filter(|e| e.content.kind == kind) {
            let placed = generator.generate(&mut ctx, tile, element)?;
            self.report.elements += 1;
            *self.report.placements.entry(kind).or_default() += placed as u64;
        }
        Ok(())
    }

    fn fail(&mut self, err: GenerateError) {
        self.report.elapsed = self.started.elapsed();
        tracing::error!(error = %err, elapsed = ?self.report.elapsed, "map generation halted");
        self.error = Some(err);
        self.phase = Phase::Done;
    }

    fn complete(&mut self) {
        self.report.elapsed = self.started.elapsed();
        self.report.completed = true;
        self.phase = Phase::Done;
        tracing::info!(
            tiles = self.report.tiles,
            placements = self.report.total_placements(),
            elapsed = ?self.report.elapsed,
            "map generation complete"
        );
    }
}

impl Iterator for Generation<'_> {
    type Item = Progress;

    fn next(&mut self) -> Option<Progress> {
        let span = self.span.clone();
        let _guard = span.enter();

        loop {
            let (slot, cell, progress) = match &mut self.phase {
                Phase::Loading(cursor) => match cursor.advance() {
                    Some((cell, progress)) => (None, cell, progress),
                    None => {
                        self.start_phase(0);
                        continue;
                    }
                },
                Phase::Generating { slot, cursor } => {
                    let slot = *slot;
                    match cursor.advance() {
                        Some((cell, progress)) => (Some(slot), cell, progress),
                        None => {
                            self.finish_phase(slot);
                            self.start_phase(slot + 1);
                            continue;
                        }
                    }
                }
                Phase::Done => return None,
            };

            match slot {
                None => {
                    self.snapshot.load_tile(self.provider, cell);
                    self.report.tiles += 1;
                }
                Some(slot) => {
                    if let Err(err) = self.generate_cell(slot, cell) {
                        self.fail(err);
                        return None;
                    }
                }
            }
            tracing::trace!(%progress, "cell done");
            return Some(progress);
        }
    }
}
