use std::cell::Cell;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::progress::{Progress, ProgressSink};

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum time between two yields that are not forced by a flush element.
    #[serde(rename = "update_interval_ms", with = "millis")]
    pub update_interval: Duration,
    /// Number of recent slices kept by the runner's [`FrameTimer`].
    pub timer_history: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(250),
            timer_history: 64,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Source of monotonic time for the runner.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Shared by reference, so a test can
/// advance it from inside the sequence being run.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Lifecycle of a [`CooperativeRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunnerState {
    pub fn is_finished(self) -> bool {
        matches!(self, RunnerState::Completed | RunnerState::Aborted)
    }
}

/// Outcome of one [`CooperativeRunner::resume`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slice {
    /// The runner handed control back; the sequence has more to do.
    Yielded(Progress),
    /// The sequence is exhausted, or the run was aborted.
    Completed,
}

/// Totals for a finished or aborted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunnerState,
    pub slices: usize,
    pub elements: u64,
    pub last: Option<Progress>,
    pub average_slice: Duration,
    pub longest_slice: Duration,
}

/// Drives a progress sequence in time-boxed slices.
///
/// Each [`resume`](Self::resume) pulls elements until one flushes or the
/// update interval has elapsed since the last yield, reports that element to
/// the sink and returns. Once the sequence is exhausted the sink is hidden.
pub struct CooperativeRunner<I, C = MonotonicClock> {
    sequence: I,
    clock: C,
    config: SchedulerConfig,
    state: RunnerState,
    last_yield: Duration,
    slices: usize,
    elements: u64,
    last: Option<Progress>,
    timer: FrameTimer,
}

impl<I> CooperativeRunner<I, MonotonicClock>
where
    I: Iterator<Item = Progress>,
{
    pub fn with_wall_clock(sequence: I, config: SchedulerConfig) -> Self {
        Self::new(sequence, MonotonicClock::new(), config)
    }
}

impl<I, C> CooperativeRunner<I, C>
where
    I: Iterator<Item = Progress>,
    C: Clock,
{
    pub fn new(sequence: I, clock: C, config: SchedulerConfig) -> Self {
        Self {
            sequence,
            clock,
            timer: FrameTimer::new(config.timer_history),
            config,
            state: RunnerState::Idle,
            last_yield: Duration::ZERO,
            slices: 0,
            elements: 0,
            last: None,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Run one slice.
    pub fn resume(&mut self, sink: &mut impl ProgressSink) -> Slice {
        match self.state {
            RunnerState::Completed | RunnerState::Aborted => return Slice::Completed,
            RunnerState::Idle => {
                self.state = RunnerState::Running;
                self.last_yield = self.clock.now();
                tracing::debug!("cooperative run started");
            }
            RunnerState::Running => {}
        }

        let slice_start = self.clock.now();
        loop {
            let Some(progress) = self.sequence.next() else {
                self.timer.record(self.clock.now().saturating_sub(slice_start));
                self.state = RunnerState::Completed;
                sink.hide();
                tracing::debug!(
                    slices = self.slices,
                    elements = self.elements,
                    "cooperative run completed"
                );
                return Slice::Completed;
            };

            self.elements += 1;
            let now = self.clock.now();
            let due = now.saturating_sub(self.last_yield) >= self.config.update_interval;
            if progress.flush || due {
                self.last_yield = now;
                self.slices += 1;
                self.timer.record(now.saturating_sub(slice_start));
                sink.update(&progress);
                tracing::trace!(%progress, flush = progress.flush, "slice yielded");
                self.last = Some(progress.clone());
                return Slice::Yielded(progress);
            }
        }
    }

    /// Stop the run and hide the progress surface. Work already done stays done.
    pub fn abort(&mut self, sink: &mut impl ProgressSink) {
        if self.state.is_finished() {
            return;
        }
        self.state = RunnerState::Aborted;
        sink.hide();
        tracing::debug!(elements = self.elements, "cooperative run aborted");
    }

    /// Resume until the sequence is exhausted.
    pub fn run_to_completion(&mut self, sink: &mut impl ProgressSink) -> RunSummary {
        while let Slice::Yielded(_) = self.resume(sink) {}
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.state,
            slices: self.slices,
            elements: self.elements,
            last: self.last.clone(),
            average_slice: self.timer.average(),
            longest_slice: self.timer.max(),
        }
    }

    /// Give back the wrapped sequence.
    pub fn into_inner(self) -> I {
        self.sequence
    }
}

/// Ring buffer of recent slice durations.
#[derive(Debug)]
pub struct FrameTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn recorded(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let recorded = self.recorded();
        if recorded.is_empty() {
            return Duration::ZERO;
        }
        recorded.iter().sum::<Duration>() / recorded.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        if self.filled { self.capacity } else { self.index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridCursor, GridSize};

    #[derive(Default)]
    struct RecordingSink {
        updates: Vec<Progress>,
        hidden: usize,
    }

    impl ProgressSink for RecordingSink {
        fn update(&mut self, progress: &Progress) {
            self.updates.push(progress.clone());
        }

        fn hide(&mut self) {
            self.hidden += 1;
        }
    }

    fn walk(width: u32, height: u32) -> impl Iterator<Item = Progress> {
        GridCursor::new("walk", GridSize::new(width, height)).map(|(_, p)| p)
    }

    fn step_config() -> SchedulerConfig {
        SchedulerConfig {
            update_interval: Duration::from_millis(250),
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn yields_on_flush_and_interval() {
        let clock = ManualClock::new();
        let sequence = walk(10, 1).inspect(|_| clock.advance(Duration::from_millis(100)));
        let mut runner = CooperativeRunner::new(sequence, &clock, step_config());
        let mut sink = RecordingSink::default();

        let summary = runner.run_to_completion(&mut sink);
        let yielded: Vec<u32> = sink.updates.iter().map(|p| p.current).collect();
        assert_eq!(yielded, vec![1, 4, 7, 10]);
        assert_eq!(summary.state, RunnerState::Completed);
        assert_eq!(summary.slices, 4);
        assert_eq!(summary.elements, 10);
        assert_eq!(summary.last.map(|p| p.current), Some(10));
        assert_eq!(sink.hidden, 1);
    }

    #[test]
    fn frozen_clock_only_yields_flush_elements() {
        let clock = ManualClock::new();
        let mut runner = CooperativeRunner::new(walk(5, 5), &clock, step_config());
        let mut sink = RecordingSink::default();
        runner.run_to_completion(&mut sink);
        let yielded: Vec<u32> = sink.updates.iter().map(|p| p.current).collect();
        assert_eq!(yielded, vec![1, 25]);
    }

    #[test]
    fn resume_walks_through_states() {
        let clock = ManualClock::new();
        let mut runner = CooperativeRunner::new(walk(3, 1), &clock, step_config());
        let mut sink = RecordingSink::default();
        assert_eq!(runner.state(), RunnerState::Idle);

        assert!(matches!(runner.resume(&mut sink), Slice::Yielded(p) if p.current == 1));
        assert_eq!(runner.state(), RunnerState::Running);
        assert!(matches!(runner.resume(&mut sink), Slice::Yielded(p) if p.current == 3));
        assert_eq!(runner.resume(&mut sink), Slice::Completed);
        assert_eq!(runner.state(), RunnerState::Completed);
        assert_eq!(runner.resume(&mut sink), Slice::Completed);
        assert_eq!(sink.hidden, 1);
    }

    #[test]
    fn empty_sequence_completes_immediately() {
        let clock = ManualClock::new();
        let mut runner = CooperativeRunner::new(walk(0, 0), &clock, step_config());
        let mut sink = RecordingSink::default();
        assert_eq!(runner.resume(&mut sink), Slice::Completed);
        assert!(sink.updates.is_empty());
        assert_eq!(sink.hidden, 1);
    }

    #[test]
    fn abort_hides_and_stops() {
        let clock = ManualClock::new();
        let mut runner = CooperativeRunner::new(walk(4, 4), &clock, step_config());
        let mut sink = RecordingSink::default();
        runner.resume(&mut sink);
        runner.abort(&mut sink);
        assert_eq!(runner.state(), RunnerState::Aborted);
        assert_eq!(runner.resume(&mut sink), Slice::Completed);
        runner.abort(&mut sink);
        assert_eq!(sink.hidden, 1);
        assert_eq!(sink.updates.len(), 1);

        // The rest of the sequence is still there.
        assert_eq!(runner.into_inner().count(), 15);
    }

    #[test]
    fn slices_are_timed() {
        let clock = ManualClock::new();
        let sequence = walk(4, 1).inspect(|_| clock.advance(Duration::from_millis(100)));
        let mut runner = CooperativeRunner::new(sequence, &clock, step_config());
        let summary = runner.run_to_completion(&mut RecordingSink::default());
        assert!(summary.longest_slice >= Duration::from_millis(100));
        assert!(runner.timer().count() >= summary.slices);
    }

    #[test]
    fn config_defaults_and_json() {
        assert_eq!(SchedulerConfig::default().update_interval, Duration::from_millis(250));

        let config: SchedulerConfig = serde_json::from_str(r#"{ "update_interval_ms": 40 }"#).unwrap();
        assert_eq!(config.update_interval, Duration::from_millis(40));
        assert_eq!(config.timer_history, 64);

        let json = serde_json::to_value(SchedulerConfig::default()).unwrap();
        assert_eq!(json["update_interval_ms"], 250);
    }

    #[test]
    fn frame_timer_tracks_history() {
        let mut timer = FrameTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
    }

    #[test]
    fn frame_timer_wraps_around() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
    }
}
