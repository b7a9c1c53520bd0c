use std::fmt;
use std::sync::Arc;

/// One element of a progress sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub label: Arc<str>,
    pub current: u32,
    pub total: u32,
    /// The host should refresh its progress surface for this element even if
    /// the update interval has not elapsed.
    pub flush: bool,
}

impl Progress {
    pub fn new(label: impl Into<Arc<str>>, current: u32, total: u32, flush: bool) -> Self {
        Self {
            label: label.into(),
            current: current.min(total),
            total,
            flush,
        }
    }

    /// Completed fraction in `0..=1`. An empty phase counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.label, self.current, self.total)
    }
}

/// Host-side progress surface.
pub trait ProgressSink {
    /// Show or refresh the surface.
    fn update(&mut self, progress: &Progress);
    /// Hide the surface once the run is over.
    fn hide(&mut self);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn update(&mut self, progress: &Progress) {
        (**self).update(progress);
    }

    fn hide(&mut self) {
        (**self).hide();
    }
}
