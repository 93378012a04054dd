use std::time::{Duration, Instant};

/// Delay between the last keystroke and the analysis run
pub const DEFAULT_LINT_DELAY: Duration = Duration::from_millis(500);

/// Debounce and staleness bookkeeping for grammar analysis.
///
/// Every edit bumps a generation counter and re-arms a fixed delay; the
/// deadline only fires once typing has paused. At most one run is in flight
/// at a time, and a completion is fresh only if its captured generation still
/// equals the live counter — an edit made while the analyzer was running
/// makes the result stale on arrival.
///
/// The scheduler never blocks and owns no timer thread. The host polls it
/// with the current time, which also makes every timing scenario testable
/// with synthetic instants.
#[derive(Debug)]
pub struct LintScheduler {
    delay: Duration,
    generation: u64,
    deadline: Option<Instant>,
    in_flight: Option<u64>,
}

impl LintScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            deadline: None,
            in_flight: None,
        }
    }

    /// Record an edit: bump the generation and restart the debounce window
    pub fn note_edit(&mut self, now: Instant) {
        self.generation += 1;
        self.deadline = Some(now + self.delay);
    }

    /// Check whether an analysis run should start.
    ///
    /// Fires once the deadline has passed and no run is in flight, returning
    /// the generation the run is for. While a run is in flight the deadline
    /// stays armed, so an edit made mid-run schedules the follow-up run for
    /// after the current one completes.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }

        self.deadline = None;
        self.in_flight = Some(self.generation);
        Some(self.generation)
    }

    /// Record that the run for `generation` finished.
    ///
    /// Returns whether the result is fresh, i.e. no edit happened since the
    /// run started. Stale results must be discarded by the caller.
    pub fn complete(&mut self, generation: u64) -> bool {
        self.in_flight = None;
        generation == self.generation
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the next run would fire, if one is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True when nothing is scheduled and nothing is running
    pub fn is_idle(&self) -> bool {
        self.deadline.is_none() && self.in_flight.is_none()
    }
}

impl Default for LintScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_LINT_DELAY)
    }
}
