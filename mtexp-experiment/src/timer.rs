use mtexp_core::TrialPhase;
use std::time::{Duration, Instant};
use tracing::debug;

/// Nominal length of each timed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialDurations {
    pub pre_delay: Duration,
    pub display_time: Duration,
    pub post_delay: Duration,
}

impl Default for TrialDurations {
    fn default() -> Self {
        Self {
            pre_delay: Duration::from_millis(500),
            display_time: Duration::from_millis(90),
            post_delay: Duration::from_millis(100),
        }
    }
}

impl TrialDurations {
    pub fn total(&self) -> Duration {
        self.pre_delay + self.display_time + self.post_delay
    }
}

/// Instants at which each phase was first observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialTimestamps {
    pub start: Option<Instant>,
    pub display_start: Option<Instant>,
    pub post_start: Option<Instant>,
    pub done: Option<Instant>,
    /// Actual stimulus dwell as seen by the polling cadence
    pub measured_display: Option<Duration>,
}

/// What the host draws for a trial on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Fixation only
    Blank,
    Stimulus,
}

/// Phase machine for one trial, driven by `poll(now)` once per host tick.
///
/// Every phase deadline counts from the tick on which that phase was
/// actually entered, and at most one phase boundary is crossed per poll.
/// This departs from fixed offsets off the start instant
/// (`start + pre_delay`, `start + pre_delay + display_time`, ...): with fixed
/// offsets a late entry into the display phase would eat into the display
/// window. At a 16 ms cadence with the default durations the stimulus goes
/// up at 512 ms, comes down at 608 ms (96 ms shown, not 80 ms) and the trial
/// ends at 720 ms instead of 704 ms.
/// A late tick therefore delays a phase but never truncates or skips it:
/// the stimulus is always drawn on at least one tick and the measured
/// display time is never below the nominal one. Each boundary is observed
/// up to one tick interval late, so that interval bounds the error on every
/// measured duration.
#[derive(Debug, Clone)]
pub struct TrialTimer {
    durations: TrialDurations,
    timestamps: TrialTimestamps,
    phase: TrialPhase,
    last_poll: Option<Instant>,
}

impl TrialTimer {
    pub fn new(durations: TrialDurations) -> Self {
        Self {
            durations,
            timestamps: TrialTimestamps::default(),
            phase: TrialPhase::NotStarted,
            last_poll: None,
        }
    }

    pub fn poll(&mut self, now: Instant) -> Frame {
        debug_assert!(
            self.last_poll.is_none_or(|last| now >= last),
            "trial timer polled with a clock reading earlier than the previous one"
        );
        self.last_poll = Some(now);

        let due = match self.phase {
            TrialPhase::NotStarted => true,
            TrialPhase::Done => false,
            _ => self.deadline().is_some_and(|deadline| now >= deadline),
        };
        if due {
            self.advance(now);
        }

        if self.phase.shows_stimulus() {
            Frame::Stimulus
        } else {
            Frame::Blank
        }
    }

    fn deadline(&self) -> Option<Instant> {
        let ts = &self.timestamps;
        match self.phase {
            TrialPhase::PreDelay => ts.start.map(|t| t + self.durations.pre_delay),
            TrialPhase::Displaying => ts.display_start.map(|t| t + self.durations.display_time),
            TrialPhase::PostDelay => ts.post_start.map(|t| t + self.durations.post_delay),
            TrialPhase::NotStarted | TrialPhase::Done => None,
        }
    }

    fn advance(&mut self, now: Instant) {
        let Some(next) = self.phase.next() else {
            return;
        };
        let ts = &mut self.timestamps;
        match next {
            TrialPhase::PreDelay => {
                ts.start = Some(now);
                debug!("pre-delay");
            }
            TrialPhase::Displaying => {
                ts.display_start = Some(now);
                debug!("stimulus on");
            }
            TrialPhase::PostDelay => {
                ts.post_start = Some(now);
                if ts.measured_display.is_none() {
                    let shown_at = ts.display_start.unwrap_or(now);
                    let measured = now.saturating_duration_since(shown_at);
                    ts.measured_display = Some(measured);
                    debug!(
                        measured_ms = measured.as_secs_f64() * 1e3,
                        nominal_ms = self.durations.display_time.as_secs_f64() * 1e3,
                        "post-delay"
                    );
                }
            }
            TrialPhase::Done => {
                ts.done = Some(now);
                debug!("trial timer done");
            }
            TrialPhase::NotStarted => {}
        }
        self.phase = next;
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn durations(&self) -> &TrialDurations {
        &self.durations
    }

    pub fn timestamps(&self) -> &TrialTimestamps {
        &self.timestamps
    }

    pub fn measured_display_time(&self) -> Option<Duration> {
        self.timestamps.measured_display
    }
}
