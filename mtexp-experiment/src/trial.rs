use crate::config::ExperimentConfig;
use crate::timer::{Frame, TrialDurations, TrialTimer};
use mtexp_core::{Answer, Grid, TrialPhase};
use rand::Rng;
use std::time::{Duration, Instant};

/// One stimulus presentation plus the state needed to score it
#[derive(Debug, Clone)]
pub struct Trial {
    pub index: u64,
    grid: Grid,
    expected: bool,
    question: String,
    timer: TrialTimer,
}

impl Trial {
    pub fn new(index: u64, grid: Grid, expected: bool, question: String, durations: TrialDurations) -> Self {
        Self {
            index,
            grid,
            expected,
            question,
            timer: TrialTimer::new(durations),
        }
    }

    /// Draws a fresh grid for trial `index`
    pub fn generate<R: Rng + ?Sized>(
        index: u64,
        config: &ExperimentConfig,
        place_target: bool,
        rng: &mut R,
    ) -> Self {
        let (grid, expected) = mtexp_core::generate(&config.grid, place_target, rng);
        Self::new(index, grid, expected, config.question.clone(), config.durations)
    }

    pub fn poll(&mut self, now: Instant) -> Frame {
        self.timer.poll(now)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn expected(&self) -> bool {
        self.expected
    }

    pub fn expected_answer(&self) -> Answer {
        Answer::from(self.expected)
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn timer(&self) -> &TrialTimer {
        &self.timer
    }

    pub fn phase(&self) -> TrialPhase {
        self.timer.phase()
    }

    pub fn is_done(&self) -> bool {
        self.timer.is_done()
    }

    pub fn measured_display_time(&self) -> Option<Duration> {
        self.timer.measured_display_time()
    }

    pub fn is_correct(&self, response: Answer) -> bool {
        response == self.expected_answer()
    }
}
