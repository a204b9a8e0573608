use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Summary of the host's polling cadence
#[derive(Debug, Clone, PartialEq)]
pub struct TickStats {
    pub average_interval_ns: f64,
    pub jitter_ns: f64,
    pub min_interval_ns: f64,
    pub max_interval_ns: f64,
    pub effective_hz: f64,
    pub samples: usize,
}

impl TickStats {
    /// Upper bound on how late a phase boundary can be observed.
    ///
    /// Phases are sampled, not event driven: a boundary that falls between
    /// two ticks is only seen on the later one, so the worst observed tick
    /// interval bounds the error on every measured phase duration.
    pub fn phase_precision(&self) -> Duration {
        Duration::from_nanos(self.max_interval_ns as u64)
    }
}

/// Rolling record of intervals between host ticks
#[derive(Debug, Clone)]
pub struct TickRecorder {
    last_tick: Option<Instant>,
    intervals: VecDeque<Duration>,
    max_samples: usize,
}

impl TickRecorder {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            last_tick: None,
            intervals: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    /// Records a tick at `now`, returning the interval since the previous one
    pub fn record_tick(&mut self, now: Instant) -> Option<Duration> {
        let interval = self
            .last_tick
            .map(|last| now.saturating_duration_since(last));
        self.last_tick = Some(now);

        if let Some(interval) = interval {
            if self.intervals.len() >= self.max_samples {
                self.intervals.pop_front();
            }
            self.intervals.push_back(interval);
        }
        interval
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn stats(&self) -> TickStats {
        if self.intervals.is_empty() {
            return TickStats {
                average_interval_ns: 0.0,
                jitter_ns: 0.0,
                min_interval_ns: 0.0,
                max_interval_ns: 0.0,
                effective_hz: 0.0,
                samples: 0,
            };
        }

        let times: Vec<f64> = self
            .intervals
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        TickStats {
            average_interval_ns: avg,
            jitter_ns: var.sqrt(),
            min_interval_ns: min,
            max_interval_ns: max,
            effective_hz: if avg > 0.0 { 1e9 / avg } else { 0.0 },
            samples: times.len(),
        }
    }
}

impl Default for TickRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_no_interval() {
        let mut ticks = TickRecorder::new();
        assert_eq!(ticks.record_tick(Instant::now()), None);
        assert!(ticks.is_empty());
        assert_eq!(ticks.stats().samples, 0);
    }

    #[test]
    fn steady_cadence_has_no_jitter() {
        let mut ticks = TickRecorder::new();
        let start = Instant::now();
        for i in 0..10 {
            ticks.record_tick(start + Duration::from_millis(16 * i));
        }

        let stats = ticks.stats();
        assert_eq!(stats.samples, 9);
        assert!((stats.average_interval_ns - 16e6).abs() < 1.0);
        assert!(stats.jitter_ns < 1.0);
        assert!((stats.effective_hz - 62.5).abs() < 0.01);
        assert_eq!(stats.phase_precision(), Duration::from_millis(16));
    }

    #[test]
    fn stalled_tick_widens_phase_precision() {
        let mut ticks = TickRecorder::new();
        let start = Instant::now();
        ticks.record_tick(start);
        ticks.record_tick(start + Duration::from_millis(16));
        ticks.record_tick(start + Duration::from_millis(116));

        let stats = ticks.stats();
        assert_eq!(stats.phase_precision(), Duration::from_millis(100));
        assert_eq!(stats.min_interval_ns, 16e6);
    }

    #[test]
    fn window_is_bounded() {
        let mut ticks = TickRecorder::with_capacity(4);
        let start = Instant::now();
        for i in 0..20 {
            ticks.record_tick(start + Duration::from_millis(i));
        }
        assert_eq!(ticks.len(), 4);
    }
}
