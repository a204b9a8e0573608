use crate::config::Identity;
use mtexp_core::{Answer, ResultRecord, ResultSink, SinkError};
use std::time::Duration;
use tracing::{error, info};

/// Builds a [`ResultRecord`] per completed trial and pushes it to the sink
#[derive(Debug)]
pub struct ResultRecorder<S> {
    sink: S,
    last_index: Option<u64>,
    emitted: usize,
}

impl<S: ResultSink> ResultRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last_index: None,
            emitted: 0,
        }
    }

    /// Synchronously persists one record. A sink failure is returned to the
    /// caller and must end the run.
    pub fn emit(
        &mut self,
        identity: &Identity,
        trial_index: u64,
        expected: bool,
        response: Answer,
        display_time: Duration,
    ) -> Result<ResultRecord, SinkError> {
        debug_assert!(
            self.last_index.is_none_or(|last| last < trial_index),
            "trial {trial_index} recorded twice"
        );

        let record = ResultRecord {
            experiment_id: identity.experiment_id.clone(),
            epoch: identity.epoch,
            trial_index,
            expected: Answer::from(expected),
            response,
            display_time,
        };

        if let Err(e) = self.sink.emit(&record) {
            error!(trial = trial_index, "failed to persist result: {e}");
            return Err(e);
        }

        self.last_index = Some(trial_index);
        self.emitted += 1;
        info!(
            trial = trial_index,
            correct = record.is_correct(),
            display_time = %record.display_seconds(),
            "result recorded"
        );
        Ok(record)
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
