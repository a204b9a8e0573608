//! Collaborator interfaces the session hands its output to.

use crate::grid::Grid;
use crate::record::ResultRecord;
use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A result that could not be persisted. Always fatal to the run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write results to {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to submit results to {endpoint}: {source}")]
    Submit {
        endpoint: String,
        #[source]
        source: BoxError,
    },
    #[error("results endpoint {endpoint} answered {status}")]
    Rejected { endpoint: String, status: u16 },
}

/// Destination for completed trial records
pub trait ResultSink {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError>;
}

impl ResultSink for Vec<ResultRecord> {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        (**self).emit(record)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        (**self).emit(record)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to rasterise stimulus: {0}")]
    Render(String),
    #[error("failed to write stimulus image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Identifies an exported stimulus image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StimulusKey {
    pub experiment_id: String,
    pub epoch: i64,
    pub trial_index: u64,
}

/// Audit copy of each generated stimulus. Never read back.
pub trait StimulusExport {
    fn export(&mut self, key: &StimulusKey, grid: &Grid) -> Result<(), ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Answer;
    use std::time::Duration;

    #[test]
    fn boxed_sink_forwards() {
        let record = ResultRecord {
            experiment_id: "e".into(),
            epoch: 1,
            trial_index: 1,
            expected: Answer::Yes,
            response: Answer::Yes,
            display_time: Duration::from_millis(90),
        };
        let mut records: Vec<ResultRecord> = Vec::new();
        {
            let mut boxed: Box<dyn ResultSink + '_> = Box::new(&mut records);
            boxed.emit(&record).expect("emit");
        }
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn sink_errors_name_their_destination() {
        let err = SinkError::Rejected {
            endpoint: "https://example.test/post".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "results endpoint https://example.test/post answered 503"
        );
    }
}
