use crate::timer::TrialDurations;
use mtexp_core::GridSpec;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_QUESTION: &str = "Was there a red vertical line?";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stimulus grid {width}x{height} has no cells")]
    EmptyGrid { width: usize, height: usize },
    #[error("images directory {0} does not exist or is not a directory")]
    ImagesDirectory(PathBuf),
    #[error("invalid results endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },
}

/// Fixed protocol parameters for every trial of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub grid: GridSpec,
    pub durations: TrialDurations,
    pub question: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            durations: TrialDurations::default(),
            question: DEFAULT_QUESTION.to_string(),
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.cell_count() == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.grid.width,
                height: self.grid.height,
            });
        }
        Ok(())
    }
}

/// Opaque run identity stamped on every record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub experiment_id: String,
    pub epoch: i64,
}

impl Identity {
    pub fn new(experiment_id: impl Into<String>, epoch: i64) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            epoch,
        }
    }

    /// Stamps the run with the current wall-clock second
    pub fn at_startup(experiment_id: impl Into<String>) -> Self {
        Self::new(experiment_id, chrono::Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_match_protocol() {
        let config = ExperimentConfig::default();
        assert_eq!(config.grid.width, 8);
        assert_eq!(config.grid.height, 8);
        assert_eq!(config.grid.distractor_count, 5);
        assert_eq!(config.durations.pre_delay, Duration::from_millis(500));
        assert_eq!(config.durations.display_time, Duration::from_millis(90));
        assert_eq!(config.durations.post_delay, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_grid_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.grid.height = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyGrid {
                width: 8,
                height: 0
            })
        ));
    }

    #[test]
    fn startup_epoch_is_recent() {
        let identity = Identity::at_startup("pilot");
        assert_eq!(identity.experiment_id, "pilot");
        assert!(identity.epoch > 1_600_000_000);
    }
}
