pub mod config;
pub mod recorder;
pub mod session;
pub mod sinks;
pub mod timer;
pub mod trial;

pub use config::{ConfigError, ExperimentConfig, Identity};
pub use recorder::ResultRecorder;
pub use session::{Input, SessionFlow, SessionState};
pub use sinks::{DEFAULT_ENDPOINT, FileSink, HttpSink};
pub use timer::{Frame, TrialDurations, TrialTimer, TrialTimestamps};
pub use trial::Trial;
