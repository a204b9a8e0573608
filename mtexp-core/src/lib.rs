pub mod cue;
pub mod grid;
pub mod phase;
pub mod record;
pub mod screen;
pub mod sink;

pub use cue::Cue;
pub use grid::{Grid, GridSpec, generate};
pub use phase::{Page, TrialPhase};
pub use record::{Answer, FormFields, RecordParseError, ResultRecord};
pub use screen::Screen;
pub use sink::{ExportError, ResultSink, SinkError, StimulusExport, StimulusKey};
