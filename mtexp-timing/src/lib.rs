pub mod clock;
pub mod ticks;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use ticks::{TickRecorder, TickStats};
