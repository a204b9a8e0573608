use crate::grid::Grid;

/// What the host should draw on the current tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen<'a> {
    /// Between trials. `last_correct` is unset before the first trial.
    Greeting { last_correct: Option<bool> },
    /// Fixation frame during the pre- and post-delay
    Blank,
    Stimulus { trial_index: u64, grid: &'a Grid },
    Response { trial_index: u64, question: &'a str },
    Done,
}

impl Screen<'_> {
    /// Operator-facing text for this screen
    pub fn prompt(&self) -> String {
        match self {
            Screen::Greeting { last_correct } => match last_correct {
                Some(true) => "Correct! Press space for next".to_string(),
                Some(false) => "Incorrect! Press space for next".to_string(),
                None => "Press space for next".to_string(),
            },
            Screen::Blank | Screen::Stimulus { .. } => String::new(),
            Screen::Response {
                trial_index,
                question,
            } => format!("Experiment #{trial_index}: {question} Press 1 (yes) or 2 (no)"),
            Screen::Done => "Thank you!".to_string(),
        }
    }

    pub fn shows_stimulus(&self) -> bool {
        matches!(self, Screen::Stimulus { .. })
    }
}
