use std::fmt;

/// Phases of a single trial, in the order they are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TrialPhase {
    #[default]
    NotStarted,
    PreDelay,
    Displaying,
    PostDelay,
    Done,
}

impl TrialPhase {
    pub fn next(&self) -> Option<Self> {
        use TrialPhase::*;
        Some(match self {
            NotStarted => PreDelay,
            PreDelay => Displaying,
            Displaying => PostDelay,
            PostDelay => Done,
            Done => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Whether the stimulus is on screen during this phase
    pub fn shows_stimulus(&self) -> bool {
        matches!(self, Self::Displaying)
    }
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not-started",
            Self::PreDelay => "pre-delay",
            Self::Displaying => "displaying",
            Self::PostDelay => "post-delay",
            Self::Done => "done",
        })
    }
}

/// Session pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Page {
    #[default]
    Greeting,
    Trial,
    Response,
    Done,
}

impl Page {
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Greeting | Self::Response)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greeting => "Greeting",
            Self::Trial => "Trial",
            Self::Response => "Response",
            Self::Done => "Done",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_walk_in_order() {
        let mut phase = TrialPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next > phase);
            seen.push(next);
            phase = next;
        }
        assert_eq!(
            seen,
            [
                TrialPhase::NotStarted,
                TrialPhase::PreDelay,
                TrialPhase::Displaying,
                TrialPhase::PostDelay,
                TrialPhase::Done,
            ]
        );
        assert!(phase.is_terminal());
    }

    #[test]
    fn only_greeting_and_response_take_input() {
        assert!(Page::Greeting.allows_input());
        assert!(Page::Response.allows_input());
        assert!(!Page::Trial.allows_input());
        assert!(!Page::Done.allows_input());
        assert_eq!(Page::Response.to_string(), "Response");
    }
}
