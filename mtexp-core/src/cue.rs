use serde::{Deserialize, Serialize};

/// Marking drawn in a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    #[default]
    None,
    HorizontalDistractor,
    VerticalDistractor,
    /// The signal: a vertical line in the distractor colour of the
    /// horizontal lines.
    VerticalTarget,
}

impl Cue {
    pub fn is_target(&self) -> bool {
        matches!(self, Self::VerticalTarget)
    }

    pub fn is_distractor(&self) -> bool {
        matches!(self, Self::HorizontalDistractor | Self::VerticalDistractor)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Self::VerticalDistractor | Self::VerticalTarget)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }
}
