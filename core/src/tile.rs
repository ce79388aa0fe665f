use serde::{Deserialize, Serialize};

/// Player-visible state stored for each cell. A cell is never both revealed and flagged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCell {
    #[default]
    Hidden,
    Revealed(u8),
    Flagged,
}

impl EngineCell {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed(_))
    }

    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Flagged)
    }
}
