use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::*;

/// What the host should draw for a cell.
///
/// Mines are only disclosed once the session has ended: `TriggeredMine` and `Mine` after a loss,
/// `AutoFlagged` after a win.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Hidden,
    Flagged,
    Revealed(u8),
    TriggeredMine,
    Mine,
    AutoFlagged,
    Misflagged,
}

impl CellState {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed(_) | Self::TriggeredMine)
    }

    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Flagged | Self::AutoFlagged | Self::Misflagged)
    }

    /// `Some(true)` when the view discloses a mine, `None` when it does not tell.
    pub const fn discloses_mine(self) -> Option<bool> {
        match self {
            Self::TriggeredMine | Self::Mine | Self::AutoFlagged => Some(true),
            Self::Revealed(_) | Self::Misflagged => Some(false),
            Self::Hidden | Self::Flagged => None,
        }
    }

    /// Adjacency count, only for revealed safe cells.
    pub const fn adjacent_mine_count(self) -> Option<u8> {
        match self {
            Self::Revealed(count) => Some(count),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub row: Coord,
    pub col: Coord,
    pub state: CellState,
}

impl CellView {
    pub const fn new((row, col): Coord2, state: CellState) -> Self {
        Self { row, col, state }
    }

    pub const fn coords(&self) -> Coord2 {
        (self.row, self.col)
    }
}

/// Aggregate counters shown next to the board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub mines_remaining: CellCount,
    pub elapsed_secs: u32,
    pub revealed: CellCount,
    pub score: CellCount,
}

/// Result of a single intent: the cells whose display changed and the resulting game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub changed: Vec<CellView>,
    pub status: SessionStatus,
    pub stats: Stats,
}

impl Update {
    /// Whether this update could require a redraw
    pub fn has_update(&self) -> bool {
        !self.changed.is_empty()
    }
}
