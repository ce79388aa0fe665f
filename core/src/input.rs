use serde::{Deserialize, Serialize};

use crate::*;

/// A player intent coming from the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Activate(Coord2),
    ToggleFlag(Coord2),
    Reset,
    Configure(GameConfig),
    SetDifficulty(Difficulty),
}

impl Intent {
    /// Keyboard binding for a focused cell: Enter or Space reveals, `f` flags.
    pub fn from_key(key: &str, coords: Coord2) -> Option<Self> {
        match key {
            "Enter" | " " => Some(Self::Activate(coords)),
            "f" | "F" => Some(Self::ToggleFlag(coords)),
            _ => None,
        }
    }
}

impl<S: TickScheduler> GridEngine<S> {
    /// Applies any intent; only a `Configure` with an invalid board can fail.
    pub fn apply(&mut self, intent: Intent) -> Result<Update> {
        Ok(match intent {
            Intent::Activate(coords) => self.activate_cell(coords),
            Intent::ToggleFlag(coords) => self.toggle_flag(coords),
            Intent::Reset => {
                self.reset();
                self.full_update()
            }
            Intent::Configure(GameConfig {
                size: (rows, cols),
                mines,
            }) => {
                self.configure(rows, cols, mines)?;
                self.full_update()
            }
            Intent::SetDifficulty(difficulty) => {
                self.configure_difficulty(difficulty);
                self.full_update()
            }
        })
    }

    /// Update listing every cell, for a redraw after the board was replaced.
    pub fn full_update(&self) -> Update {
        Update {
            changed: self.board_view().collect(),
            status: self.status(),
            stats: self.stats(),
        }
    }
}
