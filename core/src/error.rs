use thiserror::Error;

use crate::CellCount;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board needs at least one row and one column")]
    InvalidDimensions,
    #[error("Board needs at least one mine")]
    NoMines,
    #[error("Too many mines: {mines} requested but the board only has {cells} cells")]
    TooManyMines { mines: CellCount, cells: CellCount },
    #[error("No room for a safe start: {mines} mines requested but only {available} cells fit")]
    NoRoomForSafeStart {
        mines: CellCount,
        available: CellCount,
    },
    #[error("Unknown difficulty")]
    UnknownDifficulty,
}

pub type Result<T> = core::result::Result<T, GameError>;
