#![no_std]

extern crate alloc;

use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use difficulty::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use input::*;
pub use tile::*;
pub use timer::*;
pub use types::*;
pub use view::*;

mod difficulty;
mod engine;
mod error;
mod generator;
mod input;
mod tile;
mod timer;
mod types;
mod view;

/// Largest safe zone a first activation can claim: the full 3x3 block.
const MAX_SAFE_ZONE_SIDE: Coord = 3;

/// Validated board shape and mine count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord2,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, mines: CellCount) -> Self {
        Self { size, mines }
    }

    /// Rejects boards that cannot host `mines` mines while keeping any first activation's 3x3
    /// neighbourhood clear.
    pub fn new((rows, cols): Coord2, mines: CellCount) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GameError::InvalidDimensions);
        }
        if mines == 0 {
            return Err(GameError::NoMines);
        }

        let cells = mult(rows, cols);
        if mines >= cells {
            return Err(GameError::TooManyMines { mines, cells });
        }

        let safe_zone = mult(
            rows.min(MAX_SAFE_ZONE_SIDE),
            cols.min(MAX_SAFE_ZONE_SIDE),
        );
        let available = cells - safe_zone;
        if mines > available {
            return Err(GameError::NoRoomForSafeStart { mines, available });
        }

        Ok(Self::new_unchecked((rows, cols), mines))
    }

    pub const fn rows(&self) -> Coord {
        self.size.0
    }

    pub const fn cols(&self) -> Coord {
        self.size.1
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    pub const fn safe_cell_count(&self) -> CellCount {
        self.total_cells().saturating_sub(self.mines)
    }

    pub const fn contains(&self, coords: Coord2) -> bool {
        coords.0 < self.size.0 && coords.1 < self.size.1
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Difficulty::default().config()
    }
}

/// Placed mines together with the adjacency count of every cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    adjacent: Array2<u8>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mut mine_count: CellCount = 0;
        let mut adjacent = Array2::<u8>::zeros(mine_mask.dim());

        for ((row, col), _) in mine_mask.indexed_iter().filter(|&(_, &is_mine)| is_mine) {
            mine_count = mine_count.saturating_add(1);
            let coords = (row as Coord, col as Coord);
            for pos in mine_mask.iter_neighbors(coords) {
                adjacent[pos.to_nd_index()] += 1;
            }
        }

        Self {
            mine_mask,
            adjacent,
            mine_count,
        }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(GameError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig::new_unchecked(self.size(), self.mine_count)
    }

    pub fn size(&self) -> Coord2 {
        array_size(&self.mine_mask)
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        let (rows, cols) = self.size();
        mult(rows, cols)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    /// Number of mines among the neighbors of `coords`, the cell itself excluded.
    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.adjacent[coords.to_nd_index()]
    }

    pub fn iter_mines(&self) -> impl Iterator<Item = Coord2> + '_ {
        iter_coords(self.size()).filter(move |&coords| self[coords])
    }

    pub(crate) fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.mine_mask.iter_neighbors(coords)
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.mine_mask[coords.to_nd_index()]
    }
}
