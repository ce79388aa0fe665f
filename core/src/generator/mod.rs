use crate::*;
pub use random::*;

mod random;

/// Produces the mine layout for a board once the first activated cell is known.
pub trait LayoutGenerator {
    fn generate(self, config: GameConfig) -> MineLayout;
}
