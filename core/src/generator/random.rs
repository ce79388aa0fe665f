use alloc::vec::Vec;
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use super::*;

/// Uniformly random placement that keeps the 3x3 block around the starting cell free of mines.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomLayoutGenerator {
    seed: u64,
    start: Coord2,
}

impl RandomLayoutGenerator {
    pub fn new(seed: u64, start: Coord2) -> Self {
        Self { seed, start }
    }
}

impl LayoutGenerator for RandomLayoutGenerator {
    fn generate(self, config: GameConfig) -> MineLayout {
        let mut candidates: Vec<Coord2> = iter_coords(config.size)
            .filter(|&coords| !is_within_one(coords, self.start))
            .collect();

        let requested = usize::from(config.mines);
        if requested > candidates.len() {
            log::warn!(
                "Safe zone leaves room for {} mines, requested {}",
                candidates.len(),
                requested
            );
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let amount = requested.min(candidates.len());
        let (chosen, _) = candidates.partial_shuffle(&mut rng, amount);

        let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
        for &coords in chosen.iter() {
            mine_mask[coords.to_nd_index()] = true;
        }

        let layout = MineLayout::from_mine_mask(mine_mask);
        log::debug!(
            "Placed {} mines on {:?} avoiding {:?}",
            layout.mine_count(),
            config.size,
            self.start
        );
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_exact_mine_count_outside_safe_zone() {
        let config = Difficulty::Easy.config();
        for seed in 0..32 {
            let start = ((seed % 8) as Coord, (seed / 4 % 8) as Coord);
            let layout = RandomLayoutGenerator::new(seed, start).generate(config);

            assert_eq!(layout.mine_count(), config.mines);
            for coords in iter_safe_zone(start, config.size) {
                assert!(!layout.contains_mine(coords), "mine at {coords:?}");
            }
        }
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let config = Difficulty::Hard.config();
        let a = RandomLayoutGenerator::new(7, (3, 3)).generate(config);
        let b = RandomLayoutGenerator::new(7, (3, 3)).generate(config);
        assert_eq!(a, b);
    }

    #[test]
    fn fills_every_cell_outside_safe_zone_when_tight() {
        let config = GameConfig::new((4, 4), 7).unwrap();
        let layout = RandomLayoutGenerator::new(3, (1, 1)).generate(config);

        assert_eq!(layout.mine_count(), 7);
        for coords in iter_coords(config.size) {
            assert_eq!(layout.contains_mine(coords), !is_within_one(coords, (1, 1)));
        }
    }
}
