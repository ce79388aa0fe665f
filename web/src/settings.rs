use atomsweeper_core as game;
use clap::Parser;

/// Page options read from the location hash, e.g. `#-vv&--difficulty=hard&--seed=42`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    /// What log level to use
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// Force a seed instead of random
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Board preset for the first game
    #[arg(short, long, default_value_t)]
    pub difficulty: game::Difficulty,
}

impl Args {
    pub(crate) fn from_location_hash(hash: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(hash.split(['#', '&']))
    }

    pub(crate) fn from_location() -> Result<Self, clap::Error> {
        let hash = gloo::utils::window()
            .location()
            .hash()
            .unwrap_or_default();
        Self::from_location_hash(&hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_uses_defaults() {
        let args = Args::from_location_hash("").unwrap();

        assert_eq!(args.seed, None);
        assert_eq!(args.difficulty, game::Difficulty::Medium);
        assert_eq!(args.verbose.log_level(), Some(log::Level::Error));
    }

    #[test]
    fn parses_hash_arguments() {
        let args = Args::from_location_hash("#-vvv&--seed=42&--difficulty=hard").unwrap();

        assert_eq!(args.seed, Some(42));
        assert_eq!(args.difficulty, game::Difficulty::Hard);
        assert_eq!(args.verbose.log_level(), Some(log::Level::Debug));
    }

    #[test]
    fn rejects_unknown_difficulty() {
        assert!(Args::from_location_hash("#--difficulty=expert").is_err());
    }
}
