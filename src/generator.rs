use std::ops::RangeInclusive;

use tracing::warn;

use crate::{mode::Mode, seed::Corpus};

pub const ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_=+";

/// Upper bound (exclusive) of the numeric suffix appended to seed strings.
const SUFFIX_BOUND: u32 = 10_000;

/// The algorithm used to produce candidates, fixed for the duration of a run.
#[derive(Debug, Clone)]
pub enum Strategy {
    UniformRandom { length: RangeInclusive<usize> },
    DictionaryWord(Corpus),
    PersonName(Corpus),
}

impl Strategy {
    /// Builds the strategy for `mode`, falling back to [`Strategy::UniformRandom`] if the
    /// required seed corpus is empty.
    pub fn for_mode(
        mode: Mode,
        length: RangeInclusive<usize>,
        words: Corpus,
        names: Corpus,
    ) -> Self {
        let strategy = match mode {
            Mode::Random => return Self::UniformRandom { length },
            Mode::Real => Self::DictionaryWord(words),
            Mode::Names => Self::PersonName(names),
        };

        match strategy {
            Self::DictionaryWord(corpus) | Self::PersonName(corpus) if corpus.is_empty() => {
                warn!(%mode, "Seed corpus is empty, falling back to random passwords");
                Self::UniformRandom { length }
            }
            strategy => strategy,
        }
    }
}

/// Produces candidates for a single worker. The RNG is seeded once on construction and never
/// reseeded.
pub struct CandidateGenerator {
    strategy: Strategy,
    rng: fastrand::Rng,
}

impl CandidateGenerator {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(strategy: Strategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn next_candidate(&mut self) -> String {
        match &self.strategy {
            Strategy::UniformRandom { length } => {
                let length = self.rng.usize(length.clone());

                (0..length)
                    .map(|_| char::from(ALPHABET[self.rng.usize(..ALPHABET.len())]))
                    .collect()
            }
            Strategy::DictionaryWord(corpus) | Strategy::PersonName(corpus) => {
                let seed = &corpus[self.rng.usize(..corpus.len())];
                format!("{seed}{:04}", self.rng.u32(..SUFFIX_BOUND))
            }
        }
    }
}
