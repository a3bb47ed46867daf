//! Bitrate ladder: the fixed, ordered set of rungs a player may select.
//!
//! Rungs are stored in ascending rate order and addressed by rank, where
//! rank 1 is the floor. Moving up or down the ladder is index arithmetic
//! over that table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rates of the default ladder in kbps.
pub const DEFAULT_LADDER_KBPS: [u64; 6] = [250, 500, 750, 1000, 1500, 3000];

/// Errors raised while building a custom ladder.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("Bitrate ladder must contain at least one rung")]
    Empty,

    #[error("Bitrate ladder rates must be strictly increasing: {previous} kbps followed by {next} kbps")]
    NotStrictlyIncreasing { previous: u64, next: u64 },

    #[error("Bitrate ladder supports at most {max} rungs, got {count}")]
    TooManyRungs { count: usize, max: usize },

    #[error("Bitrate ladder rung rate must be non-zero")]
    ZeroRate,

    #[error("Rung at position {position} has rank {rank}")]
    RankMismatch { position: usize, rank: u8 },
}

/// One discrete bitrate option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rung {
    /// Rank within the ladder, 1 is the floor.
    pub rank: u8,
    /// Encoding rate in kilobits per second.
    pub rate_kbps: u64,
}

impl fmt::Display for Rung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} ({} kbps)", self.rank, self.rate_kbps)
    }
}

/// Immutable ordered table of rungs.
///
/// Deserialization goes through the same validation as [`BitrateLadder::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rung>", into = "Vec<Rung>")]
pub struct BitrateLadder {
    rungs: Vec<Rung>,
}

impl Default for BitrateLadder {
    fn default() -> Self {
        Self::from_sorted(&DEFAULT_LADDER_KBPS)
    }
}

impl TryFrom<Vec<Rung>> for BitrateLadder {
    type Error = LadderError;

    fn try_from(rungs: Vec<Rung>) -> Result<Self, Self::Error> {
        let rates: Vec<u64> = rungs.iter().map(|rung| rung.rate_kbps).collect();
        let ladder = Self::new(&rates)?;
        for (position, rung) in rungs.iter().enumerate() {
            if usize::from(rung.rank) != position + 1 {
                return Err(LadderError::RankMismatch {
                    position,
                    rank: rung.rank,
                });
            }
        }
        Ok(ladder)
    }
}

impl From<BitrateLadder> for Vec<Rung> {
    fn from(ladder: BitrateLadder) -> Self {
        ladder.rungs
    }
}

impl BitrateLadder {
    /// Builds a ladder from ascending rates, assigning ranks 1..n.
    ///
    /// # Errors
    /// - `LadderError::Empty` - No rates given
    /// - `LadderError::ZeroRate` - A rate of 0 kbps
    /// - `LadderError::NotStrictlyIncreasing` - Rates out of order or duplicated
    /// - `LadderError::TooManyRungs` - More rungs than a `u8` rank can address
    pub fn new(rates_kbps: &[u64]) -> Result<Self, LadderError> {
        if rates_kbps.is_empty() {
            return Err(LadderError::Empty);
        }
        if rates_kbps.len() > usize::from(u8::MAX) {
            return Err(LadderError::TooManyRungs {
                count: rates_kbps.len(),
                max: usize::from(u8::MAX),
            });
        }
        if rates_kbps.contains(&0) {
            return Err(LadderError::ZeroRate);
        }
        for pair in rates_kbps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(LadderError::NotStrictlyIncreasing {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self::from_sorted(rates_kbps))
    }

    fn from_sorted(rates_kbps: &[u64]) -> Self {
        let rungs = rates_kbps
            .iter()
            .enumerate()
            .map(|(index, &rate_kbps)| Rung {
                rank: (index + 1) as u8,
                rate_kbps,
            })
            .collect();
        Self { rungs }
    }

    /// Lowest rung.
    pub fn floor(&self) -> Rung {
        self.rungs[0]
    }

    /// Highest rung.
    pub fn ceiling(&self) -> Rung {
        self.rungs[self.rungs.len() - 1]
    }

    /// Number of rungs.
    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    /// Always false; a ladder holds at least one rung.
    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Iterates rungs from floor to ceiling.
    pub fn iter(&self) -> impl Iterator<Item = &Rung> {
        self.rungs.iter()
    }

    /// Looks up a rung by rank.
    pub fn rung(&self, rank: u8) -> Option<Rung> {
        let index = usize::from(rank).checked_sub(1)?;
        self.rungs.get(index).copied()
    }

    /// Returns true if `rung` belongs to this ladder.
    pub fn contains(&self, rung: Rung) -> bool {
        self.rung(rung.rank) == Some(rung)
    }

    /// Highest rung whose rate does not exceed `kbps`, snapping to the floor.
    pub fn rung_at_or_below(&self, kbps: u64) -> Rung {
        let count = self.rungs.partition_point(|rung| rung.rate_kbps <= kbps);
        self.rungs[count.saturating_sub(1)]
    }

    /// Next rung up, saturating at the ceiling.
    pub fn step_up(&self, rung: Rung) -> Rung {
        let index = self.index_of(rung);
        self.rungs[(index + 1).min(self.rungs.len() - 1)]
    }

    /// Next rung down, saturating at the floor.
    pub fn step_down(&self, rung: Rung) -> Rung {
        let index = self.index_of(rung);
        self.rungs[index.saturating_sub(1)]
    }

    fn index_of(&self, rung: Rung) -> usize {
        usize::from(rung.rank)
            .saturating_sub(1)
            .min(self.rungs.len() - 1)
    }
}
