//! Core domain types for Kalah.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::instrument;

/// Number of pits on the board, stores included.
pub const PIT_COUNT: usize = 14;

/// Seeds placed in every sowing pit at the start of a game.
pub const SEEDS_PER_PIT: u32 = 4;

/// Seeds on a freshly set up board.
pub const TOTAL_SEEDS: u32 = SEEDS_PER_PIT * 12;

/// One of the two seats at the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Sows from pits 0-5, scores in pit 6. Moves first.
    Player1,
    /// Sows from pits 7-12, scores in pit 13.
    Player2,
}

impl Role {
    /// Returns the other seat.
    pub fn opponent(self) -> Self {
        match self {
            Role::Player1 => Role::Player2,
            Role::Player2 => Role::Player1,
        }
    }

    /// Index of this player's store.
    pub fn store_index(self) -> usize {
        match self {
            Role::Player1 => 6,
            Role::Player2 => 13,
        }
    }

    /// Indices of this player's six sowing pits.
    pub fn sowing_pits(self) -> RangeInclusive<usize> {
        match self {
            Role::Player1 => 0..=5,
            Role::Player2 => 7..=12,
        }
    }

    /// Whether `pit` is one of this player's sowing pits.
    pub fn owns_pit(self, pit: usize) -> bool {
        self.sowing_pits().contains(&pit)
    }
}

/// Result of a finished game, by seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The seat with the larger store.
    Winner(Role),
    /// Both stores hold the same number of seeds.
    Tie,
}

impl Outcome {
    /// Returns the winning seat if there is one.
    pub fn winner(&self) -> Option<Role> {
        match self {
            Outcome::Winner(role) => Some(*role),
            Outcome::Tie => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(role) => write!(f, "{} wins", role),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

/// 14-pit Kalah board.
///
/// Serialized as a plain JSON array so it can be stored in a text column and
/// sent to clients unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    pits: [u32; PIT_COUNT],
}

impl Board {
    /// Creates the opening position: four seeds per sowing pit, empty stores.
    #[instrument]
    pub fn initial() -> Self {
        let mut pits = [SEEDS_PER_PIT; PIT_COUNT];
        pits[Role::Player1.store_index()] = 0;
        pits[Role::Player2.store_index()] = 0;
        Self { pits }
    }

    /// Creates a board from raw pit counts.
    pub fn from_pits(pits: [u32; PIT_COUNT]) -> Self {
        Self { pits }
    }

    /// Seeds in the pit at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.pits.get(index).copied()
    }

    /// All pit counts.
    pub fn pits(&self) -> &[u32; PIT_COUNT] {
        &self.pits
    }

    /// Seeds on the whole board.
    pub fn total(&self) -> u32 {
        self.pits.iter().sum()
    }

    /// Seeds left in a player's sowing pits.
    pub fn side_total(&self, role: Role) -> u32 {
        self.pits[role.sowing_pits()].iter().sum()
    }

    /// Seeds in a player's store.
    pub fn store(&self, role: Role) -> u32 {
        self.pits[role.store_index()]
    }

    /// Pits the player could legally sow from.
    pub fn valid_pits(&self, role: Role) -> Vec<usize> {
        role.sowing_pits().filter(|&pit| self.pits[pit] > 0).collect()
    }

    /// Empties a pit and returns what it held. Panics off the board.
    pub(super) fn take(&mut self, index: usize) -> u32 {
        std::mem::take(&mut self.pits[index])
    }

    /// Adds seeds to a pit.
    pub(super) fn add(&mut self, index: usize, seeds: u32) {
        self.pits[index] += seeds;
    }

    /// Formats the board from player one's seat: player two's pits run
    /// right-to-left across the top, stores sit at either end.
    pub fn display(&self) -> String {
        let top: Vec<String> = Role::Player2
            .sowing_pits()
            .rev()
            .map(|pit| format!("{:>2}", self.pits[pit]))
            .collect();
        let bottom: Vec<String> = Role::Player1
            .sowing_pits()
            .map(|pit| format!("{:>2}", self.pits[pit]))
            .collect();
        format!(
            "   {}\n{:>2}{}{:>2}\n   {}",
            top.join(" "),
            self.store(Role::Player2),
            " ".repeat(top.join(" ").len() + 2),
            self.store(Role::Player1),
            bottom.join(" "),
        )
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}
