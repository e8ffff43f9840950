//! Move results and move errors.

use super::{Outcome, Role};
use serde::{Deserialize, Serialize};

/// Everything a single sow changed, besides the board itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Pit that received the final seed.
    pub last_pit: usize,
    /// Seeds moved into the mover's store by a capture (0 if none).
    pub captured: u32,
    /// Set when the move ended the game.
    pub outcome: Option<Outcome>,
    /// Seat that moves next.
    pub next: Role,
}

impl Transition {
    /// Whether the move ended the game.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Why a pit cannot be sown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// Index is outside 0-13.
    #[display("Pit {} is off the board", _0)]
    OutOfBounds(#[error(not(source))] i64),

    /// Index names a store.
    #[display("Pit {} is a store", _0)]
    Store(#[error(not(source))] usize),

    /// Pit belongs to the other player.
    #[display("Pit {} does not belong to {}", pit, role)]
    WrongSide {
        /// Requested pit.
        pit: usize,
        /// Player whose turn it is.
        role: Role,
    },

    /// Pit holds no seeds.
    #[display("Pit {} is empty", _0)]
    EmptyPit(#[error(not(source))] usize),
}
