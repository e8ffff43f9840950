//! Kalah rules engine.
//!
//! Pure functions over a 14-pit [`Board`]. Nothing in this module performs
//! I/O or holds shared state; callers own the board and decide what to
//! persist.

mod action;
mod rules;
mod types;

pub use action::{MoveError, Transition};
pub use rules::{
    check_game_over, distribute_seeds, handle_capture, is_valid_move, next_player, play,
    validate_move,
};
pub use types::{Board, Outcome, PIT_COUNT, Role, SEEDS_PER_PIT, TOTAL_SEEDS};
