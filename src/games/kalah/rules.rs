//! Move rules: legality, sowing, capture, game end and turn order.
//!
//! Every function here is pure apart from mutating the board it is handed.
//! [`play`] runs the steps in the order a move requires; the individual
//! steps are public so each can be checked on its own.

use super::{Board, MoveError, Outcome, PIT_COUNT, Role, Transition};
use tracing::{debug, instrument};

/// Checks a requested pit against the board and the mover's seat.
///
/// Returns the pit as a board index when it can be sown.
///
/// # Errors
///
/// Returns the first check that failed: off the board, a store, the
/// opponent's side, or an empty pit.
#[instrument(skip(board))]
pub fn validate_move(pit: i64, board: &Board, role: Role) -> Result<usize, MoveError> {
    let index = usize::try_from(pit)
        .ok()
        .filter(|&index| index < PIT_COUNT)
        .ok_or(MoveError::OutOfBounds(pit))?;

    if index == Role::Player1.store_index() || index == Role::Player2.store_index() {
        return Err(MoveError::Store(index));
    }
    if !role.owns_pit(index) {
        return Err(MoveError::WrongSide { pit: index, role });
    }
    if board.get(index) == Some(0) {
        return Err(MoveError::EmptyPit(index));
    }

    Ok(index)
}

/// Whether `pit` can be sown by `role` on this board.
#[instrument(skip(board))]
pub fn is_valid_move(pit: i64, board: &Board, role: Role) -> bool {
    validate_move(pit, board, role).is_ok()
}

/// Sows every seed from `pit` counter-clockwise, one per pit, never into the
/// opponent's store. Returns the index of the pit that got the last seed.
///
/// `pit` is expected to have passed [`validate_move`].
///
/// # Panics
///
/// Panics if `pit` is not a board index (`pit >= PIT_COUNT`).
#[instrument(skip(board))]
pub fn distribute_seeds(board: &mut Board, pit: usize, role: Role) -> usize {
    debug_assert!(pit < PIT_COUNT, "pit {pit} is off the board");
    let skipped = role.opponent().store_index();
    let mut seeds = board.take(pit);
    let mut current = pit;

    while seeds > 0 {
        current = (current + 1) % PIT_COUNT;
        if current == skipped {
            continue;
        }
        board.add(current, 1);
        seeds -= 1;
    }

    debug!(last_pit = current, "Seeds distributed");
    current
}

/// Captures when the last seed landed in a previously empty pit on the
/// mover's side: that seed and the opposite pit go to the mover's store.
///
/// Returns the number of seeds moved into the store.
#[instrument(skip(board))]
pub fn handle_capture(board: &mut Board, last_pit: usize, role: Role) -> u32 {
    if !role.owns_pit(last_pit) || board.get(last_pit) != Some(1) {
        return 0;
    }

    let opposite = 12 - last_pit;
    let captured = board.take(last_pit) + board.take(opposite);
    board.add(role.store_index(), captured);

    debug!(last_pit, opposite, captured, "Capture");
    captured
}

/// Ends the game once either side has no seeds left to sow.
///
/// Remaining seeds go to their owner's store and every sowing pit is
/// cleared before the stores are compared. Returns `None` while both
/// sides still have seeds.
#[instrument(skip(board))]
pub fn check_game_over(board: &mut Board) -> Option<Outcome> {
    let player1_side = board.side_total(Role::Player1);
    let player2_side = board.side_total(Role::Player2);

    if player1_side != 0 && player2_side != 0 {
        return None;
    }

    for role in [Role::Player1, Role::Player2] {
        let remaining: u32 = role.sowing_pits().map(|pit| board.take(pit)).sum();
        board.add(role.store_index(), remaining);
    }

    let player1_store = board.store(Role::Player1);
    let player2_store = board.store(Role::Player2);
    let outcome = match player1_store.cmp(&player2_store) {
        std::cmp::Ordering::Greater => Outcome::Winner(Role::Player1),
        std::cmp::Ordering::Less => Outcome::Winner(Role::Player2),
        std::cmp::Ordering::Equal => Outcome::Tie,
    };

    debug!(player1_store, player2_store, %outcome, "Game over");
    Some(outcome)
}

/// Landing in your own store earns another turn; anything else passes play.
#[instrument]
pub fn next_player(last_pit: usize, role: Role) -> Role {
    if last_pit == role.store_index() {
        role
    } else {
        role.opponent()
    }
}

/// Applies one complete move for `role`: validate, sow, capture, check for
/// the end of the game, then pick the next mover.
///
/// The board is left untouched when the move is rejected.
///
/// # Errors
///
/// Returns [`MoveError`] when the pit cannot be sown.
#[instrument(skip(board))]
pub fn play(board: &mut Board, pit: i64, role: Role) -> Result<Transition, MoveError> {
    let pit = validate_move(pit, board, role)?;
    let last_pit = distribute_seeds(board, pit, role);
    let captured = handle_capture(board, last_pit, role);
    let outcome = check_game_over(board);
    let next = next_player(last_pit, role);

    Ok(Transition {
        last_pit,
        captured,
        outcome,
        next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pit 14 is off the board")]
    fn test_distribute_from_off_board_pit_panics() {
        let mut board = Board::initial();
        distribute_seeds(&mut board, 14, Role::Player1);
    }

    #[test]
    fn test_rejects_stores_and_bounds() {
        let board = Board::initial();
        for pit in [-1, 6, 13, 14, 99] {
            assert!(!is_valid_move(pit, &board, Role::Player1), "pit {pit}");
            assert!(!is_valid_move(pit, &board, Role::Player2), "pit {pit}");
        }
        assert_eq!(
            validate_move(6, &board, Role::Player2),
            Err(MoveError::Store(6))
        );
        assert_eq!(
            validate_move(-3, &board, Role::Player1),
            Err(MoveError::OutOfBounds(-3))
        );
    }

    #[test]
    fn test_accepts_exactly_own_nonempty_pits() {
        let mut pits = *Board::initial().pits();
        pits[2] = 0;
        pits[9] = 0;
        let board = Board::from_pits(pits);

        let player1: Vec<i64> = (-2..16)
            .filter(|&pit| is_valid_move(pit, &board, Role::Player1))
            .collect();
        let player2: Vec<i64> = (-2..16)
            .filter(|&pit| is_valid_move(pit, &board, Role::Player2))
            .collect();

        assert_eq!(player1, vec![0, 1, 3, 4, 5]);
        assert_eq!(player2, vec![7, 8, 10, 11, 12]);
    }

    #[test]
    fn test_wrong_side_rejected() {
        let board = Board::initial();
        assert_eq!(
            validate_move(8, &board, Role::Player1),
            Err(MoveError::WrongSide {
                pit: 8,
                role: Role::Player1
            })
        );
    }

    #[test]
    fn test_sow_into_own_store_grants_extra_turn() {
        let mut board = Board::initial();
        let transition = play(&mut board, 2, Role::Player1).expect("legal move");

        assert_eq!(transition.last_pit, 6);
        assert_eq!(transition.next, Role::Player1);
        assert_eq!(
            board.pits(),
            &[4, 4, 0, 5, 5, 5, 1, 4, 4, 4, 4, 4, 4, 0]
        );
    }

    #[test]
    fn test_sow_skips_opponent_store() {
        let mut pits = [0; PIT_COUNT];
        pits[5] = 10;
        pits[12] = 1;
        let mut board = Board::from_pits(pits);

        let last = distribute_seeds(&mut board, 5, Role::Player1);

        assert_eq!(board.get(13), Some(0));
        assert_eq!(last, 2);
        assert_eq!(board.total(), 11);
    }

    #[test]
    fn test_player_two_skips_store_six() {
        let mut pits = [0; PIT_COUNT];
        pits[12] = 8;
        pits[0] = 1;
        let mut board = Board::from_pits(pits);

        let last = distribute_seeds(&mut board, 12, Role::Player2);

        assert_eq!(board.get(6), Some(0));
        assert_eq!(board.get(13), Some(1));
        assert_eq!(last, 7);
    }

    #[test]
    fn test_capture_into_empty_own_pit() {
        let mut pits = *Board::initial().pits();
        pits[0] = 1;
        pits[1] = 0;
        pits[11] = 5;
        let mut board = Board::from_pits(pits);

        let transition = play(&mut board, 0, Role::Player1).expect("legal move");

        assert_eq!(transition.last_pit, 1);
        assert_eq!(transition.captured, 6);
        assert_eq!(board.get(1), Some(0));
        assert_eq!(board.get(11), Some(0));
        assert_eq!(board.store(Role::Player1), 6);
        assert_eq!(transition.next, Role::Player2);
    }

    #[test]
    fn test_no_capture_on_occupied_or_opponent_pit() {
        let mut pits = *Board::initial().pits();
        pits[1] = 1;
        let mut board = Board::from_pits(pits);
        let before_store = board.store(Role::Player1);

        let transition = play(&mut board, 1, Role::Player1).expect("legal move");

        assert_eq!(transition.last_pit, 2);
        assert_eq!(transition.captured, 0);
        assert_eq!(board.store(Role::Player1), before_store);

        let mut pits = [0; PIT_COUNT];
        pits[7] = 1;
        let mut board = Board::from_pits(pits);
        assert_eq!(handle_capture(&mut board, 7, Role::Player1), 0);
        assert_eq!(board.get(7), Some(1));
    }

    #[test]
    fn test_no_capture_in_own_store() {
        let mut pits = [0; PIT_COUNT];
        pits[6] = 1;
        let mut board = Board::from_pits(pits);
        assert_eq!(handle_capture(&mut board, 6, Role::Player1), 0);
        assert_eq!(board.store(Role::Player1), 1);
    }

    #[test]
    fn test_game_over_sweeps_and_is_idempotent() {
        let mut pits = [0; PIT_COUNT];
        pits[6] = 20;
        pits[9] = 3;
        pits[12] = 1;
        let mut board = Board::from_pits(pits);

        assert_eq!(
            check_game_over(&mut board),
            Some(Outcome::Winner(Role::Player1))
        );
        assert_eq!(board.store(Role::Player2), 4);
        assert_eq!(board.side_total(Role::Player1), 0);
        assert_eq!(board.side_total(Role::Player2), 0);

        let swept = board;
        assert_eq!(
            check_game_over(&mut board),
            Some(Outcome::Winner(Role::Player1))
        );
        assert_eq!(board, swept);
    }

    #[test]
    fn test_game_over_tie() {
        let mut pits = [0; PIT_COUNT];
        pits[6] = 12;
        pits[13] = 10;
        pits[8] = 2;
        let mut board = Board::from_pits(pits);

        assert_eq!(check_game_over(&mut board), Some(Outcome::Tie));
        assert_eq!(board.total(), 24);
    }

    #[test]
    fn test_game_not_over_with_seeds_on_both_sides() {
        let mut board = Board::initial();
        assert_eq!(check_game_over(&mut board), None);
        assert_eq!(board, Board::initial());
    }

    #[test]
    fn test_next_player() {
        assert_eq!(next_player(6, Role::Player1), Role::Player1);
        assert_eq!(next_player(13, Role::Player2), Role::Player2);
        assert_eq!(next_player(13, Role::Player1), Role::Player2);
        assert_eq!(next_player(6, Role::Player2), Role::Player1);
        assert_eq!(next_player(3, Role::Player1), Role::Player2);
    }

    #[test]
    fn test_rejected_move_leaves_board_untouched() {
        let mut board = Board::initial();
        assert!(play(&mut board, 9, Role::Player1).is_err());
        assert_eq!(board, Board::initial());
    }
}
