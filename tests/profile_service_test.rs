//! Tests for the profile service.

mod common;

use std::sync::Arc;

use common::TestStore;
use strictly_mancala::{GameStatus, GameStore, GameUpdate, ProfileService, Role, Board, Winner};

fn service(store: &Arc<TestStore>) -> ProfileService {
    let store: Arc<dyn GameStore> = store.clone();
    ProfileService::new(store)
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let store = TestStore::new();
    let profiles = service(&store);

    let first = profiles.get_or_create_user("ada").await.unwrap();
    let second = profiles.get_or_create_user("ada").await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(second.username(), "ada");
}

#[tokio::test]
async fn test_stats_for_unknown_user() {
    let store = TestStore::new();
    let profiles = service(&store);
    assert!(profiles.get_stats("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_stats_follow_finished_games() {
    let store = TestStore::new();
    let (p1, p2) = store.started_game("tally");
    store
        .repo()
        .update_game(GameUpdate::new(
            "tally".to_string(),
            Board::from_pits([0, 0, 0, 0, 0, 0, 30, 0, 0, 0, 0, 0, 0, 18]),
            Role::Player2,
            Some(Winner::Player(*p1.id())),
            GameStatus::Complete,
        ))
        .unwrap();
    let profiles = service(&store);

    let winner = profiles.get_stats(p1.username()).await.unwrap().unwrap();
    assert_eq!((*winner.games_played(), *winner.wins()), (1, 1));
    assert_eq!(winner.win_rate(), 100.0);

    let loser = profiles.get_stats(p2.username()).await.unwrap().unwrap();
    assert_eq!((*loser.games_played(), *loser.losses()), (1, 1));
    assert_eq!(loser.win_rate(), 0.0);
}

#[tokio::test]
async fn test_get_or_create_stamps_last_login() {
    let store = TestStore::new();
    let created = store.repo().create_user("kit".to_string()).unwrap();
    assert!(created.last_login().is_none());

    let profiles = service(&store);
    let signed_in = profiles.get_or_create_user("kit").await.unwrap();
    assert_eq!(signed_in.id(), created.id());
    assert!(signed_in.last_login().is_some());

    let fresh = profiles.get_or_create_user("new-kid").await.unwrap();
    assert!(fresh.last_login().is_some());
    let stored = store.repo().get_user(*fresh.id()).unwrap().unwrap();
    assert_eq!(stored.last_login(), fresh.last_login());
}
