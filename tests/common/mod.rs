//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use strictly_mancala::{
    Board, ChatMessage, DbError, GameRecord, GameRepository, GameStatus, GameStore, GameUpdate,
    HydratedGame, NewChatMessage, Role, RoomRegistry, ServerEvent, SessionCoordinator, User,
};

/// Real repository on a temporary file, with failures and latency that tests
/// can switch on for `update_game`.
#[derive(Debug)]
pub struct TestStore {
    repo: GameRepository,
    fail_updates: AtomicBool,
    update_delay_ms: AtomicU64,
    update_calls: AtomicUsize,
    _file: NamedTempFile,
}

impl TestStore {
    /// Fresh migrated database.
    pub fn new() -> Arc<Self> {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let path = file.path().to_str().expect("Invalid path").to_string();
        let repo = GameRepository::new(path).expect("Failed to create repository");
        repo.run_migrations().expect("Migrations failed");
        Arc::new(Self {
            repo,
            fail_updates: AtomicBool::new(false),
            update_delay_ms: AtomicU64::new(0),
            update_calls: AtomicUsize::new(0),
            _file: file,
        })
    }

    /// Direct access for seeding and assertions.
    pub fn repo(&self) -> &GameRepository {
        &self.repo
    }

    /// Makes every following `update_game` fail without touching the database.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Delays every following `update_game` before it writes.
    pub fn delay_updates(&self, delay: Duration) {
        self.update_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `update_game` calls that reached the database.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Creates two users and a waiting game owned by the first.
    pub fn waiting_game(&self, room: &str) -> (User, User) {
        let p1 = self
            .repo
            .create_user(format!("{room}-one"))
            .expect("Create failed");
        let p2 = self
            .repo
            .create_user(format!("{room}-two"))
            .expect("Create failed");
        self.repo
            .create_game(room.to_string(), *p1.id())
            .expect("Create game failed");
        (p1, p2)
    }

    /// Creates two users and a game between them that has started.
    pub fn started_game(&self, room: &str) -> (User, User) {
        let (p1, p2) = self.waiting_game(room);
        self.repo.join_game(room, *p2.id()).expect("Join failed");
        (p1, p2)
    }

    /// Overwrites the board and turn of an in-progress game.
    pub fn set_position(&self, room: &str, board: Board, turn: Role) {
        self.repo
            .update_game(GameUpdate::new(
                room.to_string(),
                board,
                turn,
                None,
                GameStatus::InProgress,
            ))
            .expect("Seeding position failed");
    }

    /// Stored game for assertions.
    pub fn game(&self, room: &str) -> GameRecord {
        self.repo
            .get_game(room)
            .expect("Query failed")
            .expect("Game missing")
    }
}

#[async_trait]
impl GameStore for TestStore {
    async fn game_by_room(&self, room_name: &str) -> Result<Option<HydratedGame>, DbError> {
        self.repo.game_by_room(room_name).await
    }

    async fn create_game(&self, room_name: &str, creator_id: i32) -> Result<GameRecord, DbError> {
        GameStore::create_game(&self.repo, room_name, creator_id).await
    }

    async fn join_game(&self, room_name: &str, player_id: i32) -> Result<GameRecord, DbError> {
        GameStore::join_game(&self.repo, room_name, player_id).await
    }

    async fn update_game(&self, update: GameUpdate) -> Result<GameRecord, DbError> {
        let delay = self.update_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DbError::new("injected update failure"));
        }
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        GameStore::update_game(&self.repo, update).await
    }

    async fn waiting_games(&self) -> Result<Vec<GameRecord>, DbError> {
        self.repo.waiting_games().await
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, DbError> {
        self.repo.messages().await
    }

    async fn create_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError> {
        GameStore::create_message(&self.repo, message).await
    }

    async fn create_user(&self, username: &str) -> Result<User, DbError> {
        GameStore::create_user(&self.repo, username).await
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        self.repo.user_by_name(username).await
    }

    async fn record_login(&self, user_id: i32) -> Result<User, DbError> {
        self.repo.record_login(user_id).await
    }
}

/// Coordinator over the given store with a fresh registry.
pub fn coordinator(store: &Arc<TestStore>) -> SessionCoordinator {
    let store: Arc<dyn GameStore> = store.clone();
    SessionCoordinator::new(store, RoomRegistry::new())
}

/// Everything queued for a connection so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
