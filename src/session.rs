//! Game session coordination.
//!
//! Every flow that reads or writes a game goes through [`SessionCoordinator`].
//! Moves on one room are serialized by a per-room lock held from the load of
//! the authoritative record until the resulting broadcast has been queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use derive_more::{Display, Error};
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn};

use crate::db::{
    ChatMessage, DbError, GameRecord, GameStatus, GameUpdate, HydratedGame, NewChatMessage, Winner,
};
use crate::events::{PlayerMove, ServerEvent};
use crate::games::kalah::{self, MoveError};
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::store::GameStore;

/// Message sent to clients when the failure is internal.
const GENERIC_FAILURE: &str = "Something went wrong, please try again";

/// Failure of a session operation.
#[derive(Debug, Display, Error)]
pub enum SessionError {
    /// The rules engine rejected the move.
    #[display("Invalid move: {_0}")]
    InvalidMove(MoveError),
    /// The game is waiting for a player or already finished.
    #[display("Game in room '{room}' is not in progress")]
    NotInProgress {
        /// Room name.
        room: String,
    },
    /// The client's view of the game is behind the stored record.
    #[display("Game in room '{room}' has changed, refresh and try again")]
    StaleState {
        /// Room name.
        room: String,
    },
    /// The connection never joined the room.
    #[display("Not a member of room '{room}'")]
    NotAMember {
        /// Room name.
        room: String,
    },
    /// No game is stored for the room.
    #[display("No game in room '{room}'")]
    RoomNotFound {
        /// Room name.
        room: String,
    },
    /// A game already exists under this room name.
    #[display("Room '{room}' already has a game")]
    RoomExists {
        /// Room name.
        room: String,
    },
    /// The game no longer accepts a second player.
    #[display("Game in room '{room}' is not waiting for players")]
    NotWaiting {
        /// Room name.
        room: String,
    },
    /// The creator tried to take the second seat.
    #[display("Player cannot join their own game")]
    OwnGame,
    /// Persistence failed.
    #[display("{_0}")]
    Store(DbError),
}

impl SessionError {
    /// Text safe to show the client. Store failures are reported generically.
    pub fn public_message(&self) -> String {
        match self {
            SessionError::Store(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the failure was internal rather than caused by the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, SessionError::Store(_))
    }
}

impl From<MoveError> for SessionError {
    fn from(err: MoveError) -> Self {
        SessionError::InvalidMove(err)
    }
}

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        SessionError::Store(err)
    }
}

type LockMap = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// One async mutex per room name.
///
/// An entry lives only while some caller holds or waits on it.
#[derive(Debug, Clone, Default)]
struct RoomLocks {
    locks: LockMap,
}

impl RoomLocks {
    async fn acquire(&self, room: &str) -> RoomGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(room.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        RoomGuard {
            guard: Some(guard),
            room: room.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }
}

/// Held room lock. Dropping it releases the room and forgets the entry when
/// nobody else is queued on it.
#[derive(Debug)]
struct RoomGuard {
    guard: Option<OwnedMutexGuard<()>>,
    room: String,
    locks: LockMap,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(&self.room)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.room);
        }
    }
}

/// Applies moves and room flows against the store, then fans results out.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    store: Arc<dyn GameStore>,
    rooms: RoomRegistry,
    locks: RoomLocks,
}

impl SessionCoordinator {
    /// Creates a coordinator over an injected store and registry.
    #[instrument(skip_all)]
    pub fn new(store: Arc<dyn GameStore>, rooms: RoomRegistry) -> Self {
        info!("Creating session coordinator");
        Self {
            store,
            rooms,
            locks: RoomLocks::default(),
        }
    }

    /// Registry used for fan-out.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Validates, applies and persists a move, then broadcasts the result.
    ///
    /// Nothing is broadcast unless the store accepted the update. When the
    /// move ends the game a `game-over` frame follows the `game-update`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the move is rejected or cannot be
    /// persisted. The caller reports it to the sender only.
    #[instrument(skip(self, mv), fields(room = %mv.room_name, pit = mv.pit_index))]
    pub async fn apply_move(
        &self,
        connection: ConnectionId,
        mv: PlayerMove,
    ) -> Result<GameRecord, SessionError> {
        let room = mv.room_name;
        if !self.rooms.is_member(connection, &room) {
            warn!(connection_id = connection, "Move from outside the room");
            return Err(SessionError::NotAMember { room });
        }

        let _guard = self.locks.acquire(&room).await;

        let hydrated = self
            .store
            .game_by_room(&room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound { room: room.clone() })?;
        let game = hydrated.game();

        if *game.status() != GameStatus::InProgress {
            debug!(status = %game.status(), "Move outside an active game");
            return Err(SessionError::NotInProgress { room });
        }

        if mv.game.as_ref().is_some_and(|snapshot| snapshot.conflicts_with(game)) {
            debug!("Client snapshot is stale");
            return Err(SessionError::StaleState { room });
        }

        let mut board = *game.board();
        let transition = kalah::play(&mut board, mv.pit_index, *game.current_turn())?;
        debug!(board = %board.display(), "Board after move");

        let winner = transition
            .outcome
            .and_then(|outcome| Winner::from_outcome(outcome, *game.player1_id(), *game.player2_id()));
        let status = if transition.is_terminal() {
            GameStatus::Complete
        } else {
            GameStatus::InProgress
        };

        let update = GameUpdate::new(room.clone(), board, transition.next, winner, status);
        let record = self.store.update_game(update).await?;

        info!(
            last_pit = transition.last_pit,
            captured = transition.captured,
            next = %record.current_turn(),
            status = %record.status(),
            "Move applied"
        );

        self.rooms
            .broadcast(&room, ServerEvent::GameUpdate(record.clone()));

        if *record.status() == GameStatus::Complete {
            match self.store.game_by_room(&room).await {
                Ok(Some(finished)) => {
                    info!(winner = ?record.winner(), "Game over");
                    self.rooms.broadcast(&room, ServerEvent::GameOver(finished));
                }
                Ok(None) => warn!("Finished game disappeared before game-over"),
                Err(e) => error!(error = %e, "Failed to load finished game"),
            }
        }

        Ok(record)
    }

    /// Adds the connection to a room and announces the game to its members.
    #[instrument(skip(self))]
    pub async fn join_room(
        &self,
        connection: ConnectionId,
        room: &str,
    ) -> Result<HydratedGame, SessionError> {
        let game = self
            .store
            .game_by_room(room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound {
                room: room.to_string(),
            })?;

        self.rooms.join(connection, room);
        let delivered = self.rooms.broadcast(room, ServerEvent::GameStart(game.clone()));
        info!(delivered, "Joined room");
        Ok(game)
    }

    /// Removes the connection from a room.
    #[instrument(skip(self))]
    pub fn leave_room(&self, connection: ConnectionId, room: &str) {
        self.rooms.leave(connection, room);
    }

    /// Games waiting for a second player.
    #[instrument(skip(self))]
    pub async fn waiting_rooms(&self) -> Result<Vec<GameRecord>, SessionError> {
        let games = self.store.waiting_games().await?;
        debug!(count = games.len(), "Listed waiting games");
        Ok(games)
    }

    /// Stored chat history, oldest first.
    #[instrument(skip(self))]
    pub async fn chat_history(&self) -> Result<Vec<ChatMessage>, SessionError> {
        Ok(self.store.messages().await?)
    }

    /// Relays a chat payload to every connection unchanged.
    #[instrument(skip(self, payload))]
    pub fn relay_chat(&self, payload: Value) -> usize {
        self.rooms.broadcast_all(ServerEvent::Message(payload))
    }

    /// Persists a chat message.
    #[instrument(skip(self, message), fields(username = %message.username()))]
    pub async fn save_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, SessionError> {
        Ok(self.store.create_message(message).await?)
    }

    /// Game in a room with both players attached.
    #[instrument(skip(self))]
    pub async fn game(&self, room: &str) -> Result<HydratedGame, SessionError> {
        self.store
            .game_by_room(room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound {
                room: room.to_string(),
            })
    }

    /// Opens a new waiting game with the creator in the first seat.
    #[instrument(skip(self))]
    pub async fn create_game(
        &self,
        room: &str,
        creator_id: i32,
    ) -> Result<GameRecord, SessionError> {
        let _guard = self.locks.acquire(room).await;

        if self.store.game_by_room(room).await?.is_some() {
            return Err(SessionError::RoomExists {
                room: room.to_string(),
            });
        }

        let game = self.store.create_game(room, creator_id).await?;
        info!(game_id = *game.id(), "Game created");
        Ok(game)
    }

    /// Seats a second player, starts the game and announces it to the room.
    #[instrument(skip(self))]
    pub async fn join_game(&self, room: &str, player_id: i32) -> Result<HydratedGame, SessionError> {
        let _guard = self.locks.acquire(room).await;

        let current = self
            .store
            .game_by_room(room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound {
                room: room.to_string(),
            })?;
        if *current.game().status() != GameStatus::Waiting {
            return Err(SessionError::NotWaiting {
                room: room.to_string(),
            });
        }
        if *current.game().player1_id() == player_id {
            return Err(SessionError::OwnGame);
        }

        self.store.join_game(room, player_id).await?;
        let started = self
            .store
            .game_by_room(room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound {
                room: room.to_string(),
            })?;

        let delivered = self
            .rooms
            .broadcast(room, ServerEvent::GameStart(started.clone()));
        info!(delivered, "Game started");
        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::User;
    use async_trait::async_trait;

    /// Store with no games and no users.
    #[derive(Debug)]
    struct EmptyStore;

    #[async_trait]
    impl GameStore for EmptyStore {
        async fn game_by_room(&self, _room_name: &str) -> Result<Option<HydratedGame>, DbError> {
            Ok(None)
        }

        async fn create_game(&self, room_name: &str, creator_id: i32) -> Result<GameRecord, DbError> {
            Err(DbError::new(format!("No user {creator_id} for {room_name}")))
        }

        async fn join_game(&self, room_name: &str, _player_id: i32) -> Result<GameRecord, DbError> {
            Err(DbError::new(format!("No game in {room_name}")))
        }

        async fn update_game(&self, update: GameUpdate) -> Result<GameRecord, DbError> {
            Err(DbError::new(format!("No game in {}", update.room_name())))
        }

        async fn waiting_games(&self) -> Result<Vec<GameRecord>, DbError> {
            Ok(Vec::new())
        }

        async fn messages(&self) -> Result<Vec<ChatMessage>, DbError> {
            Ok(Vec::new())
        }

        async fn create_message(&self, _message: NewChatMessage) -> Result<ChatMessage, DbError> {
            Err(DbError::new("Read-only"))
        }

        async fn create_user(&self, _username: &str) -> Result<User, DbError> {
            Err(DbError::new("Read-only"))
        }

        async fn user_by_name(&self, _username: &str) -> Result<Option<User>, DbError> {
            Ok(None)
        }

        async fn record_login(&self, user_id: i32) -> Result<User, DbError> {
            Err(DbError::new(format!("No user {user_id}")))
        }
    }

    fn lock_entries(locks: &RoomLocks) -> usize {
        locks.locks.lock().unwrap().len()
    }

    fn holders(locks: &RoomLocks, room: &str) -> usize {
        locks
            .locks
            .lock()
            .unwrap()
            .get(room)
            .map_or(0, Arc::strong_count)
    }

    #[tokio::test]
    async fn test_failed_requests_leave_no_lock_entries() {
        let coordinator = SessionCoordinator::new(Arc::new(EmptyStore), RoomRegistry::new());

        for i in 0..500 {
            let joined = coordinator.join_game(&format!("absent-{i}"), 1).await;
            assert!(matches!(joined, Err(SessionError::RoomNotFound { .. })));
            let created = coordinator.create_game(&format!("bogus-{i}"), 999).await;
            assert!(matches!(created, Err(SessionError::Store(_))));
        }

        let (connection, _rx) = coordinator.rooms().register();
        coordinator.rooms().join(connection, "ghost");
        let mv = PlayerMove {
            game: None,
            room_name: "ghost".to_string(),
            pit_index: 0,
        };
        let moved = coordinator.apply_move(connection, mv).await;
        assert!(matches!(moved, Err(SessionError::RoomNotFound { .. })));

        assert_eq!(lock_entries(&coordinator.locks), 0);
    }

    #[tokio::test]
    async fn test_entry_kept_while_another_caller_waits() {
        let locks = RoomLocks::default();
        let first = locks.acquire("den").await;
        assert_eq!(lock_entries(&locks), 1);

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("den").await;
            })
        };
        // map, held guard, queued waiter
        while holders(&locks, "den") < 3 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert_eq!(lock_entries(&locks), 1);

        waiter.await.unwrap();
        assert_eq!(lock_entries(&locks), 0);
    }

    #[tokio::test]
    async fn test_rooms_lock_independently() {
        let locks = RoomLocks::default();
        let _a = locks.acquire("a").await;
        let _b = locks.acquire("b").await;
        assert_eq!(lock_entries(&locks), 2);
    }
}
