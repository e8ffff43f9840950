//! Async storage boundary used by the session coordinator.
//!
//! [`GameRepository`] does blocking diesel work, so its implementation moves
//! each call onto tokio's blocking pool.

use async_trait::async_trait;
use tracing::instrument;

use crate::db::{
    ChatMessage, DbError, GameRecord, GameRepository, GameUpdate, HydratedGame, NewChatMessage,
    User,
};

/// Storage for games, chat history and user records.
#[async_trait]
pub trait GameStore: std::fmt::Debug + Send + Sync {
    /// Game in `room_name` with both players attached.
    async fn game_by_room(&self, room_name: &str) -> Result<Option<HydratedGame>, DbError>;

    /// Creates a waiting game with `creator_id` in the first seat.
    async fn create_game(&self, room_name: &str, creator_id: i32) -> Result<GameRecord, DbError>;

    /// Seats `player_id` in the second seat and starts the game.
    async fn join_game(&self, room_name: &str, player_id: i32) -> Result<GameRecord, DbError>;

    /// Writes one move atomically. Recording statistics on the first
    /// transition into the complete state is part of the same write.
    async fn update_game(&self, update: GameUpdate) -> Result<GameRecord, DbError>;

    /// Games still waiting for a second player, oldest first.
    async fn waiting_games(&self) -> Result<Vec<GameRecord>, DbError>;

    /// Chat history, oldest first.
    async fn messages(&self) -> Result<Vec<ChatMessage>, DbError>;

    /// Stores a chat message.
    async fn create_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError>;

    /// Creates a user.
    async fn create_user(&self, username: &str) -> Result<User, DbError>;

    /// Looks a user up by name.
    async fn user_by_name(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Stamps the user's last sign-in time and returns the updated row.
    async fn record_login(&self, user_id: i32) -> Result<User, DbError>;
}

/// Runs blocking repository work off the async runtime.
#[instrument(skip(work))]
async fn blocking<T, F>(work: F) -> Result<T, DbError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DbError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

#[async_trait]
impl GameStore for GameRepository {
    async fn game_by_room(&self, room_name: &str) -> Result<Option<HydratedGame>, DbError> {
        let repo = self.clone();
        let room_name = room_name.to_string();
        blocking(move || repo.get_hydrated_game(&room_name)).await
    }

    async fn create_game(&self, room_name: &str, creator_id: i32) -> Result<GameRecord, DbError> {
        let repo = self.clone();
        let room_name = room_name.to_string();
        blocking(move || repo.create_game(room_name, creator_id)).await
    }

    async fn join_game(&self, room_name: &str, player_id: i32) -> Result<GameRecord, DbError> {
        let repo = self.clone();
        let room_name = room_name.to_string();
        blocking(move || repo.join_game(&room_name, player_id)).await
    }

    async fn update_game(&self, update: GameUpdate) -> Result<GameRecord, DbError> {
        let repo = self.clone();
        blocking(move || repo.update_game(update)).await
    }

    async fn waiting_games(&self) -> Result<Vec<GameRecord>, DbError> {
        let repo = self.clone();
        blocking(move || repo.list_waiting_games()).await
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, DbError> {
        let repo = self.clone();
        blocking(move || repo.list_messages()).await
    }

    async fn create_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError> {
        let repo = self.clone();
        blocking(move || repo.create_message(message)).await
    }

    async fn create_user(&self, username: &str) -> Result<User, DbError> {
        let repo = self.clone();
        let username = username.to_string();
        blocking(move || repo.create_user(username)).await
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        let repo = self.clone();
        let username = username.to_string();
        blocking(move || repo.get_user_by_name(&username)).await
    }

    async fn record_login(&self, user_id: i32) -> Result<User, DbError> {
        let repo = self.clone();
        blocking(move || repo.update_last_login(user_id)).await
    }
}
