//! REST handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::db::{ChatMessage, DbError, GameRecord, HydratedGame, NewChatMessage, PlayerStats, User};
use crate::server::GameServer;
use crate::session::SessionError;

/// Body of `POST /users`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    /// Name to look up or register.
    pub username: String,
}

/// Body of `POST /games`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Room to open.
    pub room_name: String,
    /// User taking the first seat.
    pub player_id: i32,
}

/// Body of `POST /games/{room}/join`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    /// User taking the second seat.
    pub player_id: i32,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Statistics for one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// User the counters belong to.
    pub username: String,
    /// Counters.
    #[serde(flatten)]
    pub stats: PlayerStats,
    /// Percentage of played games won.
    pub win_rate: f64,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn session_rejection(err: SessionError) -> (StatusCode, String) {
    let status = match &err {
        SessionError::RoomNotFound { .. } => StatusCode::NOT_FOUND,
        SessionError::NotAMember { .. } => StatusCode::FORBIDDEN,
        SessionError::InvalidMove(_) => StatusCode::BAD_REQUEST,
        SessionError::NotInProgress { .. }
        | SessionError::StaleState { .. }
        | SessionError::RoomExists { .. }
        | SessionError::NotWaiting { .. }
        | SessionError::OwnGame => StatusCode::CONFLICT,
        SessionError::Store(e) => {
            error!(error = %e, "Request failed in store");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.public_message())
}

fn store_rejection(err: DbError) -> (StatusCode, String) {
    session_rejection(SessionError::Store(err))
}

/// Health check handler.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Returns the named user, registering them on first sight.
#[instrument(skip(server))]
pub async fn create_user(
    State(server): State<GameServer>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Username is required".to_string()));
    }
    server
        .profiles()
        .get_or_create_user(username)
        .await
        .map(Json)
        .map_err(store_rejection)
}

/// Win/loss/draw counters for a user.
#[instrument(skip(server))]
pub async fn user_stats(
    State(server): State<GameServer>,
    Path(username): Path<String>,
) -> ApiResult<StatsResponse> {
    let stats = server
        .profiles()
        .get_stats(&username)
        .await
        .map_err(store_rejection)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No user named '{}'", username)))?;
    Ok(Json(StatsResponse {
        win_rate: stats.win_rate(),
        username,
        stats,
    }))
}

/// Games waiting for a second player.
#[instrument(skip(server))]
pub async fn list_games(State(server): State<GameServer>) -> ApiResult<Vec<GameRecord>> {
    server
        .sessions()
        .waiting_rooms()
        .await
        .map(Json)
        .map_err(session_rejection)
}

/// Opens a game in a new room.
#[instrument(skip(server))]
pub async fn create_game(
    State(server): State<GameServer>,
    Json(req): Json<CreateGameRequest>,
) -> ApiResult<GameRecord> {
    if req.room_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Room name is required".to_string()));
    }
    server
        .sessions()
        .create_game(&req.room_name, req.player_id)
        .await
        .map(Json)
        .map_err(session_rejection)
}

/// Game in a room with both players attached.
#[instrument(skip(server))]
pub async fn get_game(
    State(server): State<GameServer>,
    Path(room): Path<String>,
) -> ApiResult<HydratedGame> {
    server
        .sessions()
        .game(&room)
        .await
        .map(Json)
        .map_err(session_rejection)
}

/// Takes the second seat and starts the game.
#[instrument(skip(server))]
pub async fn join_game(
    State(server): State<GameServer>,
    Path(room): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> ApiResult<HydratedGame> {
    server
        .sessions()
        .join_game(&room, req.player_id)
        .await
        .map(Json)
        .map_err(session_rejection)
}

/// Stores a chat message.
#[instrument(skip(server, message))]
pub async fn create_message(
    State(server): State<GameServer>,
    Json(message): Json<NewChatMessage>,
) -> ApiResult<ChatMessage> {
    if message.message().trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is empty".to_string()));
    }
    server
        .sessions()
        .save_chat_message(message)
        .await
        .map(Json)
        .map_err(session_rejection)
}
