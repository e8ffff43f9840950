//! WebSocket wire frames.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{ChatMessage, GameRecord, HydratedGame};
use crate::games::kalah::{Board, Role};

/// Frames sent by clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Request for the chat history.
    Hello,
    /// Chat payload, relayed verbatim to every connection.
    Message(Value),
    /// Join the named room after creating its game over REST.
    CreateRoom(String),
    /// Join the named room.
    JoinRoom(String),
    /// Leave the named room.
    LeaveRoom(String),
    /// Request the waiting games.
    GetRooms,
    /// Sow from a pit.
    PlayerMove(PlayerMove),
}

/// Payload of a `player-move` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMove {
    /// The state the client believed current when it moved.
    #[serde(default)]
    pub game: Option<ClientSnapshot>,
    /// Room the move is for.
    pub room_name: String,
    /// Pit to sow from. Signed so out-of-range input reaches the rules engine.
    pub pit_index: i64,
}

/// Client's view of the game, used only to detect a stale client.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    /// Board as the client last saw it.
    #[serde(default)]
    pub board: Option<Board>,
    /// Seat the client believes is to move.
    #[serde(default, alias = "current")]
    pub current_turn: Option<Role>,
}

impl ClientSnapshot {
    /// Whether this snapshot disagrees with the stored board or turn.
    ///
    /// Fields the client left out are not compared.
    pub fn conflicts_with(&self, game: &GameRecord) -> bool {
        let board_differs = self.board.is_some_and(|board| board != *game.board());
        let turn_differs = self.current_turn.is_some_and(|turn| turn != *game.current_turn());
        board_differs || turn_differs
    }
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Chat history, oldest first.
    Hello {
        /// Stored messages.
        messages: Vec<ChatMessage>,
    },
    /// Relayed chat payload.
    Message(Value),
    /// Someone entered a room; carries the game with both players.
    GameStart(HydratedGame),
    /// Games waiting for a second player.
    RoomsList(Vec<GameRecord>),
    /// Persisted state after a move.
    GameUpdate(GameRecord),
    /// Final state of a game that just ended.
    GameOver(HydratedGame),
    /// Failure report for the connection that caused it.
    Error {
        /// Client-safe description.
        message: String,
    },
}

impl ServerEvent {
    /// Builds an `error` frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Frame name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Message(_) => "message",
            Self::GameStart(_) => "game-start",
            Self::RoomsList(_) => "rooms-list",
            Self::GameUpdate(_) => "game-update",
            Self::GameOver(_) => "game-over",
            Self::Error { .. } => "error",
        }
    }
}
