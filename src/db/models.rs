//! Database models and domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{DbError, schema};
use crate::games::kalah::{Board, Outcome, Role};

/// User profile database model.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    avatar_url: String,
    games_played: i32,
    games_won: i32,
    games_lost: i32,
    games_drawn: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    last_login: Option<NaiveDateTime>,
}

impl User {
    /// Snapshot of this user's counters.
    #[instrument(skip(self), fields(user_id = self.id))]
    pub fn stats(&self) -> PlayerStats {
        PlayerStats::new(
            self.games_played,
            self.games_won,
            self.games_lost,
            self.games_drawn,
        )
    }
}

/// Insertable user model for creating new users.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    username: String,
    avatar_url: String,
}

impl NewUser {
    /// Creates a new user with a generated initials avatar.
    #[instrument]
    pub fn new(username: String) -> Self {
        let avatar_url = format!("https://api.dicebear.com/5.x/initials/svg?seed={}", username);
        Self {
            username,
            avatar_url,
        }
    }
}

/// Lifecycle of a game record.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum GameStatus {
    /// Created, second seat still open.
    Waiting,
    /// Both seats filled, moves accepted.
    InProgress,
    /// Finished. Never changes again.
    Complete,
}

/// Stored result of a finished game, by user identity.
///
/// On the wire and in the database this is the winner's user id as a
/// string, or `"tie"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Winner {
    /// User id of the winning player.
    Player(i32),
    /// Equal stores.
    Tie,
}

impl Winner {
    /// Resolves a seat-level outcome to the user sitting in that seat.
    ///
    /// Returns `None` when the winning seat is empty.
    #[instrument]
    pub fn from_outcome(outcome: Outcome, player1_id: i32, player2_id: Option<i32>) -> Option<Self> {
        match outcome {
            Outcome::Winner(Role::Player1) => Some(Self::Player(player1_id)),
            Outcome::Winner(Role::Player2) => player2_id.map(Self::Player),
            Outcome::Tie => Some(Self::Tie),
        }
    }

    /// Converts the winner to the string stored in the database.
    #[instrument]
    pub fn to_db_string(&self) -> String {
        match self {
            Self::Player(id) => id.to_string(),
            Self::Tie => "tie".to_string(),
        }
    }

    /// Parses the winner from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is neither `tie` nor a user id.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "tie" => Ok(Self::Tie),
            other => other
                .parse()
                .map(Self::Player)
                .map_err(|_| DbError::new(format!("Invalid winner: '{}'", other))),
        }
    }
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        winner.to_db_string()
    }
}

impl TryFrom<String> for Winner {
    type Error = DbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Winner::from_db_string(&s)
    }
}

/// Game outcome from one user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    /// User won the game.
    Win,
    /// User lost the game.
    Loss,
    /// Game ended in a draw.
    Draw,
}

impl GameOutcome {
    /// Outcome of a finished game for the given participant.
    #[instrument]
    pub fn for_player(user_id: i32, winner: Winner) -> Self {
        match winner {
            Winner::Tie => Self::Draw,
            Winner::Player(id) if id == user_id => Self::Win,
            Winner::Player(_) => Self::Loss,
        }
    }

    /// Increments to apply to the won, lost and drawn counters.
    pub(crate) fn increments(self) -> (i32, i32, i32) {
        match self {
            Self::Win => (1, 0, 0),
            Self::Loss => (0, 1, 0),
            Self::Draw => (0, 0, 1),
        }
    }
}

/// Raw game row as stored by SQLite.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::games)]
pub(crate) struct GameRow {
    id: i32,
    room_name: String,
    player1_id: i32,
    player2_id: Option<i32>,
    board: String,
    current_turn: String,
    status: String,
    winner: Option<String>,
    stats_recorded: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable game row for a freshly created room.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::games)]
pub(crate) struct NewGame {
    room_name: String,
    player1_id: i32,
    board: String,
    current_turn: String,
    status: String,
}

impl NewGame {
    /// A waiting game with the opening board and player one to move.
    #[instrument]
    pub(crate) fn waiting(room_name: String, player1_id: i32) -> Result<Self, DbError> {
        Ok(Self {
            room_name,
            player1_id,
            board: serde_json::to_string(&Board::initial())?,
            current_turn: Role::Player1.to_string(),
            status: GameStatus::Waiting.to_string(),
        })
    }
}

/// A game as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    id: i32,
    room_name: String,
    player1_id: i32,
    player2_id: Option<i32>,
    board: Board,
    current_turn: Role,
    status: GameStatus,
    winner: Option<Winner>,
    #[serde(skip)]
    stats_recorded: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl GameRecord {
    /// User id seated as `role`, if the seat is filled.
    pub fn player_id(&self, role: Role) -> Option<i32> {
        match role {
            Role::Player1 => Some(self.player1_id),
            Role::Player2 => self.player2_id,
        }
    }
}

impl TryFrom<GameRow> for GameRecord {
    type Error = DbError;

    #[track_caller]
    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let current_turn = row
            .current_turn
            .parse()
            .map_err(|_| DbError::new(format!("Invalid turn: '{}'", row.current_turn)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| DbError::new(format!("Invalid status: '{}'", row.status)))?;
        let winner = row
            .winner
            .as_deref()
            .filter(|w| !w.is_empty())
            .map(Winner::from_db_string)
            .transpose()?;

        Ok(Self {
            id: row.id,
            room_name: row.room_name,
            player1_id: row.player1_id,
            player2_id: row.player2_id,
            board: serde_json::from_str(&row.board)?,
            current_turn,
            status,
            winner,
            stats_recorded: row.stats_recorded,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A game together with the full records of both players.
#[derive(Debug, Clone, PartialEq, Serialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct HydratedGame {
    #[serde(flatten)]
    game: GameRecord,
    player1: Option<User>,
    player2: Option<User>,
}

/// Fields written by a single move.
#[derive(Debug, Clone, PartialEq, Getters, new)]
pub struct GameUpdate {
    room_name: String,
    board: Board,
    current_turn: Role,
    winner: Option<Winner>,
    status: GameStatus,
}

/// Stored chat message.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::chat_messages)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    id: i32,
    message: String,
    username: String,
    user_id: Option<i32>,
    #[serde(rename = "url")]
    avatar_url: Option<String>,
    created_at: NaiveDateTime,
}

/// Insertable chat message.
#[derive(Debug, Clone, Insertable, Deserialize, Getters, new)]
#[diesel(table_name = schema::chat_messages)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    message: String,
    username: String,
    #[serde(default)]
    user_id: Option<i32>,
    #[serde(default, alias = "url")]
    avatar_url: Option<String>,
}

/// Win/loss/draw counters for a user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    games_played: i32,
    wins: i32,
    losses: i32,
    draws: i32,
}

impl PlayerStats {
    /// Creates new player statistics.
    #[instrument]
    pub fn new(games_played: i32, wins: i32, losses: i32, draws: i32) -> Self {
        Self {
            games_played,
            wins,
            losses,
            draws,
        }
    }

    /// Calculates win rate as a percentage (0.0–100.0).
    #[instrument(skip(self))]
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            (self.wins as f64 / self.games_played as f64) * 100.0
        }
    }
}
