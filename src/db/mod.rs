//! Database persistence layer for games, chat and player statistics.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{
    ChatMessage, GameOutcome, GameRecord, GameStatus, GameUpdate, HydratedGame, NewChatMessage,
    NewUser, PlayerStats, User, Winner,
};
pub use repository::GameRepository;
