//! Strictly Mancala library - multiplayer Kalah over WebSocket
//!
//! # Architecture
//!
//! - **Games**: Kalah rules engine (sowing, capture, extra turns, game end)
//! - **Database**: SQLite persistence for users, games and chat
//! - **Store**: async storage boundary the session layer depends on
//! - **Session**: per-room serialized move application and room flows
//! - **Rooms**: connection registry and broadcast fan-out
//! - **Server**: axum router with the `/ws` endpoint and REST routes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_mancala::{GameRepository, GameServer};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repository = GameRepository::new("strictly_mancala.db".to_string())?;
//! repository.run_migrations()?;
//!
//! let app = GameServer::new(Arc::new(repository)).router();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod events;
mod games;
mod handlers;
mod profile_service;
mod rooms;
mod server;
mod session;
mod store;

// Crate-level exports - Configuration
pub use config::{ConfigError, DATABASE_URL_VAR, PORT_VAR, ServerConfig};

// Crate-level exports - Database
pub use db::{
    ChatMessage, DbError, GameOutcome, GameRecord, GameRepository, GameStatus, GameUpdate,
    HydratedGame, NewChatMessage, NewUser, PlayerStats, User, Winner,
};

// Crate-level exports - Wire frames
pub use events::{ClientEvent, ClientSnapshot, PlayerMove, ServerEvent};

// Crate-level exports - Game rules (Kalah)
pub use games::kalah::{
    Board, MoveError, Outcome, PIT_COUNT, Role, SEEDS_PER_PIT, TOTAL_SEEDS, Transition,
    check_game_over, distribute_seeds, handle_capture, is_valid_move, next_player, play,
    validate_move,
};

// Crate-level exports - REST request and response types
pub use handlers::{
    CreateGameRequest, CreateUserRequest, HealthResponse, JoinGameRequest, StatsResponse,
};

// Crate-level exports - Services
pub use profile_service::ProfileService;
pub use rooms::{ConnectionId, RoomRegistry};
pub use server::GameServer;
pub use session::{SessionCoordinator, SessionError};
pub use store::GameStore;
