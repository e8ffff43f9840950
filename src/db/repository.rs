//! Database repository for games, chat and user profiles.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::db::models::{GameRow, NewGame};
use crate::db::{
    ChatMessage, DbError, GameOutcome, GameRecord, GameStatus, GameUpdate, HydratedGame,
    NewChatMessage, NewUser, User, Winner, schema,
};
use crate::games::kalah::Role;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for user, game and chat operations.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository connected to the database at the given path.
    ///
    /// Every call opens its own connection, so `":memory:"` only lives for a
    /// single operation. Tests use a temporary file instead.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Applies any migrations the database has not seen yet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        diesel::sql_query("PRAGMA busy_timeout = 5000").execute(&mut conn)?;
        Ok(conn)
    }

    /// Creates a new user profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the username is already taken or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_user(&self, username: String) -> Result<User, DbError> {
        debug!(username = %username, "Creating user");
        let mut conn = self.connection()?;

        let user = diesel::insert_into(schema::users::table)
            .values(&NewUser::new(username))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), username = %user.username(), "User created");
        Ok(user)
    }

    /// Gets a user by username. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        debug!(found = user.is_some(), "User lookup by name");
        Ok(user)
    }

    /// Gets a user by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;
        let user = schema::users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    /// Stamps the user's last sign-in time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the user does not exist or a database error occurs.
    #[instrument(skip(self))]
    pub fn update_last_login(&self, user_id: i32) -> Result<User, DbError> {
        use schema::users::dsl;

        let mut conn = self.connection()?;
        let user = diesel::update(dsl::users.find(user_id))
            .set(dsl::last_login.eq(diesel::dsl::now.nullable()))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        debug!(last_login = ?user.last_login(), "Login recorded");
        Ok(user)
    }

    /// Creates a waiting game owned by `player1_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the room name is taken, the user does not exist,
    /// or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_game(&self, room_name: String, player1_id: i32) -> Result<GameRecord, DbError> {
        let mut conn = self.connection()?;

        let row = diesel::insert_into(schema::games::table)
            .values(&NewGame::waiting(room_name, player1_id)?)
            .returning(GameRow::as_returning())
            .get_result(&mut conn)?;

        let game = GameRecord::try_from(row)?;
        info!(game_id = game.id(), room = %game.room_name(), "Game created");
        Ok(game)
    }

    /// Seats `player2_id` in a waiting game and starts it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the room does not exist, is not waiting, the
    /// player already holds the first seat, or a database error occurs.
    #[instrument(skip(self))]
    pub fn join_game(&self, room_name: &str, player2_id: i32) -> Result<GameRecord, DbError> {
        use schema::games::dsl;

        let mut conn = self.connection()?;

        let row = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let current: GameRow = dsl::games
                .filter(dsl::room_name.eq(room_name))
                .select(GameRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DbError::new(format!("No game in room '{}'", room_name)))?;
            let current = GameRecord::try_from(current)?;

            if *current.status() != GameStatus::Waiting {
                return Err(DbError::new(format!(
                    "Game in room '{}' is {}, not waiting",
                    room_name,
                    current.status()
                )));
            }
            if *current.player1_id() == player2_id {
                return Err(DbError::new("Player cannot join their own game"));
            }

            let row = diesel::update(dsl::games.filter(dsl::room_name.eq(room_name)))
                .set((
                    dsl::player2_id.eq(Some(player2_id)),
                    dsl::status.eq(GameStatus::InProgress.to_string()),
                    dsl::current_turn.eq(Role::Player1.to_string()),
                    dsl::updated_at.eq(diesel::dsl::now),
                ))
                .returning(GameRow::as_returning())
                .get_result(conn)?;
            Ok(row)
        })?;

        let game = GameRecord::try_from(row)?;
        info!(game_id = game.id(), room = %room_name, player2_id, "Player joined game");
        Ok(game)
    }

    /// Gets a game by room name. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or the row is malformed.
    #[instrument(skip(self))]
    pub fn get_game(&self, room_name: &str) -> Result<Option<GameRecord>, DbError> {
        let mut conn = self.connection()?;
        schema::games::table
            .filter(schema::games::room_name.eq(room_name))
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(GameRecord::try_from)
            .transpose()
    }

    /// Gets a game by room name with both player records attached.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or the row is malformed.
    #[instrument(skip(self))]
    pub fn get_hydrated_game(&self, room_name: &str) -> Result<Option<HydratedGame>, DbError> {
        let Some(game) = self.get_game(room_name)? else {
            debug!("Game not found");
            return Ok(None);
        };

        let player1 = self.get_user(*game.player1_id())?;
        let player2 = match game.player2_id() {
            Some(id) => self.get_user(*id)?,
            None => None,
        };

        Ok(Some(HydratedGame::new(game, player1, player2)))
    }

    /// Writes the result of a move in one transaction.
    ///
    /// When the update moves the game into [`GameStatus::Complete`] for the
    /// first time, the same transaction bumps both players' counters and
    /// marks the game so a repeated update cannot count it twice.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the room does not exist or a database error occurs.
    #[instrument(skip(self, update), fields(room = %update.room_name(), status = %update.status()))]
    pub fn update_game(&self, update: GameUpdate) -> Result<GameRecord, DbError> {
        use schema::games::dsl;

        let mut conn = self.connection()?;
        let board = serde_json::to_string(update.board())?;
        let winner = update.winner().as_ref().map(Winner::to_db_string);

        let row = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let row: GameRow = diesel::update(dsl::games.filter(dsl::room_name.eq(update.room_name())))
                .set((
                    dsl::board.eq(&board),
                    dsl::current_turn.eq(update.current_turn().to_string()),
                    dsl::winner.eq(&winner),
                    dsl::status.eq(update.status().to_string()),
                    dsl::updated_at.eq(diesel::dsl::now),
                ))
                .returning(GameRow::as_returning())
                .get_result(conn)?;
            let game = GameRecord::try_from(row.clone())?;

            if *game.status() != GameStatus::Complete || *game.stats_recorded() {
                return Ok(row);
            }

            let Some(winner) = *game.winner() else {
                warn!(room = %game.room_name(), "Completed game has no winner, stats not recorded");
                return Ok(row);
            };

            let players = [Some(*game.player1_id()), *game.player2_id()];
            for user_id in players.into_iter().flatten() {
                record_outcome(conn, user_id, GameOutcome::for_player(user_id, winner))?;
            }

            let row = diesel::update(dsl::games.filter(dsl::id.eq(game.id())))
                .set(dsl::stats_recorded.eq(true))
                .returning(GameRow::as_returning())
                .get_result(conn)?;
            info!(room = %game.room_name(), winner = ?winner, "Statistics recorded");
            Ok(row)
        })?;

        GameRecord::try_from(row)
    }

    /// Lists games still waiting for a second player, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_waiting_games(&self) -> Result<Vec<GameRecord>, DbError> {
        let mut conn = self.connection()?;

        let rows = schema::games::table
            .filter(schema::games::status.eq(GameStatus::Waiting.to_string()))
            .order((schema::games::created_at.asc(), schema::games::id.asc()))
            .select(GameRow::as_select())
            .load(&mut conn)?;

        let games = rows
            .into_iter()
            .map(GameRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = games.len(), "Waiting games loaded");
        Ok(games)
    }

    /// Stores a chat message.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, message), fields(username = %message.username()))]
    pub fn create_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError> {
        let mut conn = self.connection()?;

        let stored = diesel::insert_into(schema::chat_messages::table)
            .values(&message)
            .returning(ChatMessage::as_returning())
            .get_result(&mut conn)?;

        debug!(message_id = stored.id(), "Chat message stored");
        Ok(stored)
    }

    /// Lists all chat messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_messages(&self) -> Result<Vec<ChatMessage>, DbError> {
        let mut conn = self.connection()?;

        let messages = schema::chat_messages::table
            .order((
                schema::chat_messages::created_at.asc(),
                schema::chat_messages::id.asc(),
            ))
            .select(ChatMessage::as_select())
            .load(&mut conn)?;

        info!(count = messages.len(), "Chat history loaded");
        Ok(messages)
    }
}

/// Adds one finished game to a user's counters.
#[instrument(skip(conn))]
fn record_outcome(
    conn: &mut SqliteConnection,
    user_id: i32,
    outcome: GameOutcome,
) -> Result<(), DbError> {
    use schema::users::dsl;

    let (won, lost, drawn) = outcome.increments();
    let updated = diesel::update(dsl::users.find(user_id))
        .set((
            dsl::games_played.eq(dsl::games_played + 1),
            dsl::games_won.eq(dsl::games_won + won),
            dsl::games_lost.eq(dsl::games_lost + lost),
            dsl::games_drawn.eq(dsl::games_drawn + drawn),
            dsl::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(DbError::new(format!("No user with id {}", user_id)));
    }
    debug!(user_id, ?outcome, "Outcome recorded");
    Ok(())
}
