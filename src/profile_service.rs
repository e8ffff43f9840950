//! Profile management business logic layer.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, PlayerStats, User};
use crate::store::GameStore;

/// Service layer for user profile operations.
///
/// Wraps a [`GameStore`] with get-or-create semantics and statistics lookup.
#[derive(Debug, Clone)]
pub struct ProfileService {
    store: Arc<dyn GameStore>,
}

impl ProfileService {
    /// Creates a new profile service backed by the given store.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        info!("Creating ProfileService");
        Self { store }
    }

    /// Returns an existing user by name or creates one if not found, and
    /// stamps the sign-in time on the returned row.
    ///
    /// A concurrent creation of the same name is resolved by reading the
    /// winner's row.
    #[instrument(skip(self))]
    pub async fn get_or_create_user(&self, username: &str) -> Result<User, DbError> {
        debug!("Getting or creating user");

        let user = match self.store.user_by_name(username).await? {
            Some(user) => {
                info!(user_id = user.id(), "Existing user found");
                user
            }
            None => match self.store.create_user(username).await {
                Ok(user) => {
                    info!(user_id = user.id(), "Created new user");
                    user
                }
                Err(e) => {
                    warn!(error = %e, "Create failed, checking for concurrent insert");
                    self.store.user_by_name(username).await?.ok_or(e)?
                }
            },
        };

        self.store.record_login(*user.id()).await
    }

    /// Returns the win/loss/draw counters for a user, if the user exists.
    #[instrument(skip(self))]
    pub async fn get_stats(&self, username: &str) -> Result<Option<PlayerStats>, DbError> {
        let stats = self.store.user_by_name(username).await?.map(|user| user.stats());
        debug!(found = stats.is_some(), "Looked up stats");
        Ok(stats)
    }
}
