use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::UserRecord,
    store::{Collection, DocumentStore, Filter},
};

/// User records in the `users` collection
///
/// Identity itself comes from the external provider; this only keeps the
/// display name and the watchlist document the rest of the core relies on.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let matches = self
            .store
            .query(Collection::Users, &[Filter::eq("username", username)])
            .await?;
        Ok(!matches.is_empty())
    }

    /// Creates the user record with an empty watchlist
    ///
    /// An existing record for `user_id` is never replaced.
    ///
    /// Username uniqueness is a pre-check query, not a constraint: two
    /// concurrent registrations of the same name can both pass it.
    pub async fn register(&self, user_id: &str, username: &str) -> AppResult<UserRecord> {
        let username = username.trim();
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Could not create user.".to_string()));
        }
        if username.is_empty() {
            return Err(AppError::InvalidInput("Username cannot be empty.".to_string()));
        }
        if self.store.get(Collection::Users, user_id).await?.is_some() {
            return Err(AppError::InvalidInput("User already exists.".to_string()));
        }
        if self.username_exists(username).await? {
            return Err(AppError::InvalidInput("Username already exists.".to_string()));
        }

        let user = UserRecord {
            username: username.to_string(),
            watchlist: Vec::new(),
        };
        self.store
            .set(Collection::Users, user_id, serde_json::to_value(&user)?)
            .await?;

        tracing::info!(user_id = %user_id, username = %username, "User registered");
        Ok(user)
    }

    /// Display name of a user, or an empty string when it cannot be resolved
    pub async fn username(&self, user_id: &str) -> String {
        match self.store.get(Collection::Users, user_id).await {
            Ok(Some(body)) => body
                .get("username")
                .and_then(|name| name.as_str())
                .unwrap_or_default()
                .to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Username lookup failed");
                String::new()
            }
        }
    }
}
