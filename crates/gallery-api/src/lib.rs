pub mod auth;
pub mod comments;
mod convert;
pub mod error;
pub mod follows;
pub mod media;
pub mod middleware;
pub mod reactions;
pub mod routes;
pub mod spotify;
pub mod users;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use gallery_db::Database;
use gallery_spotify::{SpotifyClient, SpotifyConfig};

use crate::error::ApiError;

pub use routes::router;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub spotify: SpotifyClient,
}

impl AppStateInner {
    /// Wire up shared state. The Spotify grant is persisted in the same
    /// database.
    pub fn new(db: Arc<Database>, jwt_secret: String, spotify: SpotifyConfig) -> AppState {
        let spotify = SpotifyClient::new(spotify, db.clone());
        Arc::new(Self {
            db,
            jwt_secret,
            spotify,
        })
    }
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::Internal)
}
