use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use gallery_db::Database;
use gallery_db::models::SpotifyTokenRow;

/// Tokens within this many seconds of expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(REFRESH_MARGIN_SECS)
    }

    fn from_row(row: SpotifyTokenRow) -> Option<Self> {
        let expires_at = DateTime::from_timestamp_millis(row.expires_at)?;
        Some(Self {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at,
        })
    }

    fn to_row(&self) -> SpotifyTokenRow {
        SpotifyTokenRow {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at.timestamp_millis(),
        }
    }
}

/// Body of a successful call to the accounts token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Absent on most refresh responses.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Build the new grant, keeping `previous_refresh` when Spotify did not
    /// rotate the refresh token. `None` when no refresh token is known or
    /// `expires_in` does not fit a timestamp.
    pub fn into_token_set(
        self,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<TokenSet> {
        let refresh_token = self.refresh_token.or_else(|| previous_refresh.map(str::to_string))?;
        let expires_at = now.checked_add_signed(Duration::try_seconds(self.expires_in)?)?;
        Some(TokenSet {
            access_token: self.access_token,
            refresh_token,
            expires_at,
        })
    }
}

/// Persistence for the single process-wide grant. Calls are blocking.
pub trait TokenStore: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<Option<TokenSet>>;
    fn save(&self, tokens: &TokenSet) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

impl TokenStore for Database {
    fn load(&self) -> anyhow::Result<Option<TokenSet>> {
        Ok(self.load_spotify_token()?.and_then(TokenSet::from_row))
    }

    fn save(&self, tokens: &TokenSet) -> anyhow::Result<()> {
        self.save_spotify_token(&tokens.to_row())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.clear_spotify_token()
    }
}
