use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify credentials not configured")]
    NotConfigured,

    /// No grant, or the grant could not be refreshed.
    #[error("Spotify not connected - please authorize first")]
    NotConnected,

    #[error("invalid Spotify configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid Spotify id '{0}'")]
    InvalidId(String),

    #[error("Spotify returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unusable Spotify token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Spotify request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SpotifyError {
    /// The accounts server answered and refused the grant, as opposed to the
    /// request never reaching it.
    pub fn revokes_grant(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::InvalidTokenResponse(_))
    }
}
