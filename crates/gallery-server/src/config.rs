use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use tracing::{debug, warn};

use gallery_spotify::SpotifyConfig;

/// JWT secrets shipped in sample env files. Refuse to sign with them.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Built client assets served for every non-API path.
    pub static_dir: Option<PathBuf>,
    pub spotify: SpotifyConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("GALLERY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("GALLERY_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let defaults = SpotifyConfig::default();
        let spotify = SpotifyConfig {
            client_id: optional("SPOTIFY_CLIENT_ID"),
            client_secret: optional("SPOTIFY_CLIENT_SECRET"),
            redirect_uri: or_default("SPOTIFY_REDIRECT_URI", defaults.redirect_uri),
            accounts_url: or_default("SPOTIFY_ACCOUNTS_URL", defaults.accounts_url),
            api_url: or_default("SPOTIFY_API_URL", defaults.api_url),
        };
        if spotify.client_id.is_none() || spotify.client_secret.is_none() {
            warn!("Spotify credentials not set; the Spotify widgets will stay empty");
        }

        Ok(Self {
            host: or_default("GALLERY_HOST", "0.0.0.0".into()),
            port: parse("GALLERY_PORT", 5000)?,
            db_path: or_default("GALLERY_DB_PATH", "gallery.db".into()).into(),
            jwt_secret,
            static_dir: optional("GALLERY_STATIC_DIR").map(PathBuf::from),
            spotify,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Unset and blank are the same thing.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn or_default(key: &str, default: String) -> String {
    optional(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default
    })
}

fn parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}")),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
