use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{info, warn};

use gallery_types::spotify::{NowPlaying, Playlist, PlaylistTrack, RecentTrack};

use crate::error::SpotifyError;
use crate::tokens::{TokenResponse, TokenSet, TokenStore};
use crate::wire::{CurrentlyPlaying, Paging, PlayHistory, PlaylistItem, SimplifiedPlaylist};

const SCOPES: &[&str] = &[
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-read-email",
    "user-read-private",
    "user-read-playback-state",
    "user-read-currently-playing",
    "user-read-recently-played",
    "user-top-read",
    "user-library-read",
];

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// Base of the OAuth endpoints (`/authorize`, `/api/token`).
    pub accounts_url: String,
    /// Base of the Web API, including the version segment.
    pub api_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:5000/api/spotify/callback".into(),
            accounts_url: "https://accounts.spotify.com".into(),
            api_url: "https://api.spotify.com/v1".into(),
        }
    }
}

/// Process-wide Spotify grant plus the Web API calls the gallery makes.
///
/// The grant is loaded from the store on first use and cached. The cache has
/// no guard beyond the lock itself: concurrent refreshes both succeed and the
/// last write wins.
pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
    store: Arc<dyn TokenStore>,
    cache: RwLock<Option<TokenSet>>,
    loaded: AtomicBool,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            store,
            cache: RwLock::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<(&str, &str), SpotifyError> {
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.as_str(), secret.as_str()))
            }
            _ => Err(SpotifyError::NotConfigured),
        }
    }

    /// URL that starts the authorization-code flow.
    pub fn authorize_url(&self) -> Result<String, SpotifyError> {
        let (client_id, _) = self.credentials()?;
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.config.accounts_url),
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| SpotifyError::InvalidConfig(format!("accounts URL: {}", e)))?;
        Ok(url.into())
    }

    /// Trade an authorization code for a grant and persist it.
    pub async fn exchange_code(&self, code: &str) -> Result<(), SpotifyError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .await?;

        let tokens = response
            .into_token_set(None, Utc::now())
            .ok_or_else(|| SpotifyError::InvalidTokenResponse("no refresh_token".into()))?;

        self.persist(tokens).await?;
        info!("Spotify connected");
        Ok(())
    }

    /// True when a usable grant exists, refreshing it if needed.
    pub async fn is_connected(&self) -> bool {
        self.access_token().await.is_ok()
    }

    pub async fn disconnect(&self) -> Result<(), SpotifyError> {
        self.invalidate().await?;
        info!("Spotify disconnected");
        Ok(())
    }

    /// A fresh access token, refreshing synchronously inside the margin.
    /// Every refresh failure reports `NotConnected`. The grant is dropped only
    /// when the accounts server rejects it; network or config trouble keeps it.
    pub async fn access_token(&self) -> Result<String, SpotifyError> {
        let tokens = self.cached().await?.ok_or(SpotifyError::NotConnected)?;
        if !tokens.needs_refresh(Utc::now()) {
            return Ok(tokens.access_token);
        }

        info!("Refreshing Spotify access token");
        match self.refresh(&tokens).await {
            Ok(fresh) => {
                let access = fresh.access_token.clone();
                self.persist(fresh).await?;
                Ok(access)
            }
            Err(e) if e.revokes_grant() => {
                warn!("Spotify rejected token refresh, dropping grant: {}", e);
                self.invalidate().await?;
                Err(SpotifyError::NotConnected)
            }
            Err(e) => {
                warn!("Spotify token refresh failed, keeping grant: {}", e);
                Err(SpotifyError::NotConnected)
            }
        }
    }

    pub async fn now_playing(&self) -> Result<NowPlaying, SpotifyError> {
        let playing: Option<CurrentlyPlaying> =
            self.get("/me/player/currently-playing", &[]).await?;
        Ok(playing.map_or_else(NowPlaying::idle, CurrentlyPlaying::into_now_playing))
    }

    pub async fn recently_played(&self, limit: u32) -> Result<Vec<RecentTrack>, SpotifyError> {
        let page: Option<Paging<PlayHistory>> = self
            .get("/me/player/recently-played", &[("limit", limit.to_string())])
            .await?;
        Ok(page
            .map(|p| p.items.into_iter().filter_map(PlayHistory::into_recent).collect())
            .unwrap_or_default())
    }

    pub async fn playlists(&self, limit: u32) -> Result<Vec<Playlist>, SpotifyError> {
        let page: Option<Paging<SimplifiedPlaylist>> = self
            .get("/me/playlists", &[("limit", limit.to_string())])
            .await?;
        Ok(page
            .map(|p| p.items.into_iter().map(Playlist::from).collect())
            .unwrap_or_default())
    }

    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistTrack>, SpotifyError> {
        // Spotify ids are base62; anything else would escape the path.
        if playlist_id.is_empty() || !playlist_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SpotifyError::InvalidId(playlist_id.to_string()));
        }

        let page: Option<Paging<PlaylistItem>> = self
            .get(
                &format!("/playlists/{}/tracks", playlist_id),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(page
            .map(|p| p.items.into_iter().filter_map(PlaylistItem::into_playlist_track).collect())
            .unwrap_or_default())
    }

    // -- internals --

    /// Authorized GET against the Web API. `None` on 204 No Content.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, SpotifyError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.config.api_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(response.json::<T>().await?))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let (client_id, client_secret) = self.credentials()?;
        let response = self
            .http
            .post(format!("{}/api/token", self.config.accounts_url))
            .basic_auth(client_id, Some(client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, SpotifyError> {
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await?;

        response
            .into_token_set(Some(&current.refresh_token), Utc::now())
            .ok_or_else(|| SpotifyError::InvalidTokenResponse("unusable expires_in".into()))
    }

    /// Current grant, loading it from the store on first use.
    async fn cached(&self) -> Result<Option<TokenSet>, SpotifyError> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(self.cache.read().await.clone());
        }

        let store = self.store.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

        let mut cache = self.cache.write().await;
        *cache = loaded;
        self.loaded.store(true, Ordering::Release);
        Ok(cache.clone())
    }

    async fn persist(&self, tokens: TokenSet) -> Result<(), SpotifyError> {
        let store = self.store.clone();
        let to_save = tokens.clone();
        tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

        *self.cache.write().await = Some(tokens);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), SpotifyError> {
        *self.cache.write().await = None;
        self.loaded.store(true, Ordering::Release);

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use axum::{
        Form, Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus, header},
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use chrono::Duration;
    use gallery_db::Database;
    use serde_json::json;

    #[derive(Default)]
    struct FakeSpotify {
        refresh_calls: AtomicUsize,
        fail_refresh: AtomicBool,
        idle: AtomicBool,
    }

    async fn token(
        State(fake): State<Arc<FakeSpotify>>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        let basic = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Basic "));
        if !basic {
            return AxumStatus::UNAUTHORIZED.into_response();
        }

        match form.get("grant_type").map(String::as_str) {
            Some("refresh_token") => {
                fake.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if fake.fail_refresh.load(Ordering::SeqCst) {
                    return (AxumStatus::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
                        .into_response();
                }
                Json(json!({"access_token": "fresh", "token_type": "Bearer", "expires_in": 3600}))
                    .into_response()
            }
            Some("authorization_code") if form.get("code").map(String::as_str) == Some("good") => {
                Json(json!({
                    "access_token": "fresh",
                    "refresh_token": "r-new",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .into_response()
            }
            _ => AxumStatus::BAD_REQUEST.into_response(),
        }
    }

    async fn currently_playing(State(fake): State<Arc<FakeSpotify>>, headers: HeaderMap) -> Response {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Bearer fresh");
        if !authorized {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        if fake.idle.load(Ordering::SeqCst) {
            return AxumStatus::NO_CONTENT.into_response();
        }
        Json(json!({
            "is_playing": true,
            "progress_ms": 1234,
            "item": {
                "id": "t1",
                "name": "Song",
                "artists": [{"name": "Artist"}],
                "album": {"name": "Album", "images": [{"url": "big"}, {"url": "small"}]},
                "duration_ms": 200000,
                "uri": "spotify:track:t1",
                "external_urls": {"spotify": "https://open.spotify.com/track/t1"}
            }
        }))
        .into_response()
    }

    async fn spawn_fake(fake: Arc<FakeSpotify>) -> String {
        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/player/currently-playing", get(currently_playing))
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str, db: Arc<Database>) -> SpotifyClient {
        SpotifyClient::new(
            SpotifyConfig {
                client_id: Some("id".into()),
                client_secret: Some("secret".into()),
                redirect_uri: "http://localhost/callback".into(),
                accounts_url: base.to_string(),
                api_url: format!("{}/v1", base),
            },
            db,
        )
    }

    fn seed_token(db: &Database, access: &str, expires_in_secs: i64) {
        db.save(&TokenSet {
            access_token: access.into(),
            refresh_token: "r1".into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        })
        .unwrap();
    }

    #[tokio::test]
    async fn refreshes_token_inside_margin() {
        let fake = Arc::new(FakeSpotify::default());
        let base = spawn_fake(fake.clone()).await;
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "stale", 60);

        let spotify = client(&base, db.clone());
        let playing = spotify.now_playing().await.unwrap();

        assert!(playing.is_playing);
        let track = playing.track.unwrap();
        assert_eq!(track.name, "Song");
        assert_eq!(track.progress, 1234);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);

        let stored = TokenStore::load(db.as_ref()).unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token, "r1");
    }

    #[tokio::test]
    async fn fresh_token_skips_refresh() {
        let fake = Arc::new(FakeSpotify::default());
        let base = spawn_fake(fake.clone()).await;
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "fresh", 3600);

        let spotify = client(&base, db);
        assert!(spotify.now_playing().await.unwrap().is_playing);
        assert!(spotify.is_connected().await);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_refresh_disconnects() {
        let fake = Arc::new(FakeSpotify::default());
        fake.fail_refresh.store(true, Ordering::SeqCst);
        let base = spawn_fake(fake.clone()).await;
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "stale", -30);

        let spotify = client(&base, db.clone());
        let err = spotify.now_playing().await.unwrap_err();
        assert!(matches!(err, SpotifyError::NotConnected));
        assert!(TokenStore::load(db.as_ref()).unwrap().is_none());

        // The cache is cleared too, so no second refresh attempt is made.
        assert!(!spotify.is_connected().await);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_accounts_keeps_grant() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "stale", 60);

        // Nothing listens on the discard port.
        let spotify = client("http://127.0.0.1:9", db.clone());
        assert!(!spotify.is_connected().await);

        let stored = TokenStore::load(db.as_ref()).unwrap().unwrap();
        assert_eq!(stored.access_token, "stale");
        assert_eq!(stored.refresh_token, "r1");
    }

    #[tokio::test]
    async fn missing_credentials_keep_grant() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "stale", 60);

        let spotify = SpotifyClient::new(SpotifyConfig::default(), db.clone());
        assert!(!spotify.is_connected().await);
        assert!(TokenStore::load(db.as_ref()).unwrap().is_some());
    }

    #[tokio::test]
    async fn grant_survives_until_accounts_recover() {
        let fake = Arc::new(FakeSpotify::default());
        let base = spawn_fake(fake.clone()).await;
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "stale", 60);

        assert!(!client("http://127.0.0.1:9", db.clone()).is_connected().await);

        let spotify = client(&base, db.clone());
        assert!(spotify.is_connected().await);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        let stored = TokenStore::load(db.as_ref()).unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
    }

    #[tokio::test]
    async fn nothing_playing_is_idle() {
        let fake = Arc::new(FakeSpotify::default());
        fake.idle.store(true, Ordering::SeqCst);
        let base = spawn_fake(fake).await;
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "fresh", 3600);

        let spotify = client(&base, db);
        assert_eq!(spotify.now_playing().await.unwrap(), NowPlaying::idle());
    }

    #[tokio::test]
    async fn exchange_code_persists_grant() {
        let fake = Arc::new(FakeSpotify::default());
        let base = spawn_fake(fake).await;
        let db = Arc::new(Database::open_in_memory().unwrap());

        let spotify = client(&base, db.clone());
        assert!(!spotify.is_connected().await);

        spotify.exchange_code("good").await.unwrap();
        assert!(spotify.is_connected().await);
        let stored = TokenStore::load(db.as_ref()).unwrap().unwrap();
        assert_eq!(stored.refresh_token, "r-new");

        assert!(spotify.exchange_code("bad").await.is_err());

        spotify.disconnect().await.unwrap();
        assert!(!spotify.is_connected().await);
        assert!(TokenStore::load(db.as_ref()).unwrap().is_none());
    }

    #[tokio::test]
    async fn unconfigured_client_has_no_auth_url() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let spotify = SpotifyClient::new(SpotifyConfig::default(), db);
        assert!(!spotify.is_configured());
        assert!(matches!(spotify.authorize_url(), Err(SpotifyError::NotConfigured)));
        assert!(matches!(
            spotify.recently_played(10).await,
            Err(SpotifyError::NotConnected)
        ));
    }

    #[test]
    fn auth_url_carries_client_and_redirect() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let spotify = client("https://accounts.example", db);
        let url = spotify.authorize_url().unwrap();
        assert!(url.starts_with("https://accounts.example/authorize?"));
        assert!(url.contains("client_id=id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcallback"));
        assert!(url.contains("user-read-currently-playing"));
    }

    #[tokio::test]
    async fn playlist_ids_are_validated() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed_token(&db, "fresh", 3600);
        let spotify = client("http://127.0.0.1:9", db);
        assert!(matches!(
            spotify.playlist_tracks("../me", 10).await,
            Err(SpotifyError::InvalidId(_))
        ));
    }
}
