use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{error, warn};

use gallery_spotify::SpotifyError;
use gallery_types::api::SuccessResponse;
use gallery_types::spotify::{
    AuthUrlResponse, NowPlaying, PlaylistTracksResponse, PlaylistsResponse, RecentResponse,
    SpotifyStatus,
};

use crate::AppState;
use crate::error::{ApiError, PathParam};

const RECENT_LIMIT: u32 = 20;
const PLAYLISTS_LIMIT: u32 = 50;
const PLAYLIST_TRACKS_LIMIT: u32 = 100;

pub async fn status(State(state): State<AppState>) -> Json<SpotifyStatus> {
    Json(SpotifyStatus {
        configured: state.spotify.is_configured(),
        connected: state.spotify.is_connected().await,
    })
}

pub async fn auth_url(State(state): State<AppState>) -> Result<Json<AuthUrlResponse>, ApiError> {
    match state.spotify.authorize_url() {
        Ok(url) => Ok(Json(AuthUrlResponse { url })),
        Err(SpotifyError::NotConfigured) => {
            Err(ApiError::bad_request(SpotifyError::NotConfigured.to_string()))
        }
        Err(e) => Err(anyhow::anyhow!(e).into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// OAuth redirect target. Always lands the browser back on the gallery.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    if let Some(reason) = params.error {
        warn!("Spotify authorization denied: {}", reason);
        return Redirect::to("/?spotify=error");
    }
    let Some(code) = params.code else {
        warn!("Spotify callback without code");
        return Redirect::to("/?spotify=error");
    };

    match state.spotify.exchange_code(&code).await {
        Ok(()) => Redirect::to("/"),
        Err(e) => {
            error!("Spotify code exchange failed: {}", e);
            Redirect::to("/?spotify=error")
        }
    }
}

pub async fn disconnect(State(state): State<AppState>) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .spotify
        .disconnect()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn now_playing(State(state): State<AppState>) -> Json<NowPlaying> {
    Json(degrade("now playing", state.spotify.now_playing().await))
}

pub async fn recent(State(state): State<AppState>) -> Json<RecentResponse> {
    let tracks = degrade("recently played", state.spotify.recently_played(RECENT_LIMIT).await);
    Json(RecentResponse { tracks })
}

pub async fn playlists(State(state): State<AppState>) -> Json<PlaylistsResponse> {
    let playlists = degrade("playlists", state.spotify.playlists(PLAYLISTS_LIMIT).await);
    Json(PlaylistsResponse { playlists })
}

pub async fn playlist_tracks(
    State(state): State<AppState>,
    WithRejection(Path(playlist_id), _): PathParam<String>,
) -> Json<PlaylistTracksResponse> {
    let tracks = degrade(
        "playlist tracks",
        state
            .spotify
            .playlist_tracks(&playlist_id, PLAYLIST_TRACKS_LIMIT)
            .await,
    );
    Json(PlaylistTracksResponse { tracks })
}

/// The widgets render an empty state instead of an error, so every failure
/// collapses to the default value. Not being connected is expected and stays
/// quiet.
fn degrade<T: Default>(what: &str, result: Result<T, SpotifyError>) -> T {
    match result {
        Ok(value) => value,
        Err(SpotifyError::NotConnected | SpotifyError::NotConfigured) => T::default(),
        Err(e) => {
            warn!("Spotify {} unavailable: {}", what, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};

    use crate::test_support::*;

    #[tokio::test]
    async fn unconfigured_spotify_degrades() {
        let (app, _) = test_app();

        let (status, body) = send(&app, empty("GET", "/api/spotify/status", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configured"], false);
        assert_eq!(body["connected"], false);

        let (status, body) = send(&app, empty("GET", "/api/spotify/now-playing", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isPlaying"], false);
        assert!(body["track"].is_null());

        let (_, body) = send(&app, empty("GET", "/api/spotify/recent", None)).await;
        assert!(body["tracks"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, empty("GET", "/api/spotify/playlists", None)).await;
        assert!(body["playlists"].as_array().unwrap().is_empty());

        let (_, body) =
            send(&app, empty("GET", "/api/spotify/playlists/abc123/tracks", None)).await;
        assert!(body["tracks"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, empty("GET", "/api/spotify/auth-url", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_redirects() {
        let (app, _) = test_app();

        for uri in [
            "/api/spotify/callback?error=access_denied",
            "/api/spotify/callback",
            "/api/spotify/callback?code=abc",
        ] {
            let response = send_raw(&app, empty("GET", uri, None)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], "/?spotify=error");
        }
    }

    #[tokio::test]
    async fn disconnect_succeeds_without_grant() {
        let (app, _) = test_app();
        let (status, body) = send(&app, empty("POST", "/api/spotify/disconnect", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}
