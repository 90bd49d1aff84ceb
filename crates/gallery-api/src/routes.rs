use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::middleware::{optional_auth, require_auth};
use crate::{AppState, auth, comments, follows, media, reactions, spotify, users};

/// Room for multipart framing on top of the file payloads.
const MULTIPART_SLACK: usize = 1024 * 1024;

/// Edited images arrive base64-encoded inside JSON.
const UPDATE_IMAGE_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// The whole `/api` surface. Protected methods carry `require_auth` as a
/// route layer so public and protected methods can share a path.
pub fn router(state: AppState) -> Router {
    let auth_layer = || from_fn_with_state(state.clone(), require_auth);

    let upload_limit = media::MAX_FILES * media::MAX_FILE_SIZE + MULTIPART_SLACK;
    let profile_limit = users::MAX_PROFILE_IMAGE_SIZE + MULTIPART_SLACK;

    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/user", get(auth::current_user).route_layer(auth_layer()))
        .route(
            "/api/auth/user/update",
            post(users::update_profile)
                .route_layer(auth_layer())
                .layer(DefaultBodyLimit::max(profile_limit)),
        )
        // Media
        .route("/api/media", get(media::list_media))
        .route(
            "/api/media/upload",
            post(media::upload_media)
                .route_layer(from_fn_with_state(state.clone(), optional_auth))
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/media/reorder", post(media::reorder_media))
        .route(
            "/api/media/{id}",
            get(media::get_media).delete(media::delete_media),
        )
        .route("/api/media/{id}/like", post(media::set_liked))
        .route("/api/media/{id}/duplicates", get(media::duplicates))
        .route(
            "/api/media/{id}/update-image",
            post(media::update_image).layer(DefaultBodyLimit::max(UPDATE_IMAGE_BODY_LIMIT)),
        )
        // Comments and reactions
        .route(
            "/api/media/{id}/comments",
            get(comments::list_comments)
                .merge(post(comments::create_comment).route_layer(auth_layer())),
        )
        .route(
            "/api/comments/{id}",
            delete(comments::delete_comment).route_layer(auth_layer()),
        )
        .route(
            "/api/media/{id}/reactions",
            get(reactions::list_reactions)
                .merge(post(reactions::toggle_reaction).route_layer(auth_layer())),
        )
        // Users and follows
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/users/{id}/media", get(users::user_media))
        .route(
            "/api/users/{id}/follow",
            post(follows::follow)
                .delete(follows::unfollow)
                .route_layer(auth_layer()),
        )
        .route("/api/users/{id}/followers", get(follows::followers))
        .route("/api/users/{id}/following", get(follows::following))
        // Spotify
        .route("/api/spotify/status", get(spotify::status))
        .route("/api/spotify/auth-url", get(spotify::auth_url))
        .route("/api/spotify/callback", get(spotify::callback))
        .route("/api/spotify/disconnect", post(spotify::disconnect))
        .route("/api/spotify/now-playing", get(spotify::now_playing))
        .route("/api/spotify/recent", get(spotify::recent))
        .route("/api/spotify/playlists", get(spotify::playlists))
        .route(
            "/api/spotify/playlists/{id}/tracks",
            get(spotify::playlist_tracks),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::*;

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let (app, _) = test_app();

        let (status, _) = send(&app, empty("GET", "/api/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, empty("PUT", "/api/media", None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn public_reads_share_paths_with_protected_writes() {
        let (app, state) = test_app();
        let media = seed_media(&state, "a.png");

        for uri in [
            format!("/api/media/{}/comments", media.id),
            format!("/api/media/{}/reactions", media.id),
        ] {
            let (status, _) = send(&app, empty("GET", &uri, None)).await;
            assert_eq!(status, StatusCode::OK);
            let (status, _) = send(&app, empty("POST", &uri, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
