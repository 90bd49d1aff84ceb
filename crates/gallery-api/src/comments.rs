use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use gallery_types::api::{Claims, CreateCommentRequest, SuccessResponse};
use gallery_types::models::Comment;

use crate::error::{ApiError, JsonBody, PathParam};
use crate::{AppState, blocking, convert};

pub const MAX_COMMENT_LEN: usize = 2000;

pub async fn list_comments(
    State(state): State<AppState>,
    WithRejection(Path(media_id), _): PathParam<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let rows = blocking(&state, move |db| db.list_comments(media_id)).await?;
    Ok(Json(rows.into_iter().map(convert::comment).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(media_id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::bad_request(format!(
            "Comment must be 1-{} characters",
            MAX_COMMENT_LEN
        )));
    }

    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        if db.get_media(media_id)?.is_none() {
            return Ok(None);
        }
        db.insert_comment(media_id, &user_id, &text).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Media"))?;

    Ok((StatusCode::CREATED, Json(convert::comment(row))))
}

/// Only the author may delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(comment_id), _): PathParam<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    blocking(&state, move |db| {
        let Some(comment) = db.get_comment(comment_id)? else {
            return Ok(Err(ApiError::NotFound("Comment")));
        };
        if comment.user_id != user_id {
            return Ok(Err(ApiError::Forbidden(
                "You can only delete your own comments".into(),
            )));
        }
        db.delete_comment(comment_id)?;
        Ok(Ok(()))
    })
    .await??;

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn comment_lifecycle() {
        let (app, state) = test_app();
        let (token, user_id) = register(&app, "ada@example.com").await;
        let media = seed_media(&state, "a.png");
        let uri = format!("/api/media/{}/comments", media.id);

        let (status, _) =
            send(&app, json_req("POST", &uri, None, json!({ "text": "nice" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, created) = send(
            &app,
            json_req("POST", &uri, Some(&token), json!({ "text": "  nice shot  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["text"], "nice shot");
        assert_eq!(created["userId"], user_id.to_string());
        assert_eq!(created["user"]["firstName"], "Test");

        let (status, list) = send(&app, empty("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let delete_uri = format!("/api/comments/{}", created["id"]);
        let (stranger, _) = register(&app, "bob@example.com").await;
        let (status, _) = send(&app, empty("DELETE", &delete_uri, Some(&stranger))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, empty("DELETE", &delete_uri, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&app, empty("DELETE", &delete_uri, Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comment_validation() {
        let (app, state) = test_app();
        let (token, _) = register(&app, "ada@example.com").await;
        let media = seed_media(&state, "a.png");
        let uri = format!("/api/media/{}/comments", media.id);

        for text in ["   ".to_string(), "x".repeat(2001)] {
            let (status, _) =
                send(&app, json_req("POST", &uri, Some(&token), json!({ "text": text }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, _) = send(
            &app,
            json_req("POST", "/api/media/999/comments", Some(&token), json!({ "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_media_removes_comments() {
        let (app, state) = test_app();
        let (token, _) = register(&app, "ada@example.com").await;
        let media = seed_media(&state, "a.png");
        let uri = format!("/api/media/{}/comments", media.id);
        send(&app, json_req("POST", &uri, Some(&token), json!({ "text": "hi" }))).await;

        send(&app, empty("DELETE", &format!("/api/media/{}", media.id), None)).await;
        assert!(state.db.list_comments(media.id).unwrap().is_empty());
    }
}
