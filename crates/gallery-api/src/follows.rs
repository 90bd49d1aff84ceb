use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use gallery_types::api::{Claims, FollowResponse};
use gallery_types::models::User;

use crate::error::{ApiError, PathParam};
use crate::{AppState, blocking, convert};

pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(target), _): PathParam<Uuid>,
) -> Result<Json<FollowResponse>, ApiError> {
    if target == claims.sub {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let follower = claims.sub.to_string();
    let found = blocking(&state, move |db| {
        let target = target.to_string();
        if db.get_user_by_id(&target)?.is_none() {
            return Ok(false);
        }
        db.follow(&follower, &target)?;
        Ok(true)
    })
    .await?;

    if !found {
        return Err(ApiError::NotFound("User"));
    }
    Ok(Json(FollowResponse { following: true }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(target), _): PathParam<Uuid>,
) -> Result<Json<FollowResponse>, ApiError> {
    let follower = claims.sub.to_string();
    blocking(&state, move |db| db.unfollow(&follower, &target.to_string())).await?;
    Ok(Json(FollowResponse { following: false }))
}

pub async fn followers(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> Result<Json<Vec<User>>, ApiError> {
    let rows = blocking(&state, move |db| db.list_followers(&user_id.to_string())).await?;
    Ok(Json(rows.into_iter().map(convert::user).collect()))
}

pub async fn following(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> Result<Json<Vec<User>>, ApiError> {
    let rows = blocking(&state, move |db| db.list_following(&user_id.to_string())).await?;
    Ok(Json(rows.into_iter().map(convert::user).collect()))
}
