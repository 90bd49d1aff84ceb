use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use gallery_db::queries::ProfileUpdate;
use gallery_types::api::Claims;
use gallery_types::models::{Media, User};

use crate::error::{ApiError, PathParam};
use crate::{AppState, auth, blocking, convert, media};

/// 10 MB profile picture limit.
pub const MAX_PROFILE_IMAGE_SIZE: usize = 10 * 1024 * 1024;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let rows = blocking(&state, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(convert::user).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> Result<Json<User>, ApiError> {
    let row = blocking(&state, move |db| db.get_user_by_id(&user_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(convert::user(row)))
}

/// Media uploaded by one user, in gallery order.
pub async fn user_media(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<Uuid>,
) -> Result<Json<Vec<Media>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let id = user_id.to_string();
        if db.get_user_by_id(&id)?.is_none() {
            return Ok(None);
        }
        db.list_media_by_user(&id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(rows.into_iter().map(convert::media).collect()))
}

/// POST /api/auth/user/update: multipart with optional `firstName`,
/// `lastName` and `profileImage`. Absent or blank fields are left unchanged.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<User>, ApiError> {
    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("firstName") => update.first_name = auth::clean_name(Some(field.text().await?))?,
            Some("lastName") => update.last_name = auth::clean_name(Some(field.text().await?))?,
            Some("profileImage") => {
                let mime = field.content_type().unwrap_or_default().to_string();
                if !mime.starts_with("image/") {
                    return Err(ApiError::bad_request("Profile image must be an image"));
                }
                let data = field.bytes().await?;
                if data.is_empty() {
                    continue;
                }
                if data.len() > MAX_PROFILE_IMAGE_SIZE {
                    return Err(ApiError::bad_request("Profile image is too large"));
                }
                update.profile_image_url = Some(media::to_data_url(&mime, &data));
            }
            _ => continue,
        }
    }

    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| db.update_user_profile(&user_id, &update))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Updated profile for user {}", claims.sub);
    Ok(Json(convert::user(row)))
}
