use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use axum_extra::extract::WithRejection;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use tracing::{error, info, warn};

use gallery_db::models::NewMedia;
use gallery_types::api::{DuplicatesResponse, LikeRequest, SuccessResponse, UpdateImageRequest};
use gallery_types::models::{Media, MediaType};

use crate::error::{ApiError, JsonBody, PathParam};
use crate::middleware::MaybeClaims;
use crate::{AppState, blocking, convert};

/// Files accepted per upload request.
pub const MAX_FILES: usize = 10;

/// 100 MB per file.
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

pub async fn list_media(State(state): State<AppState>) -> Result<Json<Vec<Media>>, ApiError> {
    let rows = blocking(&state, |db| db.list_media()).await?;
    Ok(Json(rows.into_iter().map(convert::media).collect()))
}

pub async fn get_media(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i64>,
) -> Result<Json<Media>, ApiError> {
    let row = blocking(&state, move |db| db.get_media(id))
        .await?
        .ok_or(ApiError::NotFound("Media"))?;
    Ok(Json(convert::media(row)))
}

/// POST /api/media/upload: multipart `files` fields, each stored inline as a
/// data URL. Bad files are skipped so one stray attachment does not sink the
/// batch.
pub async fn upload_media(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<Vec<Media>>, ApiError> {
    let owner = claims.map(|c| c.sub.to_string());

    let mut pending = Vec::new();
    let mut received = 0usize;
    let mut rejected = 0usize;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        received += 1;
        if received > MAX_FILES {
            return Err(ApiError::bad_request(format!(
                "Too many files (max {})",
                MAX_FILES
            )));
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        let Some(media_type) = MediaType::from_mime(&mime) else {
            warn!("Skipping upload '{}': unsupported type '{}'", filename, mime);
            rejected += 1;
            continue;
        };
        if data.is_empty() {
            warn!("Skipping upload '{}': empty file", filename);
            rejected += 1;
            continue;
        }
        if data.len() > MAX_FILE_SIZE {
            warn!("Skipping upload '{}': {} bytes exceeds limit", filename, data.len());
            rejected += 1;
            continue;
        }

        pending.push(NewMedia {
            url: to_data_url(&mime, &data),
            filename,
            media_type: media_type.as_str().to_string(),
            user_id: owner.clone(),
        });
    }

    if received == 0 {
        return Err(ApiError::bad_request("No files uploaded"));
    }
    if pending.is_empty() {
        return Err(ApiError::bad_request("Only image and video files are allowed"));
    }

    let attempted = pending.len();
    let mut created = Vec::with_capacity(attempted);
    for new in pending {
        let filename = new.filename.clone();
        match blocking(&state, move |db| db.insert_media(&new)).await {
            Ok(row) => created.push(convert::media(row)),
            Err(e) => error!("Failed to store upload '{}': {}", filename, e),
        }
    }

    if created.is_empty() {
        return Err(anyhow::anyhow!("no uploaded file could be stored").into());
    }

    info!(
        "Uploaded {} media ({} rejected, {} failed)",
        created.len(),
        rejected,
        attempted - created.len()
    );
    Ok(Json(created))
}

/// Sets the flag rather than flipping it, so retries are harmless.
pub async fn set_liked(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<LikeRequest>,
) -> Result<Json<Media>, ApiError> {
    let row = blocking(&state, move |db| db.set_media_liked(id, req.liked))
        .await?
        .ok_or(ApiError::NotFound("Media"))?;
    Ok(Json(convert::media(row)))
}

pub async fn delete_media(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !blocking(&state, move |db| db.delete_media(id)).await? {
        return Err(ApiError::NotFound("Media"));
    }
    info!("Deleted media {}", id);
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/media/reorder: `{ orderedIds: [..] }`. The body is inspected by
/// hand so a wrong shape gets a specific message.
pub async fn reorder_media(
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody<Value>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let ordered_ids = parse_ordered_ids(&body)?;
    let updated = blocking(&state, move |db| db.reorder_media(&ordered_ids)).await?;
    info!("Reordered {} media", updated);
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn duplicates(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i64>,
) -> Result<Json<DuplicatesResponse>, ApiError> {
    let rows = blocking(&state, move |db| db.find_duplicates(id))
        .await?
        .ok_or(ApiError::NotFound("Media"))?;
    Ok(Json(DuplicatesResponse {
        duplicates: rows.into_iter().map(convert::media).collect(),
    }))
}

/// Replace an image with an edited version supplied as a data URL.
pub async fn update_image(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<UpdateImageRequest>,
) -> Result<Json<Media>, ApiError> {
    if !is_image_data_url(&req.image_data) {
        return Err(ApiError::bad_request("imageData must be a base64 image data URL"));
    }

    let row = blocking(&state, move |db| {
        let Some(existing) = db.get_media(id)? else {
            return Ok(Err(ApiError::NotFound("Media")));
        };
        if existing.media_type != MediaType::Image.as_str() {
            return Ok(Err(ApiError::bad_request("Only images can be edited")));
        }
        Ok(db
            .update_media_url(id, &req.image_data)?
            .ok_or(ApiError::NotFound("Media")))
    })
    .await??;

    Ok(Json(convert::media(row)))
}

fn parse_ordered_ids(body: &Value) -> Result<Vec<i64>, ApiError> {
    let items = body
        .get("orderedIds")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::bad_request("orderedIds must be an array"))?;

    items
        .iter()
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| ApiError::bad_request("orderedIds must contain integer ids"))
        })
        .collect()
}

pub(crate) fn to_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

fn is_image_data_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("data:image/") else {
        return false;
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    !payload.is_empty() && STANDARD.decode(payload).is_ok()
}
