use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;

use gallery_db::models::ReactionRow;
use gallery_types::api::{Claims, ReactionGroup, ToggleReactionRequest, ToggleReactionResponse};

use crate::error::{ApiError, JsonBody, PathParam};
use crate::{AppState, blocking, convert};

/// Emoji are opaque strings; this bounds multi-codepoint sequences.
pub const MAX_EMOJI_BYTES: usize = 32;

pub async fn list_reactions(
    State(state): State<AppState>,
    WithRejection(Path(media_id), _): PathParam<i64>,
) -> Result<Json<Vec<ReactionGroup>>, ApiError> {
    let rows = blocking(&state, move |db| db.list_reactions(media_id)).await?;
    Ok(Json(group_reactions(rows)))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(media_id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<ToggleReactionRequest>,
) -> Result<Json<ToggleReactionResponse>, ApiError> {
    let emoji = req.emoji.trim().to_string();
    if emoji.is_empty() || emoji.len() > MAX_EMOJI_BYTES {
        return Err(ApiError::bad_request("Invalid emoji"));
    }

    let user_id = claims.sub.to_string();
    let added = blocking(&state, move |db| {
        if db.get_media(media_id)?.is_none() {
            return Ok(None);
        }
        db.toggle_reaction(media_id, &user_id, &emoji).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Media"))?;

    Ok(Json(ToggleReactionResponse { added }))
}

/// Group rows by emoji, keeping the order each emoji first appeared in.
fn group_reactions(rows: Vec<ReactionRow>) -> Vec<ReactionGroup> {
    let mut groups: Vec<ReactionGroup> = Vec::new();
    for row in rows {
        let user_id = convert::uuid(&row.user_id, "reaction on media", row.media_id);
        match groups.iter_mut().find(|g| g.emoji == row.emoji) {
            Some(group) => {
                group.count += 1;
                group.user_ids.push(user_id);
            }
            None => groups.push(ReactionGroup {
                emoji: row.emoji,
                count: 1,
                user_ids: vec![user_id],
            }),
        }
    }
    groups
}
