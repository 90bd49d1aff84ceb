//! Row → wire conversions. Corrupt columns are logged and defaulted rather
//! than failing the whole listing.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use gallery_db::models::{CommentRow, MediaRow, UserRow, parse_timestamp};
use gallery_types::models::{Comment, CommentAuthor, Media, MediaType, User};

pub(crate) fn media(row: MediaRow) -> Media {
    let media_type = row.media_type.parse().unwrap_or_else(|e| {
        warn!("Corrupt media_type on media {}: {}", row.id, e);
        MediaType::Image
    });
    let user_id = row.user_id.as_deref().map(|raw| uuid(raw, "media", row.id));
    let created_at = timestamp(&row.created_at, "media", row.id);

    Media {
        id: row.id,
        filename: row.filename,
        url: row.url,
        media_type,
        liked: row.liked,
        display_order: row.display_order,
        user_id,
        created_at,
    }
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: uuid(&row.id, "user", &row.id),
        created_at: timestamp(&row.created_at, "user", &row.id),
        updated_at: timestamp(&row.updated_at, "user", &row.id),
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        profile_image_url: row.profile_image_url,
    }
}

pub(crate) fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        media_id: row.media_id,
        user_id: uuid(&row.user_id, "comment", row.id),
        text: row.text,
        created_at: timestamp(&row.created_at, "comment", row.id),
        user: CommentAuthor {
            first_name: row.author_first_name,
            last_name: row.author_last_name,
            profile_image_url: row.author_profile_image_url,
        },
    }
}

pub(crate) fn uuid(raw: &str, entity: &str, id: impl std::fmt::Display) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' on {} '{}': {}", raw, entity, id, e);
        Uuid::default()
    })
}

fn timestamp(raw: &str, entity: &str, id: impl std::fmt::Display) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {} '{}'", raw, entity, id);
        DateTime::default()
    })
}
