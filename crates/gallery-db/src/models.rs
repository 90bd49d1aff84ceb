//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire types in gallery-types.

use chrono::{DateTime, NaiveDateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MediaRow {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub media_type: String,
    pub liked: bool,
    pub display_order: i64,
    pub user_id: Option<String>,
    pub created_at: String,
}

/// Input for a media insert; display order is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub url: String,
    pub media_type: String,
    pub user_id: Option<String>,
}

/// A comment joined with its author's public profile fields.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub media_id: i64,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub author_profile_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub media_id: i64,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyTokenRow {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix milliseconds.
    pub expires_at: i64,
}

/// Parse a stored timestamp. SQLite's `datetime('now')` yields
/// "YYYY-MM-DD HH:MM:SS" without a zone; RFC 3339 is accepted too.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let sqlite = parse_timestamp("2024-03-05 10:11:12").unwrap();
        assert_eq!((sqlite.year(), sqlite.month(), sqlite.day()), (2024, 3, 5));
        assert_eq!(sqlite.hour(), 10);

        let rfc = parse_timestamp("2024-03-05T10:11:12Z").unwrap();
        assert_eq!(rfc, sqlite);

        assert!(parse_timestamp("yesterday").is_none());
    }
}
