use crate::Database;
use crate::models::{MediaRow, NewMedia, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

const MEDIA_COLUMNS: &str =
    "id, filename, url, media_type, liked, display_order, user_id, created_at";

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, profile_image_url, created_at, updated_at";

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl Database {
    // -- Media --

    /// Presentation order: display order, then newest first.
    pub fn list_media(&self) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEDIA_COLUMNS} FROM media
                 ORDER BY display_order ASC, created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_media)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_media_by_user(&self, user_id: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEDIA_COLUMNS} FROM media WHERE user_id = ?1
                 ORDER BY display_order ASC, created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_media)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_media(&self, id: i64) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| query_media(conn, id))
    }

    /// Insert at the end of the current order.
    pub fn insert_media(&self, media: &NewMedia) -> Result<MediaRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let max_order: Option<i64> =
                tx.query_row("SELECT MAX(display_order) FROM media", [], |r| r.get(0))?;
            let next_order = max_order.map_or(0, |max| max + 1);

            tx.execute(
                "INSERT INTO media (filename, url, media_type, liked, display_order, user_id)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                rusqlite::params![
                    media.filename,
                    media.url,
                    media.media_type,
                    next_order,
                    media.user_id
                ],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_media(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Inserted media {} vanished", id))?;

            tx.commit()?;
            Ok(row)
        })
    }

    /// Sets (not flips) the flag, so repeating a value is a no-op.
    pub fn set_media_liked(&self, id: i64, liked: bool) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE media SET liked = ?1 WHERE id = ?2", rusqlite::params![liked, id])?;
            if changed == 0 {
                return Ok(None);
            }
            query_media(conn, id)
        })
    }

    pub fn update_media_url(&self, id: i64, url: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE media SET url = ?1 WHERE id = ?2", rusqlite::params![url, id])?;
            if changed == 0 {
                return Ok(None);
            }
            query_media(conn, id)
        })
    }

    /// Returns false when nothing was deleted.
    pub fn delete_media(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM media WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    /// Assign `display_order = index` for each id. Unknown ids are skipped.
    /// Returns how many rows were updated.
    pub fn reorder_media(&self, ordered_ids: &[i64]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;
            {
                let mut stmt = tx.prepare("UPDATE media SET display_order = ?1 WHERE id = ?2")?;
                for (index, id) in ordered_ids.iter().enumerate() {
                    updated += stmt.execute(rusqlite::params![index as i64, id])?;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Media sharing filename and media type with `id`, excluding itself.
    /// `None` when `id` does not exist.
    pub fn find_duplicates(&self, id: i64) -> Result<Option<Vec<MediaRow>>> {
        self.with_conn(|conn| {
            let Some(original) = query_media(conn, id)? else {
                return Ok(None);
            };

            let sql = format!(
                "SELECT {MEDIA_COLUMNS} FROM media
                 WHERE filename = ?1 AND media_type = ?2 AND id != ?3
                 ORDER BY display_order ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![original.filename, original.media_type, id],
                    map_media,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Some(rows))
        })
    }

    // -- Users --

    /// Returns false, inserting nothing, when the email is already taken.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![id, email, password_hash, first_name, last_name],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            let row = conn.query_row(&sql, [email], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, email ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_user_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    first_name = COALESCE(?1, first_name),
                    last_name = COALESCE(?2, last_name),
                    profile_image_url = COALESCE(?3, profile_image_url),
                    updated_at = datetime('now')
                 WHERE id = ?4",
                rusqlite::params![
                    update.first_name,
                    update.last_name,
                    update.profile_image_url,
                    id
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, id)
        })
    }
}

pub(crate) fn map_media(row: &Row<'_>) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        url: row.get(2)?,
        media_type: row.get(3)?,
        liked: row.get(4)?,
        display_order: row.get(5)?,
        user_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        profile_image_url: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn query_media(conn: &Connection, id: i64) -> Result<Option<MediaRow>> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_media).optional()?;
    Ok(row)
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_user).optional()?;
    Ok(row)
}
