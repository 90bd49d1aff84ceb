use crate::Database;
use crate::models::{CommentRow, ReactionRow, UserRow};
use crate::queries::map_user;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Comments --

    pub fn insert_comment(&self, media_id: i64, user_id: &str, text: &str) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (media_id, user_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![media_id, user_id, text],
            )?;
            let id = conn.last_insert_rowid();
            query_comment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Inserted comment {} vanished", id))
        })
    }

    /// Oldest first, joined with author profile fields.
    pub fn list_comments(&self, media_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch author fields in one query
            let mut stmt = conn.prepare(
                "SELECT c.id, c.media_id, c.user_id, c.text, c.created_at,
                        u.first_name, u.last_name, u.profile_image_url
                 FROM comments c
                 LEFT JOIN users u ON c.user_id = u.id
                 WHERE c.media_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([media_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Reactions --

    /// Toggle a reaction: removes it if present, inserts it otherwise.
    /// Returns true when the reaction was added.
    pub fn toggle_reaction(&self, media_id: i64, user_id: &str, emoji: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM reactions WHERE media_id = ?1 AND user_id = ?2 AND emoji = ?3",
                rusqlite::params![media_id, user_id, emoji],
            )?;
            let added = removed == 0;
            if added {
                tx.execute(
                    "INSERT INTO reactions (media_id, user_id, emoji) VALUES (?1, ?2, ?3)",
                    rusqlite::params![media_id, user_id, emoji],
                )?;
            }
            tx.commit()?;
            Ok(added)
        })
    }

    pub fn list_reactions(&self, media_id: i64) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT media_id, user_id, emoji, created_at FROM reactions
                 WHERE media_id = ?1
                 ORDER BY created_at ASC, emoji ASC",
            )?;
            let rows = stmt
                .query_map([media_id], |row| {
                    Ok(ReactionRow {
                        media_id: row.get(0)?,
                        user_id: row.get(1)?,
                        emoji: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Idempotent. Returns true when a new follow row was created.
    pub fn follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                rusqlite::params![follower_id, following_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                rusqlite::params![follower_id, following_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Users following `user_id`.
    pub fn list_followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.password, u.first_name, u.last_name,
                        u.profile_image_url, u.created_at, u.updated_at
                 FROM follows f JOIN users u ON u.id = f.follower_id
                 WHERE f.following_id = ?1
                 ORDER BY f.created_at ASC, u.email ASC",
                user_id,
            )
        })
    }

    /// Users that `user_id` follows.
    pub fn list_following(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.password, u.first_name, u.last_name,
                        u.profile_image_url, u.created_at, u.updated_at
                 FROM follows f JOIN users u ON u.id = f.following_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at ASC, u.email ASC",
                user_id,
            )
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        media_id: row.get(1)?,
        user_id: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
        author_first_name: row.get(5)?,
        author_last_name: row.get(6)?,
        author_profile_image_url: row.get(7)?,
    })
}

fn query_comment(conn: &Connection, id: i64) -> Result<Option<CommentRow>> {
    let row = conn
        .query_row(
            "SELECT c.id, c.media_id, c.user_id, c.text, c.created_at,
                    u.first_name, u.last_name, u.profile_image_url
             FROM comments c
             LEFT JOIN users u ON c.user_id = u.id
             WHERE c.id = ?1",
            [id],
            map_comment,
        )
        .optional()?;
    Ok(row)
}

fn query_users(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMedia;

    fn seed() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "ada@example.com", "hash", Some("Ada"), None).unwrap();
        db.create_user("u2", "bob@example.com", "hash", Some("Bob"), None).unwrap();
        let media = db
            .insert_media(&NewMedia {
                filename: "a.png".into(),
                url: "data:image/png;base64,AAAA".into(),
                media_type: "image".into(),
                user_id: Some("u1".into()),
            })
            .unwrap();
        (db, media.id)
    }

    #[test]
    fn comments_carry_author_fields() {
        let (db, media_id) = seed();
        let first = db.insert_comment(media_id, "u2", "nice").unwrap();
        db.insert_comment(media_id, "u1", "thanks").unwrap();

        assert_eq!(first.author_first_name.as_deref(), Some("Bob"));

        let listed = db.list_comments(media_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text, "nice");
        assert_eq!(listed[1].author_first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn deleting_media_cascades() {
        let (db, media_id) = seed();
        let comment = db.insert_comment(media_id, "u2", "nice").unwrap();
        db.toggle_reaction(media_id, "u2", "🔥").unwrap();

        assert!(db.delete_media(media_id).unwrap());
        assert!(db.get_comment(comment.id).unwrap().is_none());
        assert!(db.list_reactions(media_id).unwrap().is_empty());
    }

    #[test]
    fn reaction_toggles() {
        let (db, media_id) = seed();
        assert!(db.toggle_reaction(media_id, "u2", "🔥").unwrap());
        assert!(db.toggle_reaction(media_id, "u1", "🔥").unwrap());
        assert_eq!(db.list_reactions(media_id).unwrap().len(), 2);

        assert!(!db.toggle_reaction(media_id, "u2", "🔥").unwrap());
        let remaining = db.list_reactions(media_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, "u1");
    }

    #[test]
    fn follow_is_idempotent() {
        let (db, _) = seed();
        assert!(db.follow("u1", "u2").unwrap());
        assert!(!db.follow("u1", "u2").unwrap());

        let followers = db.list_followers("u2").unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, "u1");
        assert_eq!(db.list_following("u1").unwrap()[0].id, "u2");
        assert!(db.list_following("u2").unwrap().is_empty());

        assert!(db.unfollow("u1", "u2").unwrap());
        assert!(!db.unfollow("u1", "u2").unwrap());
        assert!(db.list_followers("u2").unwrap().is_empty());
    }
}
