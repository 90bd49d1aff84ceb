use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                first_name          TEXT,
                last_name           TEXT,
                profile_image_url   TEXT,
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE media (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                filename        TEXT NOT NULL,
                url             TEXT NOT NULL,
                media_type      TEXT NOT NULL,
                liked           INTEGER NOT NULL DEFAULT 0,
                display_order   INTEGER NOT NULL DEFAULT 0,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_media_order ON media(display_order, created_at);
            CREATE INDEX idx_media_user ON media(user_id);
            CREATE INDEX idx_media_filename ON media(filename, media_type);

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id    INTEGER NOT NULL REFERENCES media(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_media ON comments(media_id, created_at);

            CREATE TABLE reactions (
                media_id    INTEGER NOT NULL REFERENCES media(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                emoji       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (media_id, user_id, emoji)
            );

            CREATE TABLE follows (
                follower_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                following_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (follower_id, following_id)
            );

            CREATE INDEX idx_follows_following ON follows(following_id);

            -- One process-wide Spotify grant
            CREATE TABLE spotify_tokens (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                access_token    TEXT NOT NULL,
                refresh_token   TEXT NOT NULL,
                expires_at      INTEGER NOT NULL,
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
