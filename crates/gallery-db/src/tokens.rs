use crate::Database;
use crate::models::SpotifyTokenRow;
use anyhow::Result;
use rusqlite::OptionalExtension;

impl Database {
    // -- Spotify --

    pub fn load_spotify_token(&self) -> Result<Option<SpotifyTokenRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT access_token, refresh_token, expires_at FROM spotify_tokens WHERE id = 1",
                    [],
                    |row| {
                        Ok(SpotifyTokenRow {
                            access_token: row.get(0)?,
                            refresh_token: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Replace the single stored grant.
    pub fn save_spotify_token(&self, token: &SpotifyTokenRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO spotify_tokens (id, access_token, refresh_token, expires_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    updated_at = datetime('now')",
                rusqlite::params![token.access_token, token.refresh_token, token.expires_at],
            )?;
            Ok(())
        })
    }

    pub fn clear_spotify_token(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM spotify_tokens", [])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_row_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_spotify_token().unwrap().is_none());

        let first = SpotifyTokenRow {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
            expires_at: 1_000,
        };
        db.save_spotify_token(&first).unwrap();

        let second = SpotifyTokenRow {
            access_token: "a2".into(),
            refresh_token: "r1".into(),
            expires_at: 2_000,
        };
        db.save_spotify_token(&second).unwrap();
        assert_eq!(db.load_spotify_token().unwrap(), Some(second));

        db.clear_spotify_token().unwrap();
        assert!(db.load_spotify_token().unwrap().is_none());
    }
}
