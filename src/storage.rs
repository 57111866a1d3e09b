//! SQLite storage layer for search history, favorites, and user settings

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::migrations::run_migrations;
use crate::settings::{Settings, SettingsPatch};
use crate::types::SearchRecord;

/// Maximum number of history entries a query returns
const HISTORY_LIMIT: i64 = 50;

/// Storage backend using SQLite
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ========== Search history ==========

    /// Record a search: inserts the word or bumps its count and recency
    pub fn record_search(&self, word: &str) -> Result<()> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO searches (word, search_count, last_searched, created_at)
            VALUES (?1, 1, ?2, ?2)
            ON CONFLICT(word) DO UPDATE SET
                search_count = search_count + 1,
                last_searched = excluded.last_searched
            "#,
            params![word, now],
        )?;
        debug!("Recorded search for '{}'", word);
        Ok(())
    }

    /// Get recent searches, most recent first, capped at 50
    pub fn search_history(&self, favorites_only: bool) -> Result<Vec<SearchRecord>> {
        let conn = self.conn.lock();
        let sql = if favorites_only {
            r#"
            SELECT id, word, search_count, last_searched, created_at, is_favorite, favorited_at
            FROM searches
            WHERE is_favorite = 1
            ORDER BY last_searched DESC
            LIMIT ?1
            "#
        } else {
            r#"
            SELECT id, word, search_count, last_searched, created_at, is_favorite, favorited_at
            FROM searches
            ORDER BY last_searched DESC
            LIMIT ?1
            "#
        };

        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map([HISTORY_LIMIT], |row| {
                let last_searched: String = row.get(3)?;
                let created_at: String = row.get(4)?;
                let favorited_at: Option<String> = row.get(6)?;

                Ok(SearchRecord {
                    id: row.get(0)?,
                    word: row.get(1)?,
                    search_count: row.get::<_, i64>(2)? as u32,
                    last_searched: parse_timestamp(&last_searched),
                    created_at: parse_timestamp(&created_at),
                    is_favorite: row.get::<_, i64>(5)? != 0,
                    favorited_at: favorited_at
                        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Mark or unmark a word as favorite.
    ///
    /// Favoriting a word that was never searched creates its record so the
    /// favorite has somewhere to live.
    pub fn set_favorite(&self, word: &str, favorite: bool) -> Result<()> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        if favorite {
            conn.execute(
                r#"
                INSERT INTO searches (word, search_count, last_searched, created_at, is_favorite, favorited_at)
                VALUES (?1, 1, ?2, ?2, 1, ?2)
                ON CONFLICT(word) DO UPDATE SET
                    is_favorite = 1,
                    favorited_at = excluded.favorited_at
                "#,
                params![word, now],
            )?;
        } else {
            conn.execute(
                "UPDATE searches SET is_favorite = 0, favorited_at = NULL WHERE word = ?1",
                params![word],
            )?;
        }
        Ok(())
    }

    /// Check whether a word is favorited
    pub fn is_favorite(&self, word: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let flag: Option<i64> = conn
            .query_row(
                "SELECT is_favorite FROM searches WHERE word = ?1",
                params![word],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.unwrap_or(0) != 0)
    }

    // ========== Settings ==========

    /// Save or update a raw setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get a raw setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// All stored settings rows
    pub fn setting_rows(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Effective settings: compiled defaults overlaid with stored rows
    pub fn effective_settings(&self) -> Result<Settings> {
        let rows = self.setting_rows()?;
        Ok(Settings::resolve(&rows))
    }

    /// Persist a settings patch, one row per provided top-level key
    pub fn save_settings(&self, patch: &SettingsPatch) -> Result<()> {
        let value = serde_json::to_value(patch)?;
        if let Some(object) = value.as_object() {
            for (key, subtree) in object {
                self.set_setting(key, &subtree.to_string())?;
            }
            debug!("Saved {} settings key(s)", object.len());
        }
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
