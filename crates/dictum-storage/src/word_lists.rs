//! Repository for imported word lists.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::info;
use uuid::Uuid;

use dictum_core::error::{DictumError, Result};
use dictum_core::types::WordList;

use crate::db::{storage_err, Database};

/// A stored list without its words.
#[derive(Debug, Clone, PartialEq)]
pub struct WordListSummary {
    pub id: Uuid,
    pub name: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Repository for named word lists. Word order is preserved.
#[derive(Debug, Clone)]
pub struct WordListRepository {
    db: Arc<Database>,
}

impl WordListRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a list. Saving an existing id replaces its name and words.
    pub fn save(&self, list: &WordList) -> Result<()> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("Failed to begin word list transaction"))?;

            tx.execute(
                "INSERT OR REPLACE INTO word_lists (id, name, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    list.id.to_string(),
                    list.name,
                    list.created_at.timestamp_millis()
                ],
            )
            .map_err(storage_err("Failed to save word list"))?;

            tx.execute(
                "DELETE FROM word_list_entries WHERE list_id = ?1",
                rusqlite::params![list.id.to_string()],
            )
            .map_err(storage_err("Failed to replace word list entries"))?;

            {
                let mut insert = tx
                    .prepare(
                        "INSERT INTO word_list_entries (list_id, position, word) VALUES (?1, ?2, ?3)",
                    )
                    .map_err(storage_err("Failed to prepare entry insert"))?;
                for (position, word) in list.words.iter().enumerate() {
                    insert
                        .execute(rusqlite::params![list.id.to_string(), position as i64, word])
                        .map_err(storage_err("Failed to save word list entry"))?;
                }
            }

            tx.commit()
                .map_err(storage_err("Failed to commit word list"))?;
            info!("Saved word list '{}' ({} words)", list.name, list.len());
            Ok(())
        })
    }

    /// All stored lists, newest first.
    pub fn list(&self) -> Result<Vec<WordListSummary>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT l.id, l.name, l.created_at, COUNT(e.word)
                     FROM word_lists l
                     LEFT JOIN word_list_entries e ON e.list_id = l.id
                     GROUP BY l.id
                     ORDER BY l.created_at DESC, l.name ASC",
                )
                .map_err(storage_err("Failed to prepare word list query"))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(storage_err("Failed to query word lists"))?;

            let mut summaries = Vec::new();
            for row in rows {
                let (id, name, created_at, count) =
                    row.map_err(storage_err("Failed to read word list row"))?;
                summaries.push(WordListSummary {
                    id: parse_id(&id)?,
                    name,
                    word_count: count as usize,
                    created_at: from_millis(created_at)?,
                });
            }
            Ok(summaries)
        })
    }

    /// Fetch a list with its words.
    pub fn get(&self, id: Uuid) -> Result<Option<WordList>> {
        self.db.with_conn(|conn| {
            let header = conn
                .query_row(
                    "SELECT name, created_at FROM word_lists WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()
                .map_err(storage_err("Failed to query word list"))?;

            let Some((name, created_at)) = header else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT word FROM word_list_entries WHERE list_id = ?1 ORDER BY position ASC",
                )
                .map_err(storage_err("Failed to prepare entry query"))?;
            let words = stmt
                .query_map(rusqlite::params![id.to_string()], |row| row.get::<_, String>(0))
                .map_err(storage_err("Failed to query word list entries"))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err("Failed to read word list entry"))?;

            Ok(Some(WordList {
                id,
                name,
                words,
                created_at: from_millis(created_at)?,
            }))
        })
    }

    /// Fetch the most recently created list with the given name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<WordList>> {
        let id = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM word_lists WHERE name = ?1 ORDER BY created_at DESC LIMIT 1",
                rusqlite::params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(storage_err("Failed to query word list by name"))
        })?;

        match id {
            Some(id) => self.get(parse_id(&id)?),
            None => Ok(None),
        }
    }

    /// The most recently created list, if any.
    pub fn latest(&self) -> Result<Option<WordList>> {
        match self.list()?.first() {
            Some(summary) => self.get(summary.id),
            None => Ok(None),
        }
    }

    /// Delete a list and its words. Returns whether a list was removed.
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        self.db.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM word_lists WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(storage_err("Failed to delete word list"))?;
            Ok(removed > 0)
        })
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| DictumError::Storage(format!("Invalid word list id: {}", e)))
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| DictumError::Storage(format!("Invalid timestamp: {}", millis)))
}
