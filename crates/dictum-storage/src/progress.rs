//! SQLite-backed progress persistence.

use std::sync::Arc;

use tracing::debug;

use dictum_core::error::{DictumError, Result};
use dictum_core::traits::ProgressStore;
use dictum_core::types::{normalize, ProgressSnapshot};

use crate::db::{storage_err, Database};

const MASTERED: &str = "mastered";
const MISSED: &str = "missed";

/// Repository for the mastered / missed word sets.
///
/// Every save replaces the stored sets wholesale inside one transaction, so
/// a crash mid-save leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct ProgressRepository {
    db: Arc<Database>,
}

impl ProgressRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Remove all stored progress.
    pub fn clear(&self) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM progress", [])
                .map_err(storage_err("Failed to clear progress"))?;
            Ok(())
        })
    }
}

impl ProgressStore for ProgressRepository {
    fn load_progress(&self) -> Result<ProgressSnapshot> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT word, status FROM progress ORDER BY position ASC")
                .map_err(storage_err("Failed to prepare progress query"))?;

            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(storage_err("Failed to query progress"))?;

            let mut snapshot = ProgressSnapshot::default();
            for row in rows {
                let (word, status) = row.map_err(storage_err("Failed to read progress row"))?;
                match status.as_str() {
                    MASTERED => snapshot.mastered.push(word),
                    MISSED => snapshot.missed.push(word),
                    other => {
                        return Err(DictumError::Storage(format!(
                            "Unknown progress status '{}' for word '{}'",
                            other, word
                        )))
                    }
                }
            }

            debug!(
                mastered = snapshot.mastered.len(),
                missed = snapshot.missed.len(),
                "Progress loaded"
            );
            Ok(snapshot)
        })
    }

    fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("Failed to begin progress transaction"))?;

            tx.execute("DELETE FROM progress", [])
                .map_err(storage_err("Failed to clear progress"))?;

            {
                let mut insert = tx
                    .prepare(
                        "INSERT OR REPLACE INTO progress (word_key, word, status, position)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(storage_err("Failed to prepare progress insert"))?;

                let rows = snapshot
                    .mastered
                    .iter()
                    .map(|w| (w, MASTERED))
                    .chain(snapshot.missed.iter().map(|w| (w, MISSED)));
                for (position, (word, status)) in rows.enumerate() {
                    insert
                        .execute(rusqlite::params![
                            normalize(word),
                            word.trim(),
                            status,
                            position as i64
                        ])
                        .map_err(storage_err("Failed to save progress row"))?;
                }
            }

            tx.commit()
                .map_err(storage_err("Failed to commit progress"))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ProgressRepository {
        let db = Arc::new(Database::in_memory().unwrap());
        ProgressRepository::new(db)
    }

    fn snapshot(mastered: &[&str], missed: &[&str]) -> ProgressSnapshot {
        ProgressSnapshot {
            mastered: mastered.iter().map(|s| s.to_string()).collect(),
            missed: missed.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_load_empty() {
        let repo = setup();
        assert!(repo.load_progress().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let repo = setup();
        let saved = snapshot(&["habit", "litter"], &["cause"]);
        repo.save_progress(&saved).unwrap();
        assert_eq!(repo.load_progress().unwrap(), saved);
    }

    #[test]
    fn test_save_preserves_order() {
        let repo = setup();
        let saved = snapshot(&[], &["zeal", "apple", "mango"]);
        repo.save_progress(&saved).unwrap();
        assert_eq!(repo.load_progress().unwrap().missed, vec!["zeal", "apple", "mango"]);
    }

    #[test]
    fn test_save_replaces_previous() {
        let repo = setup();
        repo.save_progress(&snapshot(&[], &["cause"])).unwrap();
        repo.save_progress(&snapshot(&["cause"], &[])).unwrap();

        let loaded = repo.load_progress().unwrap();
        assert_eq!(loaded.mastered, vec!["cause"]);
        assert!(loaded.missed.is_empty());
    }

    #[test]
    fn test_unknown_status_is_error() {
        let repo = setup();
        repo.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO progress (word_key, word, status, position) VALUES ('cause', 'cause', 'forgotten', 0)",
                    [],
                )
                .map_err(|e| DictumError::Storage(e.to_string()))?;
                Ok(())
            })
            .unwrap();

        let err = repo.load_progress().unwrap_err();
        assert!(matches!(err, DictumError::Storage(_)));
        assert!(err.to_string().contains("forgotten"));
    }

    #[test]
    fn test_clear() {
        let repo = setup();
        repo.save_progress(&snapshot(&["a"], &["b"])).unwrap();
        repo.clear().unwrap();
        assert!(repo.load_progress().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");
        {
            let repo = ProgressRepository::new(Arc::new(Database::new(&path).unwrap()));
            repo.save_progress(&snapshot(&["habit"], &["cause"])).unwrap();
        }
        let repo = ProgressRepository::new(Arc::new(Database::new(&path).unwrap()));
        assert_eq!(repo.load_progress().unwrap(), snapshot(&["habit"], &["cause"]));
    }
}
