//! CSV translation dictionary.
//!
//! Expects a header row naming `word` and `translation` columns (in any
//! position, extra columns ignored). Keys are normalized, so lookups are
//! insensitive to case and surrounding whitespace.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use dictum_core::error::{DictumError, Result};
use dictum_core::traits::{TranslationLookup, NOT_FOUND_TRANSLATION};
use dictum_core::types::normalize;

use crate::csv::{split_record, strip_bom};

/// One dictionary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub word: String,
    pub translation: String,
}

/// Word → translation map.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: HashMap<String, DictionaryEntry>,
}

impl Dictionary {
    /// A dictionary with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse dictionary rows from a reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(DictumError::Dictionary("file is empty".to_string())),
        };
        let columns: Vec<String> = split_record(strip_bom(&header))
            .into_iter()
            .map(|c| normalize(&c))
            .collect();
        let word_col = column_index(&columns, "word")?;
        let translation_col = column_index(&columns, "translation")?;

        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_record(&line);
            let word = fields.get(word_col).map(|f| f.trim()).unwrap_or_default();
            let translation = fields
                .get(translation_col)
                .map(|f| f.trim())
                .unwrap_or_default();
            if word.is_empty() || translation.is_empty() {
                skipped += 1;
                continue;
            }
            entries.insert(
                normalize(word),
                DictionaryEntry {
                    word: word.to_string(),
                    translation: translation.to_string(),
                },
            );
        }

        if skipped > 0 {
            debug!("Skipped {} incomplete dictionary rows", skipped);
        }
        Ok(Self { entries })
    }

    /// Parse dictionary content held in memory.
    pub fn parse(content: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    /// Load a dictionary file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let dictionary = Self::from_reader(BufReader::new(file))?;
        info!(
            "Dictionary loaded from {} ({} entries)",
            path.display(),
            dictionary.len()
        );
        Ok(dictionary)
    }

    /// Load a dictionary file, falling back to an empty dictionary on error.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(dictionary) => dictionary,
            Err(e) => {
                warn!(
                    "Failed to load dictionary from {}: {}. Translations unavailable.",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&DictionaryEntry> {
        self.entries.get(&normalize(word))
    }
}

impl TranslationLookup for Dictionary {
    fn lookup(&self, word: &str) -> String {
        self.get(word)
            .map(|entry| entry.translation.clone())
            .unwrap_or_else(|| NOT_FOUND_TRANSLATION.to_string())
    }
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| DictumError::Dictionary(format!("header has no '{}' column", name)))
}
