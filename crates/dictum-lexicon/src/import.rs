//! Word-list import from uploaded text or CSV files.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use dictum_core::error::{DictumError, Result};
use dictum_core::types::{normalize, WordList};

use crate::csv::{split_record, strip_bom};

/// Layout of an uploaded word list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// One word per line.
    PlainText,
    /// Comma-separated; the first column holds the word.
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension. Anything but `.csv` is text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::PlainText,
        }
    }
}

/// Extract the words of an upload, in file order.
///
/// Lines are trimmed and empty lines dropped. For CSV input only the first
/// column is kept and a leading `word` header is skipped. Repeated words
/// (compared case-insensitively) keep their first occurrence.
pub fn parse_words(content: &str, format: ImportFormat) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = if index == 0 { strip_bom(raw) } else { raw };

        let word = match format {
            ImportFormat::PlainText => line.trim().to_string(),
            ImportFormat::Csv => {
                let first = split_record(line).into_iter().next().unwrap_or_default();
                let first = first.trim().to_string();
                if index == 0 && first.eq_ignore_ascii_case("word") {
                    continue;
                }
                first
            }
        };

        if word.is_empty() {
            continue;
        }
        if !seen.insert(normalize(&word)) {
            debug!(word = %word, "Skipping repeated word");
            continue;
        }
        words.push(word);
    }

    words
}

/// Build a named word list from upload content.
///
/// Rejects an empty name and content that yields no words.
pub fn build_word_list(name: &str, content: &str, format: ImportFormat) -> Result<WordList> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DictumError::Import(
            "a name is required for the word list".to_string(),
        ));
    }

    let words = parse_words(content, format);
    if words.is_empty() {
        return Err(DictumError::Import(format!(
            "word list '{}' contains no words",
            name
        )));
    }

    Ok(WordList::new(name, words))
}

/// Read and parse a word-list file.
pub fn import_file(path: &Path, name: &str) -> Result<WordList> {
    let content = std::fs::read_to_string(path)?;
    let list = build_word_list(name, &content, ImportFormat::from_path(path))?;
    info!(
        "Imported word list '{}' ({} words) from {}",
        list.name,
        list.len(),
        path.display()
    );
    Ok(list)
}
