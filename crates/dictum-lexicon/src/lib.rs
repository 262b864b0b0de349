//! Dictum Lexicon crate - word-list import and translation dictionary.
//!
//! Turns uploaded text / CSV files into named [`WordList`]s and loads the
//! `word,translation` CSV used to show a translation next to each judged word.
//!
//! [`WordList`]: dictum_core::types::WordList

mod csv;
pub mod dictionary;
pub mod import;

pub use dictionary::{Dictionary, DictionaryEntry};
pub use import::{build_word_list, import_file, parse_words, ImportFormat};
