pub mod config;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use config::{DictumConfig, DrillSettings};
pub use error::{DictumError, Result};
pub use events::DrillEvent;
pub use traits::{
    MemoryProgressStore, NoTranslations, ProgressStore, TranslationLookup, NOT_FOUND_TRANSLATION,
};
pub use types::*;
