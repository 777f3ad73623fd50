//! Tag generation and storage.

mod sqlite;
mod tagger;
mod types;

pub use sqlite::{creator_identity, SqliteTagStore, DEFAULT_CREATOR_POOL};
pub use tagger::ImdbTagger;
pub use types::{TagBatch, TagOperation, TagOperationKind, TagStoreError};
