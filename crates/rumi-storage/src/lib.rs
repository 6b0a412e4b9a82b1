//! Atomic JSON persistence for the RumiAI analysis core.

pub mod atomic;
pub mod error;
pub mod store;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use error::{StorageError, StorageResult};
pub use store::InsightStore;
