//! # vigil-store
//!
//! SQLite persistence for the alert engine: schema migrations, pragma
//! setup, and the compare-and-set alert operations the engine's
//! concurrency guarantees rest on.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use vigil_core::errors::{StorageError, VigilError};

/// Wrap a raw SQLite failure message into the workspace error type.
pub(crate) fn to_storage_err(message: impl Into<String>) -> VigilError {
    VigilError::Storage(StorageError::Sqlite {
        message: message.into(),
    })
}
