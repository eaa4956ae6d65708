//! Typed errors surfaced by the session controller.
//!
//! Infrastructure code (database worker, settings file) reports through
//! `anyhow`; this type is what callers of the controller match on.

use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Settings could not be read or written.
    #[error("settings store failed: {source}")]
    Settings {
        #[source]
        source: BoxError,
    },

    /// A slider value outside `1..=10` was offered to the store.
    #[error("{field} must be within 1..=10, got {value}")]
    InvalidSettings { field: &'static str, value: f32 },

    /// An upsert into the duration ledger failed.
    #[error("duration ledger write for {date} failed: {source}")]
    Ledger {
        date: String,
        #[source]
        source: BoxError,
    },
}

impl PersistenceError {
    /// Unwraps a typed error carried through `anyhow`, otherwise files the
    /// failure under `Settings`.
    pub fn from_settings(err: anyhow::Error) -> Self {
        match err.downcast::<PersistenceError>() {
            Ok(typed) => typed,
            Err(other) => Self::Settings {
                source: other.into(),
            },
        }
    }

    pub fn ledger(date: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Ledger {
            date: date.into(),
            source: err.into(),
        }
    }
}
