// Vehicle Parts Tracker - Storage Errors
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Typed failures for the LMDB inventory store. Not-found is never an error
// here: lookups return Option / empty Vec instead.

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Duplicate primary key or duplicate value on a unique index
    #[error("constraint violation in {collection}: {field} '{value}' already exists")]
    ConstraintViolation {
        collection: &'static str,
        field: &'static str,
        value: String,
    },

    /// Primary key that LMDB cannot store: empty or longer than MAX_ID_LEN bytes
    #[error("invalid id for {collection}: {reason}")]
    InvalidId {
        collection: &'static str,
        reason: String,
    },

    #[error("{collection} has no index named '{index}'")]
    UnknownIndex {
        collection: &'static str,
        index: String,
    },

    #[error("invalid date '{0}' (expected RFC 3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("database schema v{found} is newer than supported v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    /// Replay import stopped early. Records counted in `committed` stay in the store.
    #[error("import aborted after {committed} committed record(s): {source}")]
    ImportAborted {
        committed: usize,
        #[source]
        source: Box<StoreError>,
    },

    #[error("LMDB error: {0}")]
    Lmdb(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation { .. })
    }
}
