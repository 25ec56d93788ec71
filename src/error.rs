//! Error types for the persistence and request boundary.
//!
//! Enrichment itself never fails; these errors only come from reading and
//! writing records or from rejecting malformed user input.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown status '{value}'. Expected one of: {expected}")]
    UnknownStatus { value: String, expected: String },

    #[error("Status '{status}' cannot be used when adding a record")]
    StatusNotAllowedOnAdd { status: String },

    #[error("No record with id {id}")]
    RecordNotFound { id: Uuid },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
