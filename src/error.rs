//! Error taxonomy for the normalization core.
//!
//! Per-cell problems never surface here: unparseable numbers become
//! [`Value::Missing`](crate::data::Value::Missing) and unmapped codes pass
//! through. What remains are structural failures, hard data insufficiency and
//! caller mistakes, which [`CensusError::class`] groups so a caller can choose
//! between aborting and continuing with partial output.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CensusError {
    /// Every encoding candidate rejected the byte stream.
    #[error("Unable to decode input with any of the candidate encodings: {}", tried.join(", "))]
    Decode { tried: Vec<String> },

    #[error("Input table is empty: {0}")]
    EmptyTable(String),

    /// `row` is the 1-based record number, counting the header as record 1.
    #[error("Row {row} has {found} field(s) but the header declares {expected}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column '{0}' appears more than once after header normalization")]
    DuplicateColumn(String),

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Column '{name}' holds {found} row(s) but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Column '{name}' is {kind}, expected numeric")]
    NotNumeric { name: String, kind: String },

    #[error("Column '{0}' has no usable values to classify")]
    InsufficientData(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse grouping of [`CensusError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input: undecodable bytes, empty table, ragged rows.
    Structural,
    /// Nothing left to work with after dropping missing values.
    InsufficientData,
    /// The caller asked for something the table or configuration cannot give.
    Usage,
    Io,
}

impl CensusError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CensusError::Decode { .. }
            | CensusError::EmptyTable(_)
            | CensusError::MalformedRow { .. }
            | CensusError::DuplicateColumn(_)
            | CensusError::LengthMismatch { .. }
            | CensusError::Csv(_) => ErrorClass::Structural,
            CensusError::InsufficientData(_) => ErrorClass::InsufficientData,
            CensusError::UnknownColumn(_)
            | CensusError::NotNumeric { .. }
            | CensusError::InvalidArgument(_)
            | CensusError::UnknownEncoding(_)
            | CensusError::Config(_)
            | CensusError::Yaml(_) => ErrorClass::Usage,
            CensusError::Io { .. } => ErrorClass::Io,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.class() == ErrorClass::Structural
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
