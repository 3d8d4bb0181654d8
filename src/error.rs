//! Error types for the conditions callers need to tell apart.
//!
//! Most of the crate propagates `anyhow::Error`; these enums exist where a
//! caller (or a test) has to match on *which* failure happened.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// More than one environment indicator was set.
    #[error("Ambiguous environment: indicators {} are all set, expected at most one", .0.join(", "))]
    AmbiguousProfile(Vec<&'static str>),

    #[error("Rating threshold must be between 0.0 and 1.0, got {0}")]
    InvalidRating(f64),

    #[error("Invalid override file {path}: {source}")]
    OverrideFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the read-only library reader.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The database file does not exist. Never created on our side.
    #[error("Music library not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Rating threshold must be between 0.0 and 1.0, got {0}")]
    InvalidRating(f64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_profile_lists_indicators() {
        let err = ConfigError::AmbiguousProfile(vec!["DEV", "PROD"]);
        assert_eq!(
            err.to_string(),
            "Ambiguous environment: indicators DEV, PROD are all set, expected at most one"
        );
    }

    #[test]
    fn test_not_found_mentions_path() {
        let err = LibraryError::NotFound(PathBuf::from("clementine.db"));
        assert!(err.to_string().contains("clementine.db"));
    }
}
