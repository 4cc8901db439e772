//! Error types shared by every stage of a run

use std::path::PathBuf;

use thiserror::Error;

/// Broad failure categories, used to decide how far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal at startup
    Configuration,
    /// Skips one query/locale/engine
    Fetch,
    /// Aborts one region
    Storage,
    /// Aborts one region, the report stays on disk
    Notification,
}

/// Errors that can occur while collecting, storing or reporting articles
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP request to the search provider failed or returned garbage
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Search provider answered with an error status
    #[error("Search API error (status {status}): {message}")]
    SearchApi {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Report file could not be read or written
    #[error("Storage error for {}: {source}", path.display())]
    Storage {
        /// Report file involved
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report file exists but does not have the expected layout
    #[error("Malformed report {}: {message}", path.display())]
    MalformedReport {
        /// Report file involved
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// Sending the summary email failed
    #[error("Notification failed: {0}")]
    Notification(String),
}

impl ScoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoutError::Configuration(_) => ErrorKind::Configuration,
            ScoutError::Fetch(_) | ScoutError::SearchApi { .. } => ErrorKind::Fetch,
            ScoutError::Storage { .. } | ScoutError::MalformedReport { .. } => ErrorKind::Storage,
            ScoutError::Notification(_) => ErrorKind::Notification,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScoutError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            ScoutError::Configuration("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ScoutError::SearchApi {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            ErrorKind::Fetch
        );
        assert_eq!(
            ScoutError::MalformedReport {
                path: PathBuf::from("r.csv"),
                message: "bad header".into()
            }
            .kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            ScoutError::Notification("x".into()).kind(),
            ErrorKind::Notification
        );
    }

    #[test]
    fn test_storage_message_names_path() {
        let err = ScoutError::storage(
            "reports/UK_NA.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "Storage error for reports/UK_NA.csv: denied");
    }
}
