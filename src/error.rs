//! Error taxonomy for the lookup server.
//!
//! Each variant maps to a recovery scope. Data-file errors are answered per
//! request (or are fatal at cached-mode startup). TLS errors drop a single
//! connection. Anything else is logged and abandons the connection without
//! a response.
//!
//! An unreadable lookup config is not an error here: it degrades to an
//! empty candidate list, which surfaces as [`LookupError::NoActiveFile`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while serving a lookup.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The active data file is missing or unreadable.
    #[error("data file unavailable: {path}: {source}")]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No candidate data file was declared, so nothing can be searched.
    #[error("no data file declared in {0}")]
    NoActiveFile(PathBuf),

    /// TLS handshake or certificate loading failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Any other I/O failure while handling a connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// Whether this error should be reported to the client as a missing
    /// data file instead of silently abandoning the connection.
    pub fn is_data_file(&self) -> bool {
        matches!(
            self,
            LookupError::DataFile { .. } | LookupError::NoActiveFile(_)
        )
    }

    /// Short machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::DataFile { .. } => "data_file",
            LookupError::NoActiveFile(_) => "no_active_file",
            LookupError::Tls(_) => "tls",
            LookupError::Io(_) => "io",
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_file_errors_are_reported() {
        let missing = LookupError::DataFile {
            path: PathBuf::from("/nope.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(missing.is_data_file());
        assert!(LookupError::NoActiveFile(PathBuf::from("config.txt")).is_data_file());
        assert!(!LookupError::Tls("bad cert".into()).is_data_file());
        assert!(!LookupError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_data_file());
    }

    #[test]
    fn test_display_includes_path() {
        let err = LookupError::DataFile {
            path: PathBuf::from("/data/200k.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/data/200k.txt"));
        assert_eq!(err.code(), "data_file");
    }
}
