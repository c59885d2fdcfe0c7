use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Summarization error: {0}")]
    Summarization(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Coarse classification of an [`Error`], used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    Fetch,
    Summarization,
    Persistence,
    Configuration,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch(_) | Error::InvalidUrl(_) => ErrorKind::Fetch,
            Error::Summarization(_) => ErrorKind::Summarization,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Io(_) | Error::Serialization(_) | Error::External(_) => ErrorKind::Other,
        }
    }

    /// Fatal errors abort the whole process instead of a single article.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Summarization => "SummarizationError",
            ErrorKind::Persistence => "PersistenceError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Other => "Error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::Fetch("boom".into()).kind(), ErrorKind::Fetch);
        assert_eq!(Error::InvalidUrl("nope".into()).kind(), ErrorKind::Fetch);
        assert_eq!(
            Error::Summarization("rate limited".into()).kind(),
            ErrorKind::Summarization
        );
        assert_eq!(ErrorKind::Persistence.to_string(), "PersistenceError");
        assert!(Error::Configuration("unknown scraper".into()).is_fatal());
        assert!(!Error::Persistence("locked".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Fetch("homepage unreachable".to_string());
        assert_eq!(err.to_string(), "Fetch error: homepage unreachable");
    }
}
