use std::path::PathBuf;

/// Result type alias for keylens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for keylens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A log record could not be parsed or classified
    #[error("failed to parse operation record: {message}")]
    Parse {
        line: Option<String>,
        message: String,
    },

    /// The stat store could not be reached
    #[error("stat store '{backend}' unavailable: {message}")]
    StoreUnavailable {
        backend: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored statistic field holds something other than a number
    #[error("stored field '{field}' of key '{key}' is not numeric: '{value}'")]
    CorruptRecord {
        key: String,
        field: String,
        value: String,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot encoding/decoding errors
    #[error("snapshot '{name}' could not be {operation}: {message}")]
    Snapshot {
        name: String,
        operation: String,
        message: String,
    },
}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(error: bincode::Error) -> Self {
        Error::Snapshot {
            name: String::new(),
            operation: "encoded or decoded".to_string(),
            message: error.to_string(),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a parse error for a raw log line
    #[must_use]
    pub fn parse(line: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            line: Some(line.into()),
            message: message.into(),
        }
    }

    /// Create a parse error that is not tied to a raw line
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Error::Parse {
            line: None,
            message: message.into(),
        }
    }

    /// Create a store unavailable error
    #[must_use]
    pub fn store_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store unavailable error with a source error
    #[must_use]
    pub fn store_unavailable_with_source(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::StoreUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a corrupt record error
    #[must_use]
    pub fn corrupt_record(
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Error::CorruptRecord {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a snapshot error
    #[must_use]
    pub fn snapshot(
        name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Snapshot {
            name: name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}
