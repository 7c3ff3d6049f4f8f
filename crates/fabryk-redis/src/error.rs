//! Error types for Fabryk Redis operations.
//!
//! This module provides the `Error` type and `Result<T>` alias used across
//! the crate. Variants fall into four groups: configuration, validation,
//! index state, and command execution. Uses `thiserror` for derive macros.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in Fabryk Redis operations.
#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------
    /// The store was built without an embedding provider.
    #[error("invalid options: missing embedder")]
    MissingEmbedder,

    /// The store was built without a command executor.
    #[error("invalid options: missing command executor")]
    MissingExecutor,

    /// The store was built without an index name.
    #[error("invalid options: missing index name")]
    MissingIndexName,

    /// An index command was compiled with an empty name.
    #[error("empty redis index name")]
    EmptyIndexName,

    /// Neither inline bytes nor a file path produced schema content.
    #[error("empty schema content")]
    EmptySchemaContent,

    /// The schema document could not be parsed.
    #[error("invalid schema document ({format}): {message}")]
    SchemaParse {
        /// Document format that was being parsed.
        format: String,
        /// Parser message.
        message: String,
    },

    /// Generic configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------
    /// Score threshold outside `[0, 1]`.
    #[error("score threshold must be between 0 and 1, got {0}")]
    InvalidScoreThreshold(f32),

    /// Filters were supplied in a shape other than a query string.
    #[error("invalid filters: expected a search query string")]
    InvalidFilters,

    /// The reserved vector key held something other than an f32/f64 array.
    #[error("the vector type of field '{0}' is not a float32 or float64 array")]
    InvalidVectorType(String),

    /// The embedder returned the wrong number of vectors.
    #[error("embedding vector error: expected {expected} vectors, got {actual}")]
    InvalidEmbedding {
        /// Number of texts sent to the embedder.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },

    /// A vector's length differs from the schema's vector field.
    #[error("vector dimension mismatch: schema expects {expected}, got {actual}")]
    VectorDimensionMismatch {
        /// Dimension declared by the schema.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// A search was requested with an empty query vector.
    #[error("invalid vector: query vector is empty")]
    EmptyVector,

    /// Storage kind other than HASH or JSON.
    #[error("invalid index type: {0}")]
    InvalidStorageKind(String),

    /// Two fields of one schema share a name.
    #[error("duplicate field name in schema: {0}")]
    DuplicateField(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    // ------------------------------------------------------------------------
    // Index state
    // ------------------------------------------------------------------------
    /// The index does not exist.
    #[error("redis index name does not exist: {0}")]
    IndexNotFound(String),

    /// The index already exists.
    #[error("redis index already exists: {0}")]
    IndexAlreadyExists(String),

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------
    /// The server answered a command with an error reply.
    #[error("{command} failed: {message}")]
    Command {
        /// Command verb, e.g. `FT.SEARCH`.
        command: String,
        /// Server error message.
        message: String,
    },

    /// Connection or transport failure.
    #[error("redis connection error: {0}")]
    Connection(String),

    /// Some documents of a batched write failed.
    #[error("{} document write(s) failed, {} written: {}", .failures.len(), .ids.len(), JoinedFailures(.failures))]
    PartialWrite {
        /// Keys of the documents that were written.
        ids: Vec<String>,
        /// Every failed document.
        failures: Vec<WriteFailure>,
    },

    // ------------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------------
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    IoWithPath {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// One failed document of a batched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    /// Key the document was written under.
    pub key: String,
    /// Error message from the executor.
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {} ({}): {}", self.index, self.key, self.message)
    }
}

struct JoinedFailures<'a>(&'a [WriteFailure]);

impl fmt::Display for JoinedFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a command error for the given verb.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a schema parse error.
    pub fn schema_parse(format: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::SchemaParse {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    /// Wrap an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this is a server reply saying the index does not exist.
    pub fn is_unknown_index(&self) -> bool {
        match self {
            Self::IndexNotFound(_) => true,
            Self::Command { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("unknown index name") || lower.contains("no such index")
            }
            _ => false,
        }
    }

    /// Whether this is a server reply saying the index already exists.
    pub fn is_index_exists(&self) -> bool {
        match self {
            Self::IndexAlreadyExists(_) => true,
            Self::Command { message, .. } => message.to_lowercase().contains("index already exists"),
            _ => false,
        }
    }
}

/// Result type alias using Fabryk Redis's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_index_detection() {
        assert!(Error::command("FT.INFO", "Unknown Index name").is_unknown_index());
        assert!(Error::command("FT.INFO", "idx: no such index").is_unknown_index());
        assert!(Error::IndexNotFound("idx".into()).is_unknown_index());
        assert!(!Error::command("FT.INFO", "WRONGTYPE").is_unknown_index());
        assert!(!Error::command("FT.INFO", "ERR unknown command 'FT.INFO'").is_unknown_index());
        assert!(!Error::command("FT.INFO", "module not found").is_unknown_index());
        assert!(!Error::connection("refused").is_unknown_index());
    }

    #[test]
    fn test_index_exists_detection() {
        assert!(Error::command("FT.CREATE", "Index already exists").is_index_exists());
        assert!(!Error::command("FT.CREATE", "Syntax error").is_index_exists());
    }

    #[test]
    fn test_partial_write_message_names_every_failure() {
        let err = Error::PartialWrite {
            ids: vec!["doc:a:1".into(), "doc:a:2".into()],
            failures: vec![WriteFailure {
                index: 2,
                key: "doc:a:3".into(),
                message: "OOM".into(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "1 document write(s) failed, 2 written: document 2 (doc:a:3): OOM"
        );
    }

    #[test]
    fn test_io_with_path_message() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            "/tmp/schema.yml",
        );
        assert!(err.to_string().contains("/tmp/schema.yml"));
    }
}
