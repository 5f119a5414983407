//! Error types for qrstash.
//!
//! Only failures that abort a user action live here. A missing image and a
//! failed decode are ordinary outcomes and are reported as `None` by the
//! image store and the decoder instead.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for qrstash operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Image Errors ===
    /// An image blob could not be written to disk.
    #[error("failed to write image {name}: {source}")]
    StorageWrite {
        /// Generated blob name that failed to write.
        name: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record referenced an image blob that does not exist.
    #[error("image {file_name} does not exist in the image store")]
    ImageMissing {
        /// The blob name the record referenced.
        file_name: String,
    },

    /// Image bytes could not be decoded or re-encoded.
    #[error("image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for qrstash operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an image missing error for the given blob name.
    #[must_use]
    pub fn image_missing(file_name: impl Into<String>) -> Self {
        Self::ImageMissing {
            file_name: file_name.into(),
        }
    }

    /// Check if this error came from writing an image blob.
    #[must_use]
    pub fn is_storage_write(&self) -> bool {
        matches!(self, Self::StorageWrite { .. })
    }

    /// Check if this error is a refused append for a missing blob.
    #[must_use]
    pub fn is_image_missing(&self) -> bool {
        matches!(self, Self::ImageMissing { .. })
    }
}
