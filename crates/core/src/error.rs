//! Error types for EzyCopy operations.
//!
//! This module defines the main error type [`EzyCopyError`]. Most variants are
//! recovered inside the pipeline (an extractor that finds nothing falls back to
//! the page body, a failed image download is left out of the path map); only
//! persistence failures are meant to reach the user.
//!
//! # Example
//!
//! ```rust
//! use ezycopy_core::{EzyCopyError, Result};
//!
//! fn require_title(title: &str) -> Result<&str> {
//!     if title.trim().is_empty() {
//!         return Err(EzyCopyError::NoContent);
//!     }
//!     Ok(title)
//! }
//!
//! assert!(require_title("  ").is_err());
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extraction, fetching and persistence.
///
/// # Example
///
/// ```rust
/// use ezycopy_core::EzyCopyError;
///
/// let err = EzyCopyError::Cancelled;
/// assert!(err.is_cancellation());
/// assert!(!EzyCopyError::NoContent.is_cancellation());
/// ```
#[derive(Error, Debug)]
pub enum EzyCopyError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and non-success status codes.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, including invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// No element scored above the readability threshold.
    ///
    /// Navigation pages, search results and near-empty documents end up here.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// No content could be extracted from the document.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Reading local input failed.
    #[error("Failed to read input: {0}")]
    ReadError(#[from] io::Error),

    /// Writing the markdown file (or another output artifact) failed.
    #[error("Failed to save {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single image could not be fetched or written.
    #[error("Failed to download image {url}: {reason}")]
    ImageDownload { url: String, reason: String },

    /// Clipboard access failed.
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    /// Settings could not be read, parsed or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// A host message was malformed or could not be framed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The user aborted the operation.
    ///
    /// Not an error from the user's point of view; callers should exit quietly.
    #[error("Operation cancelled")]
    Cancelled,
}

impl EzyCopyError {
    /// True when the user aborted the run.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EzyCopyError::Cancelled)
    }

    /// True for failures the pipeline absorbs on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EzyCopyError::NoContent | EzyCopyError::NotReadable { .. } | EzyCopyError::ImageDownload { .. }
        )
    }
}

impl From<serde_json::Error> for EzyCopyError {
    fn from(err: serde_json::Error) -> Self {
        EzyCopyError::Settings(err.to_string())
    }
}

/// Result type alias for EzyCopyError.
pub type Result<T> = std::result::Result<T, EzyCopyError>;
