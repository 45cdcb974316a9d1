//! Error types for the officeconv library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`BackendError`]: raised by a [`crate::backend::ConversionBackend`]
//!   for a single invocation of the external converter (could not start,
//!   exited non-zero, produced nothing).
//!
//! * [`OfficeConvertError`]: returned by [`crate::OfficeConverter`]. A
//!   backend failure on a file whose media type *is* supported surfaces as
//!   [`OfficeConvertError::UnknownFormat`], so display layers can fall back
//!   to a generic icon while the underlying [`BackendError`] stays reachable
//!   through [`std::error::Error::source`].
//!
//! An unsupported media type is not an error at all: the converter returns
//! a [`crate::ConversionOutcome`] without an output path.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by [`crate::OfficeConverter`].
#[derive(Debug, Error)]
pub enum OfficeConvertError {
    // ── Backend errors ────────────────────────────────────────────────────
    /// The conversion executable does not exist. Raised at construction.
    #[error("Cannot find conversion backend executable at '{path}'\nInstall unoconv or point --backend at it.")]
    BackendUnavailable { path: PathBuf },

    /// The backend could not convert a file of a supported media type.
    #[error("Unknown file format for '{path}': {source}")]
    UnknownFormat {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input could be opened but reading it for detection failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Cache errors ──────────────────────────────────────────────────────
    /// The cache directory could not be created or the input path resolved.
    #[error("Cache directory error for '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OfficeConvertError {
    /// True when the caller should fall back to a generic representation
    /// (the file looked convertible, the backend disagreed).
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, OfficeConvertError::UnknownFormat { .. })
    }
}

/// A failure of one backend invocation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The configured executable does not exist.
    #[error("cannot find conversion backend executable at '{path}'")]
    Unavailable { path: PathBuf },

    /// The operating system refused to start the process.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully. `message` is the first line of
    /// its error stream.
    #[error("{message}")]
    Failed { status: Option<i32>, message: String },

    /// The process exited successfully without writing the output file.
    #[error("backend exited successfully but wrote no output at '{path}'")]
    MissingOutput { path: PathBuf },
}

impl From<BackendError> for OfficeConvertError {
    /// Construction-time mapping. Per-call failures are wrapped in
    /// [`OfficeConvertError::UnknownFormat`] by the converter instead.
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable { path } => OfficeConvertError::BackendUnavailable { path },
            other => OfficeConvertError::Internal(other.to_string()),
        }
    }
}
