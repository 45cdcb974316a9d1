//! Progress-callback trait for batch conversions.
//!
//! Pass an [`Arc<dyn ConversionProgressCallback>`] to
//! [`crate::OfficeConverter::convert_many`] to receive an event per file.
//!
//! # Example
//!
//! ```rust
//! use officeconv::{ConversionOutcome, ConversionProgressCallback};
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     converted: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, input: &Path, outcome: &ConversionOutcome) {
//!         if outcome.has_output() {
//!             self.converted.fetch_add(1, Ordering::SeqCst);
//!         }
//!         eprintln!("{} done", input.display());
//!     }
//! }
//! ```

use crate::convert::ConversionOutcome;
use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::OfficeConverter::convert_many`] as it works through
/// its inputs.
///
/// Files are converted concurrently, so the per-file methods may be called
/// from several threads at once. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any file is looked at.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is detected and converted.
    fn on_file_start(&self, input: &Path) {
        let _ = input;
    }

    /// Called when a file finished without error. The outcome may still
    /// carry no output (unsupported media type).
    fn on_file_complete(&self, input: &Path, outcome: &ConversionOutcome) {
        let _ = (input, outcome);
    }

    /// Called when a file failed.
    fn on_file_error(&self, input: &Path, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every file has been attempted.
    ///
    /// `success_count` counts files that returned `Ok`, converted or not.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
