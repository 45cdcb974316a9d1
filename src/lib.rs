//! # officeconv
//!
//! Convert office documents (Word, Excel, PowerPoint, OpenDocument, plain
//! text) to PDF through an external converter, caching every result on disk.
//!
//! ## Flow
//!
//! ```text
//! convert(path, media type?)
//!  │
//!  ├─ 1. Detect   declared type, or magic bytes + extension
//!  ├─ 2. Filter   unsupported type → no output, not an error
//!  ├─ 3. Locate   {temp_dir}/{key}_office2pdf
//!  ├─ 4. Cache    file exists → done, backend untouched
//!  └─ 5. Convert  unoconv --format=pdf --output=<cache path> <input>
//! ```
//!
//! A cached file is trusted as long as it exists. Inputs changed after
//! their first conversion are not reconverted unless
//! [`ConverterConfig::verify_freshness`] is set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use officeconv::{ConverterConfig, OfficeConverter, OfficeConvertError};
//!
//! fn main() -> Result<(), OfficeConvertError> {
//!     let config = ConverterConfig::builder()
//!         .temp_dir("/var/cache/office2pdf")
//!         .build()?;
//!     let converter = OfficeConverter::new(config)?;
//!
//!     match converter.convert("quarterly.xlsx", None) {
//!         Ok(outcome) if outcome.has_output() => println!("{}", outcome),
//!         Ok(outcome) => println!("{} is not convertible", outcome.media_type),
//!         Err(e) if e.is_unknown_format() => println!("show a generic icon"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `office2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod mimetype;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{ConversionBackend, UnoconvBackend};
pub use cache::CACHED_FILE_SUFFIX;
pub use config::{CacheKeyScheme, ConverterConfig, ConverterConfigBuilder, DEFAULT_BACKEND_PATH};
pub use convert::{ConversionOutcome, OfficeConverter};
pub use error::{BackendError, OfficeConvertError};
pub use mimetype::{supported_mimetypes, ContentSniffer, DetectedType, MediaTypeDetector};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
