//! Configuration types for office-to-PDF conversion.
//!
//! Every process-wide setting lives in one immutable [`ConverterConfig`],
//! built via [`ConverterConfigBuilder`]. A converter clones the config once
//! at construction and never reads the environment afterwards.

use crate::error::OfficeConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Executable used when [`ConverterConfig::backend_path`] is unset.
pub const DEFAULT_BACKEND_PATH: &str = "/usr/bin/unoconv";

/// Prefix for pipe names when pipe mode is enabled.
pub const DEFAULT_PIPE_PREFIX: &str = "officeconv";

/// Configuration for an [`crate::OfficeConverter`].
///
/// # Example
/// ```rust
/// use officeconv::{CacheKeyScheme, ConverterConfig};
///
/// let config = ConverterConfig::builder()
///     .temp_dir("/var/cache/officeconv")
///     .use_pipe(true)
///     .cache_key(CacheKeyScheme::Hashed)
///     .build()
///     .unwrap();
/// assert!(config.use_pipe);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding cached PDF outputs. Default: [`std::env::temp_dir`].
    pub temp_dir: PathBuf,

    /// Conversion executable. `None` means [`DEFAULT_BACKEND_PATH`].
    pub backend_path: Option<PathBuf>,

    /// Talk to a running office instance over a named pipe. Default: false.
    ///
    /// Each invocation gets its own pipe name so concurrent runs sharing one
    /// pipe namespace do not collide.
    pub use_pipe: bool,

    /// Prefix of generated pipe names (`<prefix>-<random>`). Default: `officeconv`.
    pub pipe_prefix: String,

    /// How the cache file name is derived from the input path. Default: [`CacheKeyScheme::Hashed`].
    pub cache_key: CacheKeyScheme,

    /// Reconvert when the cached output is older than the input. Default: false.
    ///
    /// With the default, existence of the cached file is the only signal:
    /// an input modified after its first conversion keeps being served
    /// from the old PDF.
    pub verify_freshness: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            backend_path: None,
            use_pipe: false,
            pipe_prefix: DEFAULT_PIPE_PREFIX.to_string(),
            cache_key: CacheKeyScheme::default(),
            verify_freshness: false,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// The executable that will be run, with the default applied.
    pub fn backend_executable(&self) -> PathBuf {
        self.backend_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKEND_PATH))
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn backend_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend_path = Some(path.into());
        self
    }

    pub fn use_pipe(mut self, v: bool) -> Self {
        self.config.use_pipe = v;
        self
    }

    pub fn pipe_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.pipe_prefix = prefix.into();
        self
    }

    pub fn cache_key(mut self, scheme: CacheKeyScheme) -> Self {
        self.config.cache_key = scheme;
        self
    }

    pub fn verify_freshness(mut self, v: bool) -> Self {
        self.config.verify_freshness = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, OfficeConvertError> {
        let c = &self.config;
        if c.temp_dir.as_os_str().is_empty() {
            return Err(OfficeConvertError::InvalidConfig(
                "temp_dir must not be empty".into(),
            ));
        }
        if c.pipe_prefix.is_empty() {
            return Err(OfficeConvertError::InvalidConfig(
                "pipe_prefix must not be empty".into(),
            ));
        }
        if c
            .pipe_prefix
            .chars()
            .any(|ch| ch.is_whitespace() || ch == '/' || ch == '\\')
        {
            return Err(OfficeConvertError::InvalidConfig(format!(
                "pipe_prefix must not contain whitespace or path separators, got {:?}",
                c.pipe_prefix
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a cache file name is derived from an input path.
///
/// | Scheme | File name |
/// |--------|-----------|
/// | `Hashed` | `sha256(absolute input path)` + suffix |
/// | `Flattened` | input path with separators replaced by `_` + suffix |
///
/// `Flattened` keeps names human-readable but two inputs such as `a/b.doc`
/// and `a_b.doc` share one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CacheKeyScheme {
    /// Collision-resistant hash of the absolute input path. (default)
    #[default]
    Hashed,
    /// The input path itself, flattened into one file-name component.
    Flattened,
}
