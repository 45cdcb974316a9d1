//! The conversion cache controller.
//!
//! [`OfficeConverter::convert`] decides whether a file is convertible,
//! serves it from the on-disk cache when possible and otherwise runs the
//! backend exactly once. It keeps no per-call state: everything a call
//! learns comes back in a [`ConversionOutcome`], so one converter can be
//! cloned and shared across threads freely.
//!
//! The blocking call is the whole concurrency model. [`OfficeConverter::convert_async`]
//! and [`OfficeConverter::convert_many`] only move it onto tokio's blocking
//! pool.

use crate::backend::{ConversionBackend, UnoconvBackend};
use crate::cache::{self, InFlight};
use crate::config::ConverterConfig;
use crate::error::OfficeConvertError;
use crate::mimetype::{self, ContentSniffer, DetectedType, MediaTypeDetector, SNIFF_LEN};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one [`OfficeConverter::convert`] call found out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub input_path: PathBuf,
    /// Declared by the caller or reported by the detector.
    pub media_type: String,
    /// Reported by the detector; `None` when the caller declared the type.
    pub encoding: Option<String>,
    /// Set only when a PDF was produced or found in the cache.
    pub output_path: Option<PathBuf>,
    /// True when the PDF was already there and the backend did not run.
    pub cache_hit: bool,
}

impl ConversionOutcome {
    /// Outcome for a file whose media type is not convertible.
    pub fn unconverted(
        input_path: PathBuf,
        media_type: impl Into<String>,
        encoding: Option<String>,
    ) -> Self {
        Self {
            input_path,
            media_type: media_type.into(),
            encoding,
            output_path: None,
            cache_hit: false,
        }
    }

    pub fn has_output(&self) -> bool {
        self.output_path.is_some()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}

/// The output path, or nothing when no PDF exists.
impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.output_path {
            Some(p) => write!(f, "{}", p.display()),
            None => Ok(()),
        }
    }
}

/// Converts office documents to PDF, caching results on disk.
///
/// # Example
/// ```rust,no_run
/// use officeconv::{ConverterConfig, OfficeConverter};
///
/// let converter = OfficeConverter::new(ConverterConfig::default())?;
/// let outcome = converter.convert("letter.doc", None)?;
/// if let Some(pdf) = outcome.output_path() {
///     println!("PDF at {}", pdf.display());
/// }
/// # Ok::<(), officeconv::OfficeConvertError>(())
/// ```
#[derive(Clone)]
pub struct OfficeConverter {
    config: Arc<ConverterConfig>,
    backend: Arc<dyn ConversionBackend>,
    detector: Arc<dyn MediaTypeDetector>,
    in_flight: Arc<InFlight>,
}

impl fmt::Debug for OfficeConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfficeConverter")
            .field("config", &self.config)
            .field("backend", &"<dyn ConversionBackend>")
            .field("detector", &"<dyn MediaTypeDetector>")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl OfficeConverter {
    /// Converter backed by unoconv.
    ///
    /// # Errors
    /// [`OfficeConvertError::BackendUnavailable`] when the configured
    /// executable does not exist.
    pub fn new(config: ConverterConfig) -> Result<Self, OfficeConvertError> {
        let backend = UnoconvBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Converter with a caller-supplied backend.
    pub fn with_backend(config: ConverterConfig, backend: Arc<dyn ConversionBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            detector: Arc::new(ContentSniffer),
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Replace the default [`ContentSniffer`].
    pub fn with_detector(mut self, detector: Arc<dyn MediaTypeDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Media types this converter hands to the backend.
    pub fn mimetypes(&self) -> &'static [&'static str] {
        mimetype::supported_mimetypes()
    }

    /// Where the cached PDF for `input` lives (whether or not it exists yet).
    pub fn cache_path_for(&self, input: impl AsRef<Path>) -> Result<PathBuf, OfficeConvertError> {
        cache::cache_path(&self.config, input.as_ref())
    }

    /// Convert `input` to PDF unless a cached conversion already exists.
    ///
    /// `media_type` skips detection when given. Blocks until the backend
    /// exits.
    ///
    /// # Returns
    /// `Ok` with no output path when the media type is not convertible;
    /// that is a normal outcome, not an error.
    ///
    /// # Errors
    /// - [`OfficeConvertError::UnknownFormat`] when the backend rejects a
    ///   file of a supported type
    /// - input and cache-directory I/O errors
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        media_type: Option<&str>,
    ) -> Result<ConversionOutcome, OfficeConvertError> {
        let input = input.as_ref();

        let detected = match media_type {
            Some(m) => DetectedType::new(m, None),
            None => self.detect(input)?,
        };

        if !mimetype::is_supported(&detected.media_type) {
            debug!(
                "Skipping {}: {} is not convertible",
                input.display(),
                detected.media_type
            );
            return Ok(ConversionOutcome::unconverted(
                input.to_path_buf(),
                detected.media_type,
                detected.encoding,
            ));
        }

        let output = self.cache_path_for(input)?;
        debug!("Cache path for {}: {}", input.display(), output.display());

        let cache_hit = self
            .in_flight
            .run(&output, || self.ensure_converted(input, &output))?;

        Ok(ConversionOutcome {
            input_path: input.to_path_buf(),
            media_type: detected.media_type,
            encoding: detected.encoding,
            output_path: Some(output),
            cache_hit,
        })
    }

    /// [`convert`](Self::convert) on tokio's blocking pool.
    pub async fn convert_async(
        &self,
        input: impl AsRef<Path>,
        media_type: Option<&str>,
    ) -> Result<ConversionOutcome, OfficeConvertError> {
        let this = self.clone();
        let input = input.as_ref().to_path_buf();
        let media_type = media_type.map(str::to_string);

        tokio::task::spawn_blocking(move || this.convert(&input, media_type.as_deref()))
            .await
            .map_err(|e| OfficeConvertError::Internal(format!("Conversion task panicked: {}", e)))?
    }

    /// Convert independent files with at most `concurrency` backend runs at
    /// once. Media types are detected per file.
    ///
    /// Results come back in input order, paired with their input. Progress
    /// callbacks still fire as files finish.
    pub async fn convert_many<I, P>(
        &self,
        inputs: I,
        concurrency: usize,
        progress: Option<ProgressCallback>,
    ) -> Vec<(PathBuf, Result<ConversionOutcome, OfficeConvertError>)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let inputs: Vec<PathBuf> = inputs
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        let total = inputs.len();
        info!("Converting {} files (concurrency {})", total, concurrency.max(1));

        if let Some(ref cb) = progress {
            cb.on_batch_start(total);
        }

        let results: Vec<(PathBuf, Result<ConversionOutcome, OfficeConvertError>)> =
            stream::iter(inputs.into_iter().map(|input| {
                let progress = progress.clone();
                async move {
                    if let Some(ref cb) = progress {
                        cb.on_file_start(&input);
                    }
                    let result = self.convert_async(&input, None).await;
                    if let Some(ref cb) = progress {
                        match &result {
                            Ok(outcome) => cb.on_file_complete(&input, outcome),
                            Err(e) => cb.on_file_error(&input, &e.to_string()),
                        }
                    }
                    (input, result)
                }
            }))
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|(_, r)| r.is_ok()).count();
        if let Some(ref cb) = progress {
            cb.on_batch_complete(total, succeeded);
        }
        results
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Read the head of `input` and ask the detector about it.
    fn detect(&self, input: &Path) -> Result<DetectedType, OfficeConvertError> {
        let file = match std::fs::File::open(input) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OfficeConvertError::FileNotFound {
                    path: input.to_path_buf(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(OfficeConvertError::PermissionDenied {
                    path: input.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(OfficeConvertError::ReadFailed {
                    path: input.to_path_buf(),
                    source,
                });
            }
        };

        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .map_err(|source| OfficeConvertError::ReadFailed {
                path: input.to_path_buf(),
                source,
            })?;

        Ok(self.detector.detect(&head, input))
    }

    /// Make sure `output` holds a conversion of `input`. Returns whether it
    /// was already there. Runs inside the in-flight slot for `output`.
    fn ensure_converted(&self, input: &Path, output: &Path) -> Result<bool, OfficeConvertError> {
        if output.exists() {
            if !self.config.verify_freshness || cache::is_fresh(input, output) {
                debug!("Cache hit for {}", input.display());
                return Ok(true);
            }
            warn!(
                "Cached {} is older than {}; reconverting",
                output.display(),
                input.display()
            );
        }

        std::fs::create_dir_all(&self.config.temp_dir).map_err(|source| {
            OfficeConvertError::CacheDir {
                path: self.config.temp_dir.clone(),
                source,
            }
        })?;

        if let Err(source) = self.backend.convert(input, output) {
            // Whatever sits at `output` now came from the failed run (or is
            // the stale copy being replaced) and must not become a cache hit.
            discard_partial(output);
            return Err(OfficeConvertError::UnknownFormat {
                path: input.to_path_buf(),
                source,
            });
        }
        Ok(false)
    }
}

fn discard_partial(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", output.display(), e),
    }
}
