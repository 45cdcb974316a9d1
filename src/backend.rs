//! The external conversion executable.
//!
//! [`ConversionBackend`] is the seam between the cache controller and the
//! process that actually renders documents. [`UnoconvBackend`] drives
//! `unoconv`; tests and embedders can plug in anything else.
//!
//! ## Command line
//!
//! ```text
//! <executable> [--pipe <prefix>-<random>] --format=pdf --output=<out> <in>
//! ```
//!
//! Order matters: some unoconv versions parse their flags positionally.

use crate::config::ConverterConfig;
use crate::error::BackendError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Converts one input file into one PDF at a caller-chosen location.
///
/// Implementations block until the conversion is finished. They must be
/// `Send + Sync`; a single backend is shared by every clone of a
/// [`crate::OfficeConverter`].
pub trait ConversionBackend: Send + Sync {
    /// Write a PDF rendering of `input` to `output`.
    fn convert(&self, input: &Path, output: &Path) -> Result<(), BackendError>;
}

/// Runs `unoconv` (or a compatible executable) as a child process.
#[derive(Debug, Clone)]
pub struct UnoconvBackend {
    executable: PathBuf,
    use_pipe: bool,
    pipe_prefix: String,
}

impl UnoconvBackend {
    /// Fails with [`BackendError::Unavailable`] when the executable does not
    /// exist. This is the only place the path is checked.
    pub fn new(config: &ConverterConfig) -> Result<Self, BackendError> {
        let executable = config.backend_executable();
        if !executable.exists() {
            return Err(BackendError::Unavailable { path: executable });
        }
        debug!("Using conversion backend {}", executable.display());
        Ok(Self {
            executable,
            use_pipe: config.use_pipe,
            pipe_prefix: config.pipe_prefix.clone(),
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full argument vector, executable first.
    ///
    /// In pipe mode every call generates a fresh pipe name.
    pub fn build_command(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(6);
        args.push(self.executable.clone().into_os_string());

        if self.use_pipe {
            args.push("--pipe".into());
            args.push(self.pipe_name().into());
        }

        args.push("--format=pdf".into());

        let mut output_flag = OsString::from("--output=");
        output_flag.push(output);
        args.push(output_flag);

        args.push(input.as_os_str().to_owned());
        args
    }

    fn pipe_name(&self) -> String {
        format!("{}-{}", self.pipe_prefix, Uuid::new_v4().simple())
    }
}

impl ConversionBackend for UnoconvBackend {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), BackendError> {
        let args = self.build_command(input, output);
        debug!("Running backend: {:?}", args);

        let start = Instant::now();
        // std marks every descriptor except the three below close-on-exec.
        let result = Command::new(&self.executable)
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| BackendError::Launch {
                program: self.executable.clone(),
                source,
            })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !result.status.success() {
            let message = first_line(&result.stderr)
                .unwrap_or_else(|| format!("backend exited with {}", result.status));
            warn!(
                "Backend failed on {} after {}ms ({}): {}",
                input.display(),
                elapsed_ms,
                result.status,
                message
            );
            return Err(BackendError::Failed {
                status: result.status.code(),
                message,
            });
        }

        if !output.exists() {
            warn!(
                "Backend exited successfully but {} is missing",
                output.display()
            );
            return Err(BackendError::MissingOutput {
                path: output.to_path_buf(),
            });
        }

        info!(
            "Converted {} → {} in {}ms",
            input.display(),
            output.display(),
            elapsed_ms
        );
        Ok(())
    }
}

/// First line of a diagnostic stream, without the line terminator.
fn first_line(stream: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stream);
    let line = text.lines().next()?.trim_end();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}
