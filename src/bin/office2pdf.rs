//! CLI binary for officeconv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig` and prints one cached PDF path per input, in the
//! order the inputs were given.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use officeconv::{
    supported_mimetypes, CacheKeyScheme, ConversionOutcome, ConversionProgressCallback,
    ConverterConfig, OfficeConverter, ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per file. Files finish out of order
/// when `--concurrency` is above one.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<PathBuf, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.green/238}] {pos}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, input: &Path) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(input)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_files} files…"))
        ));
    }

    fn on_file_start(&self, input: &Path) {
        self.start_times
            .lock()
            .unwrap()
            .insert(input.to_path_buf(), Instant::now());
        self.bar.set_message(input.display().to_string());
    }

    fn on_file_complete(&self, input: &Path, outcome: &ConversionOutcome) {
        let elapsed = self.elapsed_secs(input);
        let status = if outcome.cache_hit {
            dim("cached")
        } else if outcome.has_output() {
            green("converted")
        } else {
            dim(&format!("skipped ({})", outcome.media_type))
        };
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            input.display(),
            status,
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, input: &Path, error: &str) {
        let elapsed = self.elapsed_secs(input);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep multi-line backend diagnostics on one line.
        let msg = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            input.display(),
            red(msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!("{} {} files done", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} files done  ({} failed)",
                if failed == total_files { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one document; prints the cached PDF path
  office2pdf report.docx

  # Several documents, four unoconv runs at a time
  office2pdf -c 4 *.doc *.xls

  # Talk to a running office listener over a pipe
  office2pdf --pipe slides.odp

  # Trust the caller's media type instead of sniffing
  office2pdf --mime-type application/msword legacy.bin

  # JSON outcome per file
  office2pdf --json notes.odt

  # Which media types are convertible?
  office2pdf --list-mimetypes

CACHE:
  PDFs are written to {temp-dir}/{key}_office2pdf and reused as long as the
  file exists. Edited inputs are NOT reconverted unless --verify-freshness
  is given.

ENVIRONMENT VARIABLES:
  OFFICE2PDF_TEMP_DIR   Cache directory
  OFFICE2PDF_BACKEND    Conversion executable (default /usr/bin/unoconv)
  OFFICE2PDF_USE_PIPE   Enable pipe mode
  RUST_LOG              Overrides the log filter
"#;

/// Convert office documents to PDF through unoconv, with an on-disk cache.
#[derive(Parser, Debug)]
#[command(
    name = "office2pdf",
    version,
    about = "Convert office documents to PDF through unoconv, with an on-disk cache",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Documents to convert.
    #[arg(required_unless_present = "list_mimetypes")]
    inputs: Vec<PathBuf>,

    /// Directory for cached PDFs.
    #[arg(long, env = "OFFICE2PDF_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Conversion executable.
    #[arg(long, env = "OFFICE2PDF_BACKEND")]
    backend: Option<PathBuf>,

    /// Use unoconv's pipe mode with a fresh pipe name per run.
    #[arg(long, env = "OFFICE2PDF_USE_PIPE")]
    pipe: bool,

    /// Prefix for generated pipe names.
    #[arg(long, default_value = officeconv::config::DEFAULT_PIPE_PREFIX)]
    pipe_prefix: String,

    /// Skip detection and treat every input as this media type.
    #[arg(long)]
    mime_type: Option<String>,

    /// How cache file names are derived from input paths.
    #[arg(long, value_enum, default_value = "hashed")]
    cache_key: CacheKeyArg,

    /// Reconvert when the cached PDF is older than the input.
    #[arg(long)]
    verify_freshness: bool,

    /// Number of concurrent backend runs.
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,

    /// Print one JSON outcome per input instead of paths.
    #[arg(long)]
    json: bool,

    /// Print the convertible media types and exit.
    #[arg(long)]
    list_mimetypes: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum CacheKeyArg {
    Hashed,
    Flattened,
}

impl From<CacheKeyArg> for CacheKeyScheme {
    fn from(v: CacheKeyArg) -> Self {
        match v {
            CacheKeyArg::Hashed => CacheKeyScheme::Hashed,
            CacheKeyArg::Flattened => CacheKeyScheme::Flattened,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inputs.len() > 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_mimetypes {
        for m in supported_mimetypes() {
            println!("{m}");
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    let converter = OfficeConverter::new(config).context("Failed to set up the converter")?;

    let mut failed = 0usize;

    if let Some(ref media_type) = cli.mime_type {
        // A declared type applies to every input; no batch detection needed.
        for input in &cli.inputs {
            let result = converter.convert_async(input, Some(media_type.as_str())).await;
            if !report(&cli, input, result)? {
                failed += 1;
            }
        }
    } else {
        let progress: Option<ProgressCallback> = if show_progress {
            Some(CliProgressCallback::new() as ProgressCallback)
        } else {
            None
        };
        let results = converter
            .convert_many(&cli.inputs, cli.concurrency, progress)
            .await;
        for (input, result) in results {
            if !report(&cli, &input, result)? {
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} inputs failed", cli.inputs.len());
    }
    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .use_pipe(cli.pipe)
        .pipe_prefix(cli.pipe_prefix.clone())
        .cache_key(cli.cache_key.clone().into())
        .verify_freshness(cli.verify_freshness);

    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(ref backend) = cli.backend {
        builder = builder.backend_path(backend);
    }

    builder.build().context("Invalid configuration")
}

/// Print one result. Returns false when the input failed.
fn report(
    cli: &Cli,
    input: &Path,
    result: Result<ConversionOutcome, officeconv::OfficeConvertError>,
) -> Result<bool> {
    match result {
        Ok(outcome) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&outcome).context("Failed to serialise outcome")?
                );
            } else if outcome.has_output() {
                println!("{outcome}");
            } else if !cli.quiet {
                eprintln!(
                    "{} {}: {} is not convertible",
                    dim("–"),
                    input.display(),
                    outcome.media_type
                );
            }
            Ok(true)
        }
        Err(e) => {
            if e.is_unknown_format() {
                eprintln!("{} {}: {}", red("✗"), input.display(), e);
            } else {
                eprintln!("{} {}: {:#}", red("✗"), input.display(), anyhow::Error::new(e));
            }
            Ok(false)
        }
    }
}
