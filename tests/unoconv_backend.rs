//! `UnoconvBackend` driving real child processes.
//!
//! Each test writes a small `/bin/sh` script that stands in for unoconv:
//! it logs its arguments next to itself and then succeeds, fails or lies
//! about success.
#![cfg(unix)]

use officeconv::{
    BackendError, ConversionBackend, ConverterConfig, OfficeConvertError, OfficeConverter,
    UnoconvBackend,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Writing an executable while another thread forks can make exec fail
/// with ETXTBSY, so script creation and runs are serialized.
static EXEC_LOCK: Mutex<()> = Mutex::new(());

const WRITES_PDF: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$@" > "$dir/args.log"
echo run >> "$dir/runs.log"
for arg in "$@"; do
  case "$arg" in
    --output=*) out="${arg#--output=}" ;;
  esac
done
printf '%%PDF-1.4\n' > "$out"
echo "converted"
"#;

const FAILS: &str = r#"#!/bin/sh
echo "bad file descriptor" >&2
echo "second diagnostic line" >&2
exit 1
"#;

const SILENT_SUCCESS: &str = "#!/bin/sh\nexit 0\n";

const CRASHES_MIDWAY: &str = r#"#!/bin/sh
dir=$(dirname "$0")
echo run >> "$dir/runs.log"
for arg in "$@"; do
  case "$arg" in
    --output=*) out="${arg#--output=}" ;;
  esac
done
printf 'half a pdf' > "$out"
echo "conversion crashed" >&2
exit 1
"#;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn script(&self, body: &str, mode: u32) -> PathBuf {
        let path = self.dir.path().join("fake-unoconv");
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn input(&self, name: &str) -> PathBuf {
        let p = self.dir.path().join(name);
        std::fs::write(&p, b"document body").unwrap();
        p
    }

    fn config(&self, backend: &Path, use_pipe: bool) -> ConverterConfig {
        ConverterConfig::builder()
            .backend_path(backend)
            .temp_dir(self.dir.path().join("cache"))
            .use_pipe(use_pipe)
            .build()
            .unwrap()
    }

    fn logged_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn runs(&self) -> usize {
        std::fs::read_to_string(self.dir.path().join("runs.log"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}

// ── Construction ─────────────────────────────────────────────────────────────

#[test]
fn nonexistent_executable_fails_at_construction() {
    let sb = Sandbox::new();
    let config = sb.config(&sb.dir.path().join("no-such-unoconv"), false);

    let err = OfficeConverter::new(config).unwrap_err();

    assert!(matches!(err, OfficeConvertError::BackendUnavailable { .. }));
    assert!(err.to_string().contains("no-such-unoconv"));
}

// ── Successful runs ──────────────────────────────────────────────────────────

#[test]
fn converts_and_then_serves_from_cache() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(WRITES_PDF, 0o755);
    let converter = OfficeConverter::new(sb.config(&exe, false)).unwrap();
    let input = sb.input("minutes.doc");

    let first = converter
        .convert(&input, Some("application/msword"))
        .unwrap();
    let output = first.output_path().unwrap().to_path_buf();
    assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
    assert_eq!(sb.runs(), 1);

    let second = converter
        .convert(&input, Some("application/msword"))
        .unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.output_path(), Some(output.as_path()));
    assert_eq!(sb.runs(), 1);
}

#[test]
fn command_line_without_pipe() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(WRITES_PDF, 0o755);
    let backend = UnoconvBackend::new(&sb.config(&exe, false)).unwrap();
    let input = sb.input("a.odt");
    let output = sb.dir.path().join("a.pdf");

    backend.convert(&input, &output).unwrap();

    assert_eq!(
        sb.logged_args(),
        vec![
            "--format=pdf".to_string(),
            format!("--output={}", output.display()),
            input.display().to_string(),
        ]
    );
}

#[test]
fn command_line_with_pipe() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(WRITES_PDF, 0o755);
    let backend = UnoconvBackend::new(&sb.config(&exe, true)).unwrap();
    let input = sb.input("a.odt");
    let output = sb.dir.path().join("a.pdf");

    backend.convert(&input, &output).unwrap();

    let args = sb.logged_args();
    assert_eq!(args.len(), 5);
    assert_eq!(args[0], "--pipe");
    assert!(args[1].starts_with("officeconv-"), "got: {}", args[1]);
    assert_eq!(args[2], "--format=pdf");
    assert_eq!(args[3], format!("--output={}", output.display()));
    assert_eq!(args[4], input.display().to_string());
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[test]
fn nonzero_exit_becomes_unknown_format_with_first_stderr_line() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(FAILS, 0o755);
    let converter = OfficeConverter::new(sb.config(&exe, false)).unwrap();
    let input = sb.input("corrupt.xls");

    let err = converter
        .convert(&input, Some("application/vnd.ms-excel"))
        .unwrap_err();

    let msg = err.to_string();
    assert!(err.is_unknown_format(), "got: {err:?}");
    assert!(msg.contains("bad file descriptor"), "got: {msg}");
    assert!(!msg.contains("second diagnostic line"), "got: {msg}");
    match err {
        OfficeConvertError::UnknownFormat {
            source: BackendError::Failed { status, .. },
            ..
        } => assert_eq!(status, Some(1)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn partial_output_of_a_failed_run_is_not_cached() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(CRASHES_MIDWAY, 0o755);
    let converter = OfficeConverter::new(sb.config(&exe, false)).unwrap();
    let input = sb.input("x.doc");
    let cached = converter.cache_path_for(&input).unwrap();

    let first = converter
        .convert(&input, Some("application/msword"))
        .unwrap_err();
    assert!(first.to_string().contains("conversion crashed"), "got: {first}");
    assert!(!cached.exists(), "partial output left at {}", cached.display());

    let second = converter
        .convert(&input, Some("application/msword"))
        .unwrap_err();
    assert!(second.is_unknown_format(), "got: {second:?}");
    assert_eq!(sb.runs(), 2);
}

#[test]
fn success_without_output_is_an_error() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let exe = sb.script(SILENT_SUCCESS, 0o755);
    let converter = OfficeConverter::new(sb.config(&exe, false)).unwrap();
    let input = sb.input("empty.doc");

    let err = converter
        .convert(&input, Some("application/msword"))
        .unwrap_err();

    assert!(matches!(
        err,
        OfficeConvertError::UnknownFormat {
            source: BackendError::MissingOutput { .. },
            ..
        }
    ));
}

#[test]
fn launch_failure_becomes_unknown_format() {
    let _lock = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    // Present but not executable: passes the existence check, fails to spawn.
    let exe = sb.script(WRITES_PDF, 0o644);
    let converter = OfficeConverter::new(sb.config(&exe, false)).unwrap();
    let input = sb.input("memo.doc");

    let err = converter
        .convert(&input, Some("application/msword"))
        .unwrap_err();

    assert!(matches!(
        err,
        OfficeConvertError::UnknownFormat {
            source: BackendError::Launch { .. },
            ..
        }
    ));
    assert_eq!(sb.runs(), 0);
}
