//! On-disk conversion cache.
//!
//! A cache entry is just a file at a path derived from the input path:
//!
//! ```text
//! {temp_dir}/{key}{CACHED_FILE_SUFFIX}
//! ```
//!
//! Its existence is the whole cache signal. Nothing records timestamps or
//! checksums, so an input edited after its first conversion keeps being
//! served from the old PDF unless [`ConverterConfig::verify_freshness`] is
//! set. Entries are never removed by this crate.
//!
//! [`InFlight`] serializes duplicate requests for one entry inside a
//! process. Separate processes sharing `temp_dir` are not coordinated.

use crate::config::{CacheKeyScheme, ConverterConfig};
use crate::error::OfficeConvertError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Appended to every cache file name.
pub const CACHED_FILE_SUFFIX: &str = "_office2pdf";

/// Location of the cached PDF for `input` under `config`.
pub fn cache_path(config: &ConverterConfig, input: &Path) -> Result<PathBuf, OfficeConvertError> {
    let mut name = match config.cache_key {
        CacheKeyScheme::Hashed => {
            let absolute =
                std::path::absolute(input).map_err(|source| OfficeConvertError::CacheDir {
                    path: input.to_path_buf(),
                    source,
                })?;
            OsString::from(hash_key(&absolute))
        }
        CacheKeyScheme::Flattened => OsString::from(flatten_key(input)),
    };
    name.push(CACHED_FILE_SUFFIX);
    Ok(config.temp_dir.join(name))
}

fn hash_key(absolute: &Path) -> String {
    let digest = Sha256::digest(absolute.as_os_str().as_encoded_bytes());
    hex::encode(digest)
}

fn flatten_key(input: &Path) -> String {
    input
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Whether a cached `output` is at least as new as `input`.
///
/// Unreadable timestamps count as stale.
pub fn is_fresh(input: &Path, output: &Path) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified());
    match (modified(input), modified(output)) {
        (Ok(input_time), Ok(output_time)) => output_time >= input_time,
        _ => false,
    }
}

/// Registry of conversions in progress, keyed by cache path.
///
/// Each key maps to a mutex; a caller holds it for the whole
/// check-then-convert sequence. Slots are dropped from the map once no
/// caller holds or waits on them.
#[derive(Debug, Default)]
pub struct InFlight {
    slots: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while no other caller of this registry works on `key`.
    pub fn run<T>(&self, key: &Path, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.to_path_buf()).or_default())
        };

        let release = SlotRelease {
            slots: &self.slots,
            key,
            slot,
        };
        let _guard = release.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drops the registry entry for `key` once no caller holds or awaits it,
/// including when the closure passed to [`InFlight::run`] unwinds.
struct SlotRelease<'a> {
    slots: &'a Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    key: &'a Path,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // New handles are only cloned under this lock: two means the map's and ours.
        if slots
            .get(self.key)
            .is_some_and(|s| Arc::ptr_eq(s, &self.slot) && Arc::strong_count(s) == 2)
        {
            slots.remove(self.key);
        }
    }
}
