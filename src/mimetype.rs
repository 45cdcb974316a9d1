//! Media-type detection and the set of types the backend can convert.
//!
//! The converter only consumes a [`DetectedType`]; how it is produced is up
//! to the [`MediaTypeDetector`] plugged into [`crate::OfficeConverter`].
//! [`ContentSniffer`] is the default: a few magic-byte checks refined by the
//! file extension through `mime_guess`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Media types handed to the backend. Anything else is left alone.
pub const SUPPORTED_MIMETYPES: &[&str] = &[
    "application/msword",
    "application/mswrite",
    "application/mspowerpoint",
    "application/msexcel",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "text/plain",
    "application/vnd.oasis.opendocument.presentation",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.graphics",
    "application/vnd.ms-office",
];

static SUPPORTED_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SUPPORTED_MIMETYPES.iter().copied().collect());

/// The fixed list of convertible media types, for callers that pre-filter.
pub fn supported_mimetypes() -> &'static [&'static str] {
    SUPPORTED_MIMETYPES
}

/// Whether `media_type` is one the backend is asked to convert.
pub fn is_supported(media_type: &str) -> bool {
    SUPPORTED_SET.contains(media_type)
}

/// Result of media-type detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedType {
    pub media_type: String,
    /// Informational only; never used to decide anything.
    pub encoding: Option<String>,
}

impl DetectedType {
    pub fn new(media_type: impl Into<String>, encoding: Option<&str>) -> Self {
        Self {
            media_type: media_type.into(),
            encoding: encoding.map(str::to_string),
        }
    }
}

/// Best-guess media type for a file from its leading bytes and its path.
///
/// Implementations must be `Send + Sync`: one detector is shared by every
/// clone of a converter.
pub trait MediaTypeDetector: Send + Sync {
    fn detect(&self, content: &[u8], path: &Path) -> DetectedType;
}

/// Number of leading bytes the converter reads for detection.
pub const SNIFF_LEN: usize = 8 * 1024;

const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Reported for zero-length files whatever their extension.
pub const EMPTY_MEDIA_TYPE: &str = "application/x-empty";

/// Default detector: magic bytes first, extension second.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl MediaTypeDetector for ContentSniffer {
    fn detect(&self, content: &[u8], path: &Path) -> DetectedType {
        let by_ext = mime_guess::from_path(path).first_raw();

        let detected = if content.is_empty() {
            DetectedType::new(EMPTY_MEDIA_TYPE, Some("binary"))
        } else if content.starts_with(OLE2_MAGIC) {
            // Legacy Office binaries all share the compound-file container.
            let media_type = by_ext
                .filter(|m| is_supported(m) && *m != "text/plain")
                .unwrap_or("application/vnd.ms-office");
            DetectedType::new(media_type, Some("binary"))
        } else if content.starts_with(ZIP_MAGIC) {
            let media_type = by_ext
                .filter(|m| is_supported(m) && *m != "text/plain")
                .unwrap_or("application/zip");
            DetectedType::new(media_type, Some("binary"))
        } else if content.starts_with(PDF_MAGIC) {
            DetectedType::new("application/pdf", Some("binary"))
        } else if let Some(encoding) = text_encoding(content) {
            // Textual formats such as SVG or JSON keep their own type.
            let media_type = by_ext.unwrap_or("text/plain");
            DetectedType::new(media_type, Some(encoding))
        } else {
            DetectedType::new(
                by_ext.unwrap_or("application/octet-stream"),
                Some("binary"),
            )
        };

        debug!(
            "Detected {} ({:?}) for {}",
            detected.media_type,
            detected.encoding,
            path.display()
        );
        detected
    }
}

/// `Some("us-ascii" | "utf-8")` when `content` looks like text.
///
/// `content` is a prefix of the file, so a multi-byte sequence cut at the
/// end is still accepted.
fn text_encoding(content: &[u8]) -> Option<&'static str> {
    if content.contains(&0) {
        return None;
    }
    if content.is_ascii() {
        return Some("us-ascii");
    }
    match std::str::from_utf8(content) {
        Ok(_) => Some("utf-8"),
        Err(e) if e.error_len().is_none() => Some("utf-8"),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(content: &[u8], path: &str) -> DetectedType {
        ContentSniffer.detect(content, Path::new(path))
    }

    #[test]
    fn supported_set_matches_list() {
        assert_eq!(supported_mimetypes().len(), 14);
        assert!(is_supported("application/msword"));
        assert!(is_supported("text/plain"));
        assert!(!is_supported("application/pdf"));
        assert!(!is_supported("image/png"));
        assert!(!is_supported(""));
    }

    #[test]
    fn ole_container_with_doc_extension() {
        let mut content = OLE2_MAGIC.to_vec();
        content.extend_from_slice(&[0u8; 32]);
        let d = sniff(&content, "/data/letter.doc");
        assert_eq!(d.media_type, "application/msword");
        assert_eq!(d.encoding.as_deref(), Some("binary"));
    }

    #[test]
    fn ole_container_with_unknown_extension() {
        let d = sniff(OLE2_MAGIC, "/data/blob.bin");
        assert_eq!(d.media_type, "application/vnd.ms-office");
    }

    #[test]
    fn zip_container_with_odt_extension() {
        let d = sniff(b"PK\x03\x04rest-of-archive", "notes.odt");
        assert_eq!(d.media_type, "application/vnd.oasis.opendocument.text");
    }

    #[test]
    fn plain_zip_is_not_convertible() {
        let d = sniff(b"PK\x03\x04rest-of-archive", "bundle.zip");
        assert_eq!(d.media_type, "application/zip");
        assert!(!is_supported(&d.media_type));
    }

    #[test]
    fn pdf_is_not_convertible() {
        let d = sniff(b"%PDF-1.7\n", "already.pdf");
        assert_eq!(d.media_type, "application/pdf");
        assert!(!is_supported(&d.media_type));
    }

    #[test]
    fn ascii_text() {
        let d = sniff(b"hello world\n", "readme.txt");
        assert_eq!(d.media_type, "text/plain");
        assert_eq!(d.encoding.as_deref(), Some("us-ascii"));
    }

    #[test]
    fn utf8_text_without_extension() {
        let d = sniff("héllo wörld".as_bytes(), "NOTES");
        assert_eq!(d.media_type, "text/plain");
        assert_eq!(d.encoding.as_deref(), Some("utf-8"));
    }

    #[test]
    fn textual_non_document_formats_keep_their_type() {
        let d = sniff(
            br#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#,
            "logo.svg",
        );
        assert_eq!(d.media_type, "image/svg+xml");
        assert_eq!(d.encoding.as_deref(), Some("us-ascii"));
        assert!(!is_supported(&d.media_type));

        let d = sniff(br#"{"rows": [1, 2, 3]}"#, "data.json");
        assert_eq!(d.media_type, "application/json");
        assert!(!is_supported(&d.media_type));
    }

    #[test]
    fn empty_file_is_not_convertible() {
        let d = sniff(b"", "photo.png");
        assert_eq!(d.media_type, EMPTY_MEDIA_TYPE);
        assert!(!is_supported(&d.media_type));
        assert_eq!(sniff(b"", "notes.txt").media_type, EMPTY_MEDIA_TYPE);
    }

    #[test]
    fn truncated_utf8_prefix_still_text() {
        let full = "abc€".as_bytes();
        let cut = &full[..full.len() - 1];
        assert_eq!(text_encoding(cut), Some("utf-8"));
    }

    #[test]
    fn binary_falls_back_to_extension() {
        let d = sniff(&[0x89, b'P', b'N', b'G', 0, 0], "image.png");
        assert_eq!(d.media_type, "image/png");
        let d = sniff(&[0xff, 0x00, 0xfe], "mystery");
        assert_eq!(d.media_type, "application/octet-stream");
    }
}
