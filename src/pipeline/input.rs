//! Input classification: URL vs. local path, image vs. PDF, upload checks.
//!
//! Every check here runs on metadata only (the name, the extension, the
//! size reported by the file system). Nothing is opened or decoded until an
//! input has passed, so an oversized or disallowed upload is rejected before
//! it costs any memory.

use crate::error::OcrError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by [`check_upload`].
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "pdf"];

/// What kind of document an input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
}

impl InputKind {
    /// The `type` value used in [`crate::output::FileReport`].
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Image => "image",
            InputKind::Pdf => "pdf",
        }
    }
}

/// A user-supplied image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Forwarded to the model verbatim; never downloaded.
    Url(String),
    /// Read, normalised and inlined as a data URI.
    Local(PathBuf),
}

impl ImageSource {
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            ImageSource::Url(input.to_string())
        } else {
            ImageSource::Local(PathBuf::from(input))
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Lower-cased extension of the final path component, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Whether `name` carries one of [`ALLOWED_EXTENSIONS`].
pub fn is_allowed_file(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Classify a CLI-style input. Only local `.pdf` files are treated as PDFs;
/// URLs are always forwarded as images.
pub fn classify(input: &str) -> InputKind {
    if !is_url(input) && extension_of(input).as_deref() == Some("pdf") {
        InputKind::Pdf
    } else {
        InputKind::Image
    }
}

/// Upload-layer gate: extension allow-list, then size cap.
///
/// `size` comes from file-system metadata, not from reading the body.
pub fn check_upload(name: &str, size: u64, max_bytes: u64) -> Result<InputKind, OcrError> {
    if name.trim().is_empty() {
        return Err(OcrError::UnsupportedFormat {
            detail: "No file selected".into(),
        });
    }
    if !is_allowed_file(name) {
        return Err(OcrError::UnsupportedFormat {
            detail: format!(
                "File type not allowed. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        });
    }
    if size > max_bytes {
        return Err(OcrError::FileTooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(classify(name))
}

/// Stat a local file: existence, readability, size.
pub fn local_file_size(path: &Path) -> Result<u64, OcrError> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => OcrError::NotFound {
            path: path.to_path_buf(),
        },
    })?;
    if !meta.is_file() {
        return Err(OcrError::NotFound {
            path: path.to_path_buf(),
        });
    }
    debug!("Resolved local input: {} ({} bytes)", path.display(), meta.len());
    Ok(meta.len())
}

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").unwrap());

/// Reduce an uploaded filename to a safe single path component.
///
/// Keeps `[A-Za-z0-9_.-]`, collapses everything else to `_`, and strips
/// leading/trailing dots and underscores from the stem. The extension is
/// sanitised separately so it survives even when the stem does not, since
/// the pipeline dispatches on it.
pub fn secure_filename(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = match last.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (last, None),
    };

    let stem = UNSAFE_CHARS.replace_all(stem, "_");
    let stem = stem.trim_matches(|c: char| c == '.' || c == '_');
    let stem = if stem.is_empty() { "file" } else { stem };

    match ext
        .map(|e| e.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
        .filter(|e| !e.is_empty())
    {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.png"));
        assert!(is_url("http://example.com/a.png"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("a.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("scan.PDF"), InputKind::Pdf);
        assert_eq!(classify("./docs/report.pdf"), InputKind::Pdf);
        assert_eq!(classify("photo.jpg"), InputKind::Image);
        // Remote PDFs are not rasterised.
        assert_eq!(classify("https://example.com/a.pdf"), InputKind::Image);
    }

    #[test]
    fn test_allowed_extensions() {
        for name in ["a.png", "a.JPG", "a.jpeg", "a.gif", "a.bmp", "a.webp", "a.pdf"] {
            assert!(is_allowed_file(name), "{name}");
        }
        assert!(!is_allowed_file("a.tiff"));
        assert!(!is_allowed_file("noext"));
        assert!(!is_allowed_file("dir.png/file"));
    }

    #[test]
    fn upload_rejects_extension_before_size() {
        let err = check_upload("huge.exe", u64::MAX, 10).unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedFormat { .. }));
    }

    #[test]
    fn upload_rejects_oversized() {
        let err = check_upload("a.pdf", 17 * 1024 * 1024, 16 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, OcrError::FileTooLarge { .. }));
    }

    #[test]
    fn upload_classifies_accepted_files() {
        assert_eq!(check_upload("a.pdf", 10, 100).unwrap(), InputKind::Pdf);
        assert_eq!(check_upload("a.webp", 10, 100).unwrap(), InputKind::Image);
    }

    #[test]
    fn upload_rejects_empty_name() {
        assert!(check_upload("", 0, 100).is_err());
    }

    #[test]
    fn secure_filename_strips_paths_and_symbols() {
        assert_eq!(secure_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(secure_filename("my scan (1).pdf"), "my_scan_1.pdf");
        assert_eq!(secure_filename("archive.tar.gz"), "archive.tar.gz");
        assert_eq!(secure_filename("C:\\Users\\me\\img.JPG"), "img.JPG");
    }

    #[test]
    fn secure_filename_restores_extension() {
        assert_eq!(secure_filename("扫描.pdf"), "file.pdf");
        assert_eq!(secure_filename(".png"), "file.png");
        assert_eq!(secure_filename("???"), "file");
    }

    #[test]
    fn local_file_size_missing() {
        let err = local_file_size(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, OcrError::NotFound { .. }));
    }

    #[test]
    fn image_source_parse() {
        assert_eq!(
            ImageSource::parse("https://x/y.png"),
            ImageSource::Url("https://x/y.png".into())
        );
        assert_eq!(
            ImageSource::parse("y.png"),
            ImageSource::Local(PathBuf::from("y.png"))
        );
    }
}
