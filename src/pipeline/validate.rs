//! Upload validation: admit only well-formed png/jpg/jpeg/gif files.
//!
//! Checks run cheapest first: presence, name, extension, then a header probe
//! of the bytes. The bytes are staged to a uniquely named file under the
//! upload directory for the probe. The stage is a [`NamedTempFile`], so it is
//! deleted when the returned [`ValidatedUpload`] (or the error path) drops it.

use crate::error::{IngestError, ValidationError};
use image::{ImageFormat, ImageReader};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

/// Extensions accepted by [`UploadValidator`], lower-case.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// A file part as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// An upload that passed every check. Holds the staged copy on disk until
/// dropped.
#[derive(Debug)]
pub struct ValidatedUpload {
    /// Sanitised file name, safe for paths and for the stored record.
    pub filename: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    staged: NamedTempFile,
}

impl ValidatedUpload {
    /// Path of the staged copy.
    pub fn path(&self) -> &Path {
        self.staged.path()
    }
}

/// Stateless validator; the only thing it remembers is where to stage files.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    upload_dir: PathBuf,
}

impl UploadValidator {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Run every admission check on `file`.
    ///
    /// Returns [`IngestError::Validation`] for client-side problems and
    /// [`IngestError::Internal`] if the staging file cannot be written.
    pub fn validate(&self, file: Option<&UploadedFile>) -> Result<ValidatedUpload, IngestError> {
        let file = file.ok_or(ValidationError::MissingFile)?;
        let filename = check_name(&file.filename)?;

        let staged = self.stage(&filename, &file.bytes)?;
        let (format, width, height) = probe_image(staged.path())?;

        debug!(
            "Validated upload '{}' as {:?} {}x{}",
            filename, format, width, height
        );

        Ok(ValidatedUpload {
            filename,
            format,
            width,
            height,
            staged,
        })
    }

    /// Write `bytes` to `<upload_dir>/<uuid>_<random>.<ext>`.
    ///
    /// Only the extension of the client name reaches the path, so a long
    /// name can never exceed the file-system component limit.
    fn stage(&self, filename: &str, bytes: &[u8]) -> Result<NamedTempFile, IngestError> {
        std::fs::create_dir_all(&self.upload_dir).map_err(|e| {
            IngestError::Internal(format!(
                "cannot create upload dir '{}': {e}",
                self.upload_dir.display()
            ))
        })?;

        let prefix = format!("{}_", Uuid::new_v4());
        let suffix = extension(filename)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.upload_dir)
            .map_err(|e| IngestError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| IngestError::Internal(format!("tempfile write: {e}")))?;
        Ok(tmp)
    }
}

/// Check the client file name and return its sanitised form.
pub fn check_name(raw: &str) -> Result<String, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    let ext = extension(raw).ok_or_else(|| ValidationError::UnsupportedFormat {
        filename: raw.to_string(),
    })?;
    if !is_allowed_extension(&ext) {
        return Err(ValidationError::UnsupportedFormat {
            filename: raw.to_string(),
        });
    }

    let clean = sanitize_filename(raw);
    if clean.is_empty() || !clean.contains('.') {
        // Everything but the extension was stripped.
        return Ok(format!("upload.{ext}"));
    }
    Ok(clean)
}

/// The final dot-separated suffix, lower-cased. `None` if there is no dot.
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce a client file name to `[A-Za-z0-9_.-]`.
///
/// Path separators become word breaks, runs of whitespace become a single
/// `_`, non-ASCII and other unsafe characters are dropped, and leading or
/// trailing `.`/`_` are trimmed so the result can never be `..` or hidden.
pub fn sanitize_filename(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    RE_UNSAFE
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Header-only probe: sniff the format from magic bytes and read dimensions.
fn probe_image(path: &Path) -> Result<(ImageFormat, u32, u32), ValidationError> {
    let corrupted = |detail: String| ValidationError::CorruptedImage { detail };

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| corrupted(e.to_string()))?;

    let format = match reader.format() {
        Some(f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif)) => f,
        Some(other) => return Err(corrupted(format!("unsupported raster format {other:?}"))),
        None => return Err(corrupted("unrecognised image signature".into())),
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| corrupted(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(corrupted(format!("degenerate dimensions {width}x{height}")));
    }

    Ok((format, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension("archive.tar.gif").as_deref(), Some("gif"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("trailingdot.").as_deref(), Some(""));
    }

    #[test]
    fn test_check_name_rejects_disallowed() {
        for name in ["a.bmp", "a.PNG.exe", "png", "a.webp", "a.", "jpeg"] {
            assert!(
                matches!(check_name(name), Err(ValidationError::UnsupportedFormat { .. })),
                "{name} should be unsupported"
            );
        }
        assert_eq!(check_name(""), Err(ValidationError::EmptyFilename));
    }

    #[test]
    fn test_check_name_accepts_any_case() {
        for name in ["a.png", "B.JPG", "c.JpEg", "d.Gif"] {
            assert!(check_name(name).is_ok(), "{name} should pass");
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "etc_passwd.png");
        assert_eq!(sanitize_filename("my roof photo.jpg"), "my_roof_photo.jpg");
        assert_eq!(sanitize_filename("C:\\Users\\me\\car.gif"), "C_Users_me_car.gif");
        assert_eq!(sanitize_filename("näive$.png"), "nive.png");
        assert_eq!(sanitize_filename("..hidden.png"), "hidden.png");
    }

    #[test]
    fn test_check_name_falls_back_when_stem_stripped() {
        assert_eq!(check_name("日本.png").unwrap(), "upload.png");
    }

    #[test]
    fn test_validate_accepts_png_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let v = UploadValidator::new(dir.path());
        let file = UploadedFile::new("roof.png", png_bytes(8, 4));

        let ok = v.validate(Some(&file)).expect("valid png");
        assert_eq!(ok.filename, "roof.png");
        assert_eq!((ok.width, ok.height), (8, 4));
        assert_eq!(ok.format, ImageFormat::Png);
        assert!(ok.path().exists());
        assert!(ok
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(".png"));

        drop(ok);
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_long_name_is_kept_but_not_staged() {
        let dir = tempfile::tempdir().unwrap();
        let v = UploadValidator::new(dir.path());
        let name = format!("{}.PNG", "a".repeat(240));
        let file = UploadedFile::new(name.clone(), png_bytes(4, 4));

        let ok = v.validate(Some(&file)).expect("long names are admissible");
        assert_eq!(ok.filename, name);
        let staged = ok.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(staged.len() < 64, "staged name too long: {staged}");
        assert!(staged.ends_with(".png"));
    }

    #[test]
    fn test_validate_rejects_corrupted_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let v = UploadValidator::new(dir.path());

        let mut truncated = png_bytes(8, 8);
        truncated.truncate(12);
        for bytes in [b"not an image at all".to_vec(), Vec::new(), truncated] {
            let file = UploadedFile::new("x.png", bytes);
            let err = v.validate(Some(&file)).unwrap_err();
            assert!(
                matches!(
                    err,
                    IngestError::Validation(ValidationError::CorruptedImage { .. })
                ),
                "got {err:?}"
            );
            assert!(dir_is_empty(dir.path()));
        }
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadValidator::new(dir.path()).validate(None).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Validation(ValidationError::MissingFile)
        ));
    }

    #[test]
    fn test_unsupported_extension_never_stages() {
        let dir = tempfile::tempdir().unwrap();
        let v = UploadValidator::new(dir.path().join("staging"));
        let file = UploadedFile::new("scan.tiff", png_bytes(2, 2));
        assert!(v.validate(Some(&file)).is_err());
        assert!(!dir.path().join("staging").exists());
    }
}
