//! Input resolution: turn a user-supplied path, URL or byte buffer into a
//! local PDF file that pdfium can open.
//!
//! Downloads and in-memory inputs are written into a `TempDir` owned by the
//! returned [`ResolvedInput`], so the file disappears when the extraction is
//! done. Every path is checked for the `%PDF` magic before it is returned.

use crate::error::Pdf2TablesError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A local PDF, possibly backed by a temp directory.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was downloaded or handed over as bytes; the `TempDir` keeps the
    /// file alive until the extraction completes.
    Temporary { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Temporary { path, .. } => path,
        }
    }

    /// Lowercased file extension, without the dot.
    pub fn extension(&self) -> String {
        self.path()
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2TablesError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Write PDF bytes into a fresh temp directory.
pub fn from_bytes(bytes: &[u8]) -> Result<ResolvedInput, Pdf2TablesError> {
    let temp_dir = TempDir::new().map_err(|e| Pdf2TablesError::Internal(format!("tempdir: {e}")))?;
    let path = temp_dir.path().join("input.pdf");
    check_magic(&path, bytes)?;
    std::fs::write(&path, bytes)
        .map_err(|e| Pdf2TablesError::Internal(format!("tempfile write: {e}")))?;
    Ok(ResolvedInput::Temporary {
        path,
        _temp_dir: temp_dir,
    })
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, Pdf2TablesError> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(Pdf2TablesError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            // Files shorter than four bytes fall through to pdfium, which
            // reports them as corrupt.
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(Pdf2TablesError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2TablesError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2TablesError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2TablesError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2TablesError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2TablesError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2TablesError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2TablesError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| Pdf2TablesError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(filename_from_url(url));
    check_magic(&path, &bytes)?;

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| Pdf2TablesError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), path.display());
    Ok(ResolvedInput::Temporary {
        path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("table example for unstructured.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_variants() {
        assert_eq!(filename_from_url("https://x.org/papers/a.pdf"), "a.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2TablesError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap_err();
        match err {
            Pdf2TablesError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.PDF");
        std::fs::write(&path, b"%PDF-1.7\n%stub").unwrap();
        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), path);
        assert_eq!(resolved.extension(), "pdf");
    }

    #[test]
    fn from_bytes_keeps_file_until_drop() {
        let resolved = from_bytes(b"%PDF-1.4 minimal").unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn from_bytes_rejects_other_formats() {
        assert!(matches!(
            from_bytes(b"<html></html>"),
            Err(Pdf2TablesError::NotAPdf { .. })
        ));
    }
}
