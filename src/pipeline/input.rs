//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! Local files are read whole; URLs are downloaded into memory. In both cases
//! the format comes from the filename extension, and an unsupported extension
//! is rejected before any bytes are read or fetched where possible.

use crate::error::QuizError;
use crate::model::{file_extension, Document, DocumentFormat};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a [`Document`], downloading it first if it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Document, QuizError> {
    if input.trim().is_empty() {
        return Err(QuizError::InvalidInput {
            input: input.to_string(),
            reason: "expected a file path or an http(s) URL".into(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<Document, QuizError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // Fail on the extension before touching the disk.
    DocumentFormat::from_filename(&filename)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => QuizError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => QuizError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => QuizError::InvalidInput {
            input: path.display().to_string(),
            reason: e.to_string(),
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Document::from_filename(bytes, filename)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, QuizError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| QuizError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            QuizError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            QuizError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(QuizError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = filename_from_url(url, content_type.as_deref());
    DocumentFormat::from_filename(&filename)?;

    let bytes = response.bytes().await.map_err(map_send_err)?;
    info!("Downloaded {} bytes as {}", bytes.len(), filename);

    Document::from_filename(bytes.to_vec(), filename)
}

/// Last path segment of `url` when it has an extension, otherwise a name
/// derived from the response content type.
fn filename_from_url(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && !file_extension(last).is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    let ext = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .and_then(|mime| {
            [DocumentFormat::Pdf, DocumentFormat::Docx, DocumentFormat::Txt]
                .into_iter()
                .find(|f| f.content_type() == mime)
        })
        .map(|f| match f {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Txt => "txt",
        })
        .unwrap_or("");
    format!("downloaded.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url_path() {
        assert_eq!(
            filename_from_url("https://example.com/notes/ch1.docx?dl=1", None),
            "ch1.docx"
        );
    }

    #[test]
    fn test_filename_from_content_type() {
        assert_eq!(
            filename_from_url("https://example.com/download", Some("application/pdf")),
            "downloaded.pdf"
        );
        assert_eq!(
            filename_from_url("https://example.com/", Some("text/plain; charset=utf-8")),
            "downloaded.txt"
        );
        assert_eq!(filename_from_url("https://example.com/x", None), "downloaded.");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = resolve_input("/definitely/not/here.txt", 5).await.unwrap_err();
        assert!(matches!(err, QuizError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected_first() {
        let err = resolve_input("/definitely/not/here.pptx", 5).await.unwrap_err();
        assert!(matches!(err, QuizError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_blank_input() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, QuizError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, "Cells are the basic unit of life.").unwrap();
        let doc = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::Txt);
        assert_eq!(doc.filename, "notes.TXT");
        assert_eq!(doc.bytes.len(), 33);
    }
}
