use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Unsupported file type.")]
    UnsupportedFileType,

    #[error("Error reading file: {0}")]
    Unreadable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Detects the kind from the filename extension, falling back to the
    /// PDF magic bytes when the upload has no usable name.
    pub fn detect(filename: &str, bytes: &[u8]) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => Some(Self::Pdf),
            Some("txt" | "text" | "md" | "csv" | "json") => Some(Self::PlainText),
            Some(_) => None,
            None if bytes.starts_with(b"%PDF-") => Some(Self::Pdf),
            None => None,
        }
    }
}

/// Pulls plain text out of an uploaded report.
pub async fn extract_text(filename: &str, bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let kind = DocumentKind::detect(filename, &bytes).ok_or_else(|| {
        warn!(filename, "Rejected upload with unsupported file type");
        ExtractionError::UnsupportedFileType
    })?;

    let text = match kind {
        DocumentKind::Pdf => extract_pdf(bytes).await?,
        DocumentKind::PlainText => String::from_utf8(bytes)
            .map_err(|_| ExtractionError::Unreadable("file is not valid UTF-8 text".to_string()))?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::Unreadable(
            "no text could be extracted".to_string(),
        ));
    }

    info!(
        filename,
        kind = ?kind,
        text_len = text.len(),
        "Extracted report text"
    );
    Ok(text)
}

async fn extract_pdf(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    // pdf-extract is CPU bound and can panic on malformed input.
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::Unreadable(format!("PDF parser aborted: {e}")))?
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))
}
