//! CV intake: allow-list validation and handle creation.
//!
//! No content scanning and no parsing beyond reading plain text back out.

pub mod handlers;

use axum::extract::multipart::MultipartError;
use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::cv::CvHandle;

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// (extension, canonical MIME type)
const ALLOWED: &[(&str, &str)] = &[("pdf", PDF_MIME), ("txt", TEXT_MIME), ("docx", DOCX_MIME)];

/// Characters of CV text that make it into the prompt.
pub const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("'{file_name}' ({content_type}) is not a supported CV format; use PDF, DOCX or TXT")]
    Rejected {
        file_name: String,
        content_type: String,
    },

    #[error("uploaded file is empty")]
    Empty,

    #[error("multipart body has no 'file' field")]
    MissingFile,

    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

/// Resolves the canonical content type for an upload, or rejects it.
///
/// A file passes when either its declared MIME type or its extension is on the
/// allow-list. Extensions are matched case-insensitively.
pub fn accepted_content_type(file_name: &str, declared: Option<&str>) -> Result<&'static str, IntakeError> {
    let declared_mime = declared
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .unwrap_or_default();

    if let Some((_, mime)) = ALLOWED.iter().find(|(_, mime)| *mime == declared_mime) {
        return Ok(*mime);
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    ALLOWED
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| IntakeError::Rejected {
            file_name: file_name.to_string(),
            content_type: if declared_mime.is_empty() {
                "unknown type".to_string()
            } else {
                declared_mime
            },
        })
}

/// Validates an upload and wraps it in a `CvHandle` served under `session_id`.
pub fn accept_upload(
    session_id: Uuid,
    file_name: &str,
    declared: Option<&str>,
    bytes: Bytes,
) -> Result<CvHandle, IntakeError> {
    let content_type = accepted_content_type(file_name, declared)?;
    if bytes.is_empty() {
        return Err(IntakeError::Empty);
    }

    let id = Uuid::new_v4();
    Ok(CvHandle {
        id,
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        size_bytes: bytes.len(),
        display_url: format!("/api/v1/sessions/{session_id}/cv/{id}"),
        uploaded_at: Utc::now(),
        bytes,
    })
}

/// Text fed to the prompt. Plain-text CVs are read as-is; other formats are
/// not parsed and fall back to a placeholder naming the file.
pub fn cv_text(cv: &CvHandle) -> String {
    if cv.is_plain_text() {
        let text = String::from_utf8_lossy(&cv.bytes);
        if !text.trim().is_empty() {
            return text.into_owned();
        }
    }
    format!("Extracted text from {}", cv.file_name)
}

/// First `EXCERPT_CHARS` characters of the CV text.
pub fn cv_excerpt(cv: &CvHandle) -> String {
    cv_text(cv).chars().take(EXCERPT_CHARS).collect()
}
