//! JSON bodies exchanged between the client and the HTTP server.

use crate::composer::{MAX_FILES, MAX_FILE_SIZE, PDF_MIME_TYPE};
use crate::core::PdfDocument;
use crate::error::UploadError;
use crate::quiz::QuestionCount;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A file as sent over the wire: its content is a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
}

impl EncodedFile {
    pub fn encode(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let data = format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(bytes));
        Self { name: name.into(), mime_type, data }
    }

    /// Decode the data URL, enforcing the PDF type and size limit.
    pub fn decode(&self) -> Result<PdfDocument, UploadError> {
        if self.mime_type != PDF_MIME_TYPE {
            return Err(UploadError::NotPdf { name: self.name.clone(), mime_type: self.mime_type.clone() });
        }

        // A bare base64 payload is accepted as well as a full data URL
        let payload = match self.data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or(UploadError::InvalidDataUrl)?;
                if !header.ends_with(";base64") {
                    return Err(UploadError::InvalidDataUrl);
                }
                payload
            }
            None => self.data.as_str(),
        };

        let bytes = BASE64_STANDARD.decode(payload.trim())?;
        if bytes.len() > MAX_FILE_SIZE {
            return Err(UploadError::TooLarge { name: self.name.clone(), size: bytes.len(), limit: MAX_FILE_SIZE });
        }

        Ok(PdfDocument { name: self.name.clone(), bytes: Bytes::from(bytes) })
    }
}

/// Body of `POST /api/generate-quiz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    pub files: Vec<EncodedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_length: Option<u32>,
}

impl GenerateQuizRequest {
    /// Requested count, defaulting to 4 when absent.
    pub fn question_count(&self) -> Result<QuestionCount, crate::error::ValidationError> {
        self.questions_length.map_or(Ok(QuestionCount::default()), QuestionCount::new)
    }

    /// Only the first file is sent to the model. Requests carrying more files
    /// than a selection may hold are rejected.
    pub fn first_file(&self) -> Result<&EncodedFile, UploadError> {
        if let Some(extra) = self.files.get(MAX_FILES) {
            return Err(UploadError::TooManyFiles { name: extra.name.clone(), limit: MAX_FILES });
        }
        self.files.first().ok_or(UploadError::NoFiles)
    }
}

/// Body of `POST /api/generate-title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTitleRequest {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title: String,
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
