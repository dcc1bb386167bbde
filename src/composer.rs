//! Client-side request composition: file selection, filtering and encoding.

use crate::error::UploadError;
use crate::protocol::{EncodedFile, GenerateQuizRequest};
use crate::quiz::QuestionCount;
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, warn};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Per-file size cap, before base64 encoding.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Files sent in one request. Together with [`MAX_FILE_SIZE`] this bounds the
/// request body (see [`max_request_size`]).
pub const MAX_FILES: usize = 3;

/// Largest `GenerateQuizRequest` body a valid selection can produce: every
/// file base64-encoded, plus room for names and JSON framing.
pub const fn max_request_size() -> usize {
    const ENCODED_FILE: usize = (MAX_FILE_SIZE + 2) / 3 * 4;
    MAX_FILES * ENCODED_FILE + 64 * 1024
}

/// A file the user picked, not yet encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes: bytes.into() }
    }

    /// Load a file from disk. The MIME type is sniffed from the PDF magic bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = if bytes.starts_with(b"%PDF-") { PDF_MIME_TYPE } else { "application/octet-stream" };
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Check the type and size constraints for upload.
    pub fn check(&self) -> Result<(), UploadError> {
        if self.mime_type != PDF_MIME_TYPE {
            return Err(UploadError::NotPdf { name: self.name.clone(), mime_type: self.mime_type.clone() });
        }
        if self.size() > MAX_FILE_SIZE {
            return Err(UploadError::TooLarge { name: self.name.clone(), size: self.size(), limit: MAX_FILE_SIZE });
        }
        Ok(())
    }

    pub fn encode(&self) -> EncodedFile {
        EncodedFile::encode(&self.name, &self.mime_type, &self.bytes)
    }
}

/// Where a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Picker,
    Drop,
}

/// Non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerNotice {
    /// Some files were filtered out; the valid ones were kept.
    InvalidFiles { rejected: Vec<UploadError> },
    /// Drag and drop is not available; the user should use the picker.
    DragDropUnsupported,
}

impl ComposerNotice {
    pub fn message(&self) -> &'static str {
        match self {
            ComposerNotice::InvalidFiles { rejected }
                if rejected.iter().any(|e| matches!(e, UploadError::TooManyFiles { .. })) =>
            {
                "Only up to 3 PDF files under 5MB are allowed."
            }
            ComposerNotice::InvalidFiles { .. } => "Only PDF files under 5MB are allowed.",
            ComposerNotice::DragDropUnsupported => "Drag & drop is not supported here. Please use the file picker.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizRequestComposer {
    files: Vec<SelectedFile>,
    question_count: QuestionCount,
    drop_supported: bool,
}

impl Default for QuizRequestComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizRequestComposer {
    pub fn new() -> Self {
        Self { files: Vec::new(), question_count: QuestionCount::default(), drop_supported: true }
    }

    #[must_use]
    pub fn with_drop_support(mut self, supported: bool) -> Self {
        self.drop_supported = supported;
        self
    }

    /// Replace the selection with the valid subset of `files`.
    ///
    /// Returns a notice when anything was rejected. A drop on a surface that
    /// does not support it leaves the selection untouched.
    pub fn select(&mut self, files: Vec<SelectedFile>, source: SelectionSource) -> Option<ComposerNotice> {
        if source == SelectionSource::Drop && !self.drop_supported {
            warn!("drop received but drag and drop is unsupported");
            return Some(ComposerNotice::DragDropUnsupported);
        }

        let mut rejected = Vec::new();
        let mut valid = Vec::new();
        for file in files {
            let checked = file.check().and_then(|()| {
                if valid.len() < MAX_FILES {
                    Ok(())
                } else {
                    Err(UploadError::TooManyFiles { name: file.name.clone(), limit: MAX_FILES })
                }
            });
            match checked {
                Ok(()) => valid.push(file),
                Err(e) => {
                    debug!(error = %e, "rejecting selected file");
                    rejected.push(e);
                }
            }
        }

        self.files = valid;
        if rejected.is_empty() {
            None
        } else {
            Some(ComposerNotice::InvalidFiles { rejected })
        }
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn question_count(&self) -> QuestionCount {
        self.question_count
    }

    pub fn set_question_count(&mut self, count: QuestionCount) {
        self.question_count = count;
    }

    pub fn can_submit(&self) -> bool {
        !self.files.is_empty()
    }

    /// Name the title request is derived from.
    pub fn title_source(&self) -> Option<&str> {
        self.files.first().map(|f| f.name.as_str())
    }

    /// Encode every selected file and bundle them with the question count.
    pub fn build_request(&self) -> Result<GenerateQuizRequest, UploadError> {
        if self.files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        Ok(GenerateQuizRequest {
            files: self.files.iter().map(SelectedFile::encode).collect(),
            questions_length: Some(self.question_count.into()),
        })
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}
