//! Loaded PDF documents

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// MIME type accepted for uploads
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Raw PDF bytes plus the file metadata the assistant keeps alongside them
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    data: Arc<Vec<u8>>,
}

impl Document {
    /// Wrap PDF bytes, rejecting anything without a PDF header
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        validate_pdf_header(&data)?;

        Ok(Self {
            name: name.into(),
            mime_type: PDF_MIME_TYPE.to_string(),
            last_modified: None,
            data: Arc::new(data),
        })
    }

    /// Wrap an uploaded or dropped file, checking its declared type first
    pub fn from_upload(
        name: impl Into<String>,
        mime_type: &str,
        data: Vec<u8>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if mime_type != PDF_MIME_TYPE {
            return Err(Error::UnsupportedFileType {
                mime_type: mime_type.to_string(),
            });
        }

        let mut document = Self::from_bytes(name, data)?;
        document.last_modified = last_modified;
        Ok(document)
    }

    /// Read a PDF from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let mut document = Self::from_bytes(name, data)?;
        document.last_modified = last_modified;
        Ok(document)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the bytes, for handing to blocking tasks
    pub fn shared_data(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub(crate) fn validate_pdf_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}
