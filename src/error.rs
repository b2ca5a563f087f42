//! Error types for InsightPDF

use thiserror::Error;

/// Result type alias for InsightPDF
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for InsightPDF
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Only PDF documents are accepted
    #[error("Unsupported file type: {mime_type}")]
    UnsupportedFileType { mime_type: String },

    /// PDF is password protected
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// No API key configured, neither custom nor from the environment
    #[error("API key is missing")]
    MissingApiKey,

    /// Custom endpoint could not be turned into a usable base URL
    #[error("Invalid endpoint: {reason}")]
    InvalidEndpoint { reason: String },

    /// Query service answered with a non-success status
    #[error("Query service returned {status}: {message}")]
    QueryStatus { status: u16, message: String },

    /// Query service answered without any text content
    #[error("Query service returned no content")]
    EmptyResponse,

    /// Query service content did not match the locator schema
    #[error("Malformed query response: {reason}")]
    MalformedResponse { reason: String },

    /// Remote file upload did not yield a file handle
    #[error("Upload failed: {reason}")]
    Upload { reason: String },

    /// Document exceeds the inline request limit
    #[error("Document too large: {size} bytes (max: {max_size} bytes)")]
    DocumentTooLarge { size: u64, max_size: u64 },

    /// Blocking task panicked or was cancelled
    #[error("Background task failed: {reason}")]
    Task { reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image encoding error
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Return a sanitized error message safe to show to the user.
    /// Internal details (paths, library errors, response bodies) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::UnsupportedFileType { .. } => "Only PDF files are supported".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::MissingApiKey => {
                "API key is missing. Enter a key in settings or set GEMINI_API_KEY.".to_string()
            }
            Error::InvalidEndpoint { .. } => "Custom endpoint URL is not valid".to_string(),
            Error::QueryStatus { status, message } => {
                format!("Request failed ({}): {}", status, message)
            }
            Error::EmptyResponse => "No response from the model".to_string(),
            Error::MalformedResponse { .. } => "The model returned an unreadable answer".to_string(),
            Error::Upload { .. } => "File upload failed".to_string(),
            Error::DocumentTooLarge { max_size, .. } => {
                format!("Document exceeds the inline limit of {} bytes", max_size)
            }
            Error::Task { .. } => "Background task failed".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::Image(_) => "Image encoding error".to_string(),
        }
    }
}
