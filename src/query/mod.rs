//! Document Query Service boundary
//!
//! The service answers a natural-language question about a document and may
//! point at where the answer lives. A failed call is an `Err`; an answer
//! without a location is a normal `Ok`.

pub mod gemini;

pub use gemini::{Endpoint, GeminiClient};

use crate::document::Document;
use crate::error::Result;
use crate::store::CustomEndpoint;
use crate::viewer::geometry::Box2d;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Where in the document an answer was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// 1-based page number
    pub page_number: u32,
    /// `[ymin, xmin, ymax, xmax]` on a 0-1000 grid
    pub box2d: Box2d,
    /// Text or short description of the located element
    pub snippet: String,
}

/// Answer plus optional pointer into the document.
///
/// Page, box and snippet travel together as one [`Location`], so a result
/// either locates something or it doesn't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorResult {
    pub answer: String,
    #[serde(flatten)]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl LocatorResult {
    pub fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            location: None,
            reasoning: None,
        }
    }

    pub fn located(answer: impl Into<String>, location: Location) -> Self {
        Self {
            answer: answer.into(),
            location: Some(location),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn page_number(&self) -> Option<u32> {
        self.location.as_ref().map(|l| l.page_number)
    }

    pub fn box2d(&self) -> Option<Box2d> {
        self.location.as_ref().map(|l| l.box2d)
    }
}

/// Document content as sent to the service
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPart {
    /// Raw bytes, base64 encoded on the wire
    Inline { mime_type: String, data: Vec<u8> },
    /// Handle from a previous upload
    Remote { mime_type: String, uri: String },
}

impl DocumentPart {
    pub fn inline(document: &Document) -> Self {
        DocumentPart::Inline {
            mime_type: document.mime_type.clone(),
            data: document.data().to_vec(),
        }
    }

    pub fn remote(document: &Document, uri: impl Into<String>) -> Self {
        DocumentPart::Remote {
            mime_type: document.mime_type.clone(),
            uri: uri.into(),
        }
    }
}

/// Uploaded file handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-call settings: which model, and which endpoint overrides apply
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions<'a> {
    pub model: &'a str,
    pub endpoint: &'a CustomEndpoint,
}

pub trait DocumentQueryService {
    /// Upload the document and return a handle reusable across questions
    fn upload(
        &self,
        document: &Document,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<RemoteFile>> + Send;

    /// Ask a question about the document
    fn ask(
        &self,
        part: &DocumentPart,
        query: &str,
        options: QueryOptions<'_>,
    ) -> impl Future<Output = Result<LocatorResult>> + Send;
}
