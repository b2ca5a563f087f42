//! InsightPDF Library
//!
//! Headless core of a PDF assistant: ask a question about a document and get
//! an answer that points at the page and region where it was found.
//!
//! - `viewer`: continuous-scroll viewport, current-page tracking, render
//!   windowing and the answer highlight overlay
//! - `engine`: PDFium page rendering with an LRU cache
//! - `query`: the document query service and its Gemini client
//! - `session`: chat transcript, status and the controller driving it
//! - `store`: settings, session and document persistence

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod query;
pub mod session;
pub mod store;
pub mod versioned;
pub mod viewer;

pub use config::{AssistantConfig, QueryConfig, RenderConfig, ViewerConfig};
pub use document::Document;
pub use engine::{PageRenderer, PdfiumEngine, RenderEngine};
pub use error::{Error, Result};
pub use query::{DocumentQueryService, GeminiClient, Location, LocatorResult};
pub use session::{AppStatus, ChatController, ChatMessage, Role};
pub use store::{FileStore, MemoryStore, PersistenceStore, Settings};
pub use versioned::Versioned;
pub use viewer::{ScrollHost, ViewerOrchestrator};
