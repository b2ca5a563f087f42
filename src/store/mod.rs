//! Persistence Store
//!
//! Three independent records survive a restart: user settings, the chat
//! session (transcript, active result, remote upload handle) and the loaded
//! document's bytes. Clearing the chat never touches settings or the
//! document; clearing the document also drops its upload handle.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::DEFAULT_MODEL;
use crate::document::Document;
use crate::error::Result;
use crate::query::LocatorResult;
use crate::session::ChatMessage;
use serde::{Deserialize, Serialize};

/// Alternate endpoint for the query service, e.g. a proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomEndpoint {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Model name passed to the query service
    pub model: String,
    /// Upload the document once and reference it, instead of sending it inline per question
    pub use_remote_upload: bool,
    pub custom_endpoint: CustomEndpoint,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            use_remote_upload: true,
            custom_endpoint: CustomEndpoint::default(),
        }
    }
}

/// Persisted chat state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub active_result: Option<LocatorResult>,
    /// Handle of the current document on the query service
    pub uploaded_uri: Option<String>,
}

/// Storage backend for settings, session and document.
///
/// Loads return `None` (or an empty session) when nothing was saved yet.
pub trait PersistenceStore: Send + Sync {
    fn load_settings(&self) -> Result<Option<Settings>>;

    fn save_settings(&self, settings: &Settings) -> Result<()>;

    fn load_session(&self) -> Result<SessionSnapshot>;

    fn save_session(&self, session: &SessionSnapshot) -> Result<()>;

    fn load_document(&self) -> Result<Option<Document>>;

    fn save_document(&self, document: &Document) -> Result<()>;

    /// Drop the transcript and active result; the upload handle stays
    fn clear_session(&self) -> Result<()> {
        let mut session = self.load_session()?;
        session.messages.clear();
        session.active_result = None;
        self.save_session(&session)
    }

    /// Drop the document and the upload handle that pointed at it
    fn clear_document(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gemini-3-flash-preview");
        assert!(settings.use_remote_upload);
        assert!(!settings.custom_endpoint.enabled);
    }

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"model": "gemini-2.5-pro"}"#).unwrap();
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert!(settings.use_remote_upload);
        assert_eq!(settings.custom_endpoint, CustomEndpoint::default());
    }

    #[test]
    fn test_session_snapshot_wire_names() {
        let snapshot = SessionSnapshot {
            uploaded_uri: Some("https://files/abc".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["uploadedUri"], "https://files/abc");
        assert_eq!(json["activeResult"], serde_json::Value::Null);
    }
}
