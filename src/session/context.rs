//! Injected settings and session state
//!
//! The context mirrors the persistence store in memory. It is loaded once with
//! [`SessionContext::hydrate`]; every write before that point is skipped, so
//! start-up defaults can never overwrite what was saved last time.

use crate::document::Document;
use crate::query::LocatorResult;
use crate::session::{AppStatus, ChatMessage};
use crate::store::{CustomEndpoint, PersistenceStore, SessionSnapshot, Settings};
use crate::versioned::Versioned;
use std::sync::Arc;

pub struct SessionContext<S: PersistenceStore> {
    store: Arc<S>,
    hydrated: bool,
    settings: Settings,
    messages: Vec<ChatMessage>,
    active_result: Versioned<Option<LocatorResult>>,
    uploaded_uri: Option<String>,
    document: Option<Document>,
    status: AppStatus,
    error_message: Option<String>,
}

impl<S: PersistenceStore> SessionContext<S> {
    pub fn new(store: Arc<S>, default_model: &str) -> Self {
        Self {
            store,
            hydrated: false,
            settings: Settings {
                model: default_model.to_string(),
                ..Settings::default()
            },
            messages: Vec::new(),
            active_result: Versioned::new(None),
            uploaded_uri: None,
            document: None,
            status: AppStatus::Idle,
            error_message: None,
        }
    }

    /// Load settings, session and document from the store. Unreadable
    /// records are logged and left at their defaults. Runs once.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }

        match self.store.load_settings() {
            Ok(Some(settings)) => self.settings = settings,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to load settings"),
        }

        match self.store.load_session() {
            Ok(session) => {
                self.messages = session.messages;
                self.active_result.set(session.active_result);
                self.uploaded_uri = session.uploaded_uri;
            }
            Err(e) => tracing::warn!(error = %e, "failed to load chat session"),
        }

        match self.store.load_document() {
            Ok(document) => self.document = document,
            Err(e) => tracing::warn!(error = %e, "failed to load saved document"),
        }

        if !self.messages.is_empty() {
            self.status = AppStatus::Success;
        }
        self.hydrated = true;

        tracing::info!(
            messages = self.messages.len(),
            has_document = self.document.is_some(),
            model = %self.settings.model,
            "session hydrated"
        );
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn active_result(&self) -> &Versioned<Option<LocatorResult>> {
        &self.active_result
    }

    pub fn uploaded_uri(&self) -> Option<&str> {
        self.uploaded_uri.as_deref()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn set_status(&mut self, status: AppStatus) {
        self.status = status;
        if status != AppStatus::Error {
            self.error_message = None;
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = AppStatus::Error;
        self.error_message = Some(message.into());
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.settings.model = model.into();
        self.persist_settings();
    }

    pub fn set_use_remote_upload(&mut self, enabled: bool) {
        self.settings.use_remote_upload = enabled;
        self.persist_settings();
    }

    pub fn set_custom_endpoint(&mut self, endpoint: CustomEndpoint) {
        self.settings.custom_endpoint = endpoint;
        self.persist_settings();
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.persist_session();
    }

    /// Replace the active result; always a new event, even for an equal value
    pub fn set_active_result(&mut self, result: Option<LocatorResult>) {
        self.active_result.set(result);
        self.persist_session();
    }

    pub fn set_uploaded_uri(&mut self, uri: Option<String>) {
        self.uploaded_uri = uri;
        self.persist_session();
    }

    pub fn set_document(&mut self, document: Document) {
        if self.guard("document") {
            if let Err(e) = self.store.save_document(&document) {
                tracing::warn!(error = %e, "failed to save document");
            }
        }
        self.document = Some(document);
    }

    /// Empty the transcript and active result and go idle. Settings, the
    /// document and its upload handle are kept.
    pub fn clear_session(&mut self) {
        self.messages.clear();
        self.active_result.set(None);
        self.set_status(AppStatus::Idle);

        if self.guard("session") {
            if let Err(e) = self.store.clear_session() {
                tracing::warn!(error = %e, "failed to clear chat session");
            }
        }
    }

    /// Forget the document together with its upload handle
    pub fn clear_document(&mut self) {
        self.document = None;
        self.uploaded_uri = None;

        if self.guard("document") {
            if let Err(e) = self.store.clear_document() {
                tracing::warn!(error = %e, "failed to clear document");
            }
        }
    }

    fn guard(&self, record: &str) -> bool {
        if !self.hydrated {
            tracing::debug!(record, "not hydrated yet, skipping write");
        }
        self.hydrated
    }

    fn persist_settings(&self) {
        if self.guard("settings") {
            if let Err(e) = self.store.save_settings(&self.settings) {
                tracing::warn!(error = %e, "failed to save settings");
            }
        }
    }

    fn persist_session(&self) {
        if !self.guard("session") {
            return;
        }
        let snapshot = SessionSnapshot {
            messages: self.messages.clone(),
            active_result: self.active_result.get().clone(),
            uploaded_uri: self.uploaded_uri.clone(),
        };
        if let Err(e) = self.store.save_session(&snapshot) {
            tracing::warn!(error = %e, "failed to save chat session");
        }
    }
}
