//! Chat controller
//!
//! Turns user intents (upload a file, ask a question, clear, revisit an
//! answer) into query-service calls and session updates.
//!
//! A question runs in three steps so the service call can live on another
//! task: [`ChatController::begin_search`] records the question and hands out a
//! [`SearchTicket`], [`SearchTicket::execute`] talks to the service, and
//! [`ChatController::finish_search`] applies the outcome. Uploading a new file
//! or clearing the chat starts a new generation; outcomes from an older
//! generation are dropped.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::query::{DocumentPart, DocumentQueryService, LocatorResult, QueryOptions};
use crate::session::{AppStatus, ChatMessage, SessionContext};
use crate::store::{CustomEndpoint, PersistenceStore};
use std::sync::Arc;

/// Everything needed to run one question away from the controller
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    query: String,
    document: Document,
    model: String,
    endpoint: CustomEndpoint,
    use_remote_upload: bool,
    uploaded_uri: Option<String>,
}

/// Result of [`SearchTicket::execute`], to be handed back to the controller
#[derive(Debug)]
pub struct SearchOutcome {
    generation: u64,
    /// Handle from a fallback upload made while answering
    uploaded_uri: Option<String>,
    result: Result<LocatorResult>,
}

impl SearchOutcome {
    pub fn result(&self) -> &Result<LocatorResult> {
        &self.result
    }
}

impl SearchTicket {
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Needs an upload before the question can be asked
    pub fn needs_upload(&self) -> bool {
        self.use_remote_upload && self.uploaded_uri.is_none()
    }

    pub async fn execute<Q: DocumentQueryService>(&self, service: &Q) -> SearchOutcome {
        let options = QueryOptions {
            model: &self.model,
            endpoint: &self.endpoint,
        };

        let mut uploaded_uri = None;
        let part = if self.use_remote_upload {
            let uri = match &self.uploaded_uri {
                Some(uri) => uri.clone(),
                None => {
                    tracing::debug!(document = %self.document.name, "no upload handle, uploading first");
                    match service.upload(&self.document, options).await {
                        Ok(file) => {
                            uploaded_uri = Some(file.uri.clone());
                            file.uri
                        }
                        Err(e) => return self.outcome(None, Err(e)),
                    }
                }
            };
            DocumentPart::remote(&self.document, uri)
        } else {
            DocumentPart::inline(&self.document)
        };

        let result = service.ask(&part, &self.query, options).await;
        self.outcome(uploaded_uri, result)
    }

    fn outcome(&self, uploaded_uri: Option<String>, result: Result<LocatorResult>) -> SearchOutcome {
        SearchOutcome {
            generation: self.generation,
            uploaded_uri,
            result,
        }
    }
}

pub struct ChatController<Q, S>
where
    Q: DocumentQueryService,
    S: PersistenceStore,
{
    service: Arc<Q>,
    context: SessionContext<S>,
    generation: u64,
}

impl<Q, S> ChatController<Q, S>
where
    Q: DocumentQueryService,
    S: PersistenceStore,
{
    pub fn new(service: Q, store: Arc<S>, default_model: &str) -> Self {
        Self {
            service: Arc::new(service),
            context: SessionContext::new(store, default_model),
            generation: 0,
        }
    }

    pub fn hydrate(&mut self) {
        self.context.hydrate();
    }

    pub fn context(&self) -> &SessionContext<S> {
        &self.context
    }

    pub fn service(&self) -> Arc<Q> {
        Arc::clone(&self.service)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the document: the chat is cleared, the file saved and, with
    /// remote upload on, sent to the service once.
    pub async fn handle_file_upload(&mut self, document: Document) {
        self.context.clear_session();
        self.generation += 1;

        tracing::info!(
            name = %document.name,
            size = document.len(),
            generation = self.generation,
            "document selected"
        );

        self.context.set_document(document.clone());
        self.context.set_uploaded_uri(None);

        if !self.context.settings().use_remote_upload {
            return;
        }

        self.context.set_status(AppStatus::ProcessingFile);
        let settings = self.context.settings().clone();
        let options = QueryOptions {
            model: &settings.model,
            endpoint: &settings.custom_endpoint,
        };

        match self.service.upload(&document, options).await {
            Ok(file) => {
                tracing::info!(uri = %file.uri, "document uploaded");
                self.context.set_uploaded_uri(Some(file.uri));
                self.context.set_status(AppStatus::Idle);
            }
            Err(e) => self.fail(e),
        }
    }

    /// Record the question and prepare the service call. `None` when there is
    /// no document or the question is blank.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchTicket> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let Some(document) = self.context.document().cloned() else {
            tracing::debug!("question ignored, no document loaded");
            return None;
        };

        self.context.push_message(ChatMessage::user(query));

        let ticket = SearchTicket {
            generation: self.generation,
            query: query.to_string(),
            document,
            model: self.context.settings().model.clone(),
            endpoint: self.context.settings().custom_endpoint.clone(),
            use_remote_upload: self.context.settings().use_remote_upload,
            uploaded_uri: self.context.uploaded_uri().map(str::to_string),
        };

        self.context.set_status(if ticket.needs_upload() {
            AppStatus::ProcessingFile
        } else {
            AppStatus::Searching
        });
        Some(ticket)
    }

    /// Apply a finished search. Returns `false` if it belonged to an older
    /// generation and was dropped.
    pub fn finish_search(&mut self, outcome: SearchOutcome) -> bool {
        if outcome.generation != self.generation {
            tracing::debug!(
                outcome = outcome.generation,
                current = self.generation,
                "discarding stale search result"
            );
            return false;
        }

        if let Some(uri) = outcome.uploaded_uri {
            self.context.set_uploaded_uri(Some(uri));
        }

        match outcome.result {
            Ok(result) => {
                tracing::info!(
                    page = ?result.page_number(),
                    located = result.location.is_some(),
                    "answer received"
                );
                self.context.push_message(ChatMessage::ai(result.clone()));
                if result.page_number().is_some() {
                    self.context.set_active_result(Some(result));
                }
                self.context.set_status(AppStatus::Success);
            }
            Err(e) => self.fail(e),
        }
        true
    }

    /// Ask a question and wait for the answer in place
    pub async fn handle_search(&mut self, query: &str) {
        let Some(ticket) = self.begin_search(query) else {
            return;
        };
        let service = self.service();
        let outcome = ticket.execute(service.as_ref()).await;
        self.finish_search(outcome);
    }

    pub fn handle_clear_chat(&mut self) {
        self.context.clear_session();
        self.generation += 1;
        tracing::info!(generation = self.generation, "chat cleared");
    }

    /// Forget the document and its upload handle; the chat stays
    pub fn handle_clear_file(&mut self) {
        self.context.clear_document();
        self.context.set_status(AppStatus::Idle);
        self.generation += 1;
    }

    /// Point the viewer at a previous answer again
    pub fn handle_view_location(&mut self, result: &LocatorResult) {
        if result.page_number().is_none() {
            return;
        }
        self.context.set_active_result(Some(result.clone()));
    }

    pub fn set_model(&mut self, model: &str) {
        self.context.set_model(model.trim());
    }

    pub fn toggle_remote_upload(&mut self) {
        let enabled = !self.context.settings().use_remote_upload;
        self.context.set_use_remote_upload(enabled);
    }

    pub fn set_custom_endpoint(&mut self, endpoint: CustomEndpoint) {
        self.context.set_custom_endpoint(endpoint);
    }

    fn fail(&mut self, error: Error) {
        tracing::warn!(error = %error, "request failed");
        self.context.set_error(error.client_message());
    }
}
