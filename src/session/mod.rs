//! Chat session: transcript types, injected session context and the controller
//! that drives uploads and questions

pub mod context;
pub mod controller;

pub use context::SessionContext;
pub use controller::{ChatController, SearchOutcome, SearchTicket};

use crate::query::LocatorResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    /// Full answer behind an AI message, so its location can be revisited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_data: Option<LocatorResult>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            location_data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn ai(result: LocatorResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Ai,
            text: result.answer.clone(),
            location_data: Some(result),
            timestamp: Utc::now(),
        }
    }

    pub fn has_location(&self) -> bool {
        self.location_data
            .as_ref()
            .is_some_and(|r| r.location.is_some())
    }
}

/// What the assistant is busy with, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    #[default]
    Idle,
    ProcessingFile,
    Searching,
    Success,
    Error,
}

impl AppStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, AppStatus::ProcessingFile | AppStatus::Searching)
    }
}
