// models/src/medical/chat_history.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{ChatResponse, Intent};

/// A persisted exchange between an authenticated user and the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: u64,
    pub user_id: Uuid,
    pub message: String,
    pub response: String,
    pub intent: Intent,
    pub confidence_score: f64,
    /// Whether the user found the answer helpful; unset until rated.
    pub feedback: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl ChatHistory {
    pub fn record(id: u64, user_id: Uuid, message: &str, response: &ChatResponse) -> Self {
        ChatHistory {
            id,
            user_id,
            message: message.to_string(),
            response: response.message.clone(),
            intent: response.intent,
            confidence_score: response.confidence,
            feedback: None,
            created_at: Utc::now(),
        }
    }
}
