// models/src/medical/audit_log.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An audit entry before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewAuditLog {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditLog {
    pub fn new(user_id: Option<Uuid>, action: impl Into<String>) -> Self {
        NewAuditLog {
            user_id,
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: u64,
    pub user_id: Option<Uuid>,
    pub action: String,
    /// JSON document kept as text so the record stays binary-encodable.
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn from_new(id: u64, entry: NewAuditLog) -> Self {
        AuditLog {
            id,
            user_id: entry.user_id,
            action: entry.action,
            details: entry.details.map(|d| d.to_string()),
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        }
    }

    pub fn details_json(&self) -> Option<serde_json::Value> {
        self.details
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_survive_text_encoding() {
        let entry = NewAuditLog::new(None, "update_user")
            .with_details(json!({ "target_user_id": 4, "changes": { "is_active": false } }));
        let log = AuditLog::from_new(1, entry);
        assert_eq!(log.details_json().unwrap()["changes"]["is_active"], false);
    }
}
