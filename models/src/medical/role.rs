// models/src/medical/role.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named bundle of permission strings. Role names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: impl Into<String>, permissions: Vec<String>) -> Self {
        let now = Utc::now();
        Role {
            name: name.into(),
            description: description.into(),
            permissions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
