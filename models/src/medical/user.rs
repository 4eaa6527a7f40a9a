// models/src/medical/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelResult, ValidationError};

// --- DTO for New User Registration ---
// Holds the plaintext password only until it has been hashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> ModelResult<()> {
        let username_len = self.username.chars().count();
        if !(4..=64).contains(&username_len) {
            return Err(ValidationError::InvalidField { field: "username", reason: "must be 4-64 characters" });
        }
        if self.email.len() > 120 || !self.email.contains('@') {
            return Err(ValidationError::InvalidField { field: "email", reason: "must be a valid address" });
        }
        if self.password.chars().count() < 6 {
            return Err(ValidationError::InvalidField { field: "password", reason: "must be at least 6 characters long" });
        }
        if self.first_name.trim().is_empty() || self.first_name.len() > 64 {
            return Err(ValidationError::EmptyField("first_name"));
        }
        if self.last_name.trim().is_empty() || self.last_name.len() > 64 {
            return Err(ValidationError::EmptyField("last_name"));
        }
        Ok(())
    }
}

// --- Stored User Struct ---
// Contains the password hash, never the plaintext password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    /// Names of assigned roles; the role records live in their own tree.
    pub roles: Vec<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a new `User` from a registration DTO and an already computed hash.
    pub fn from_new_user(new_user: NewUser, password_hash: String) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone: new_user.phone,
            password_hash,
            roles: new_user.roles,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Public projection of a user, safe to put on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            roles: user.roles.clone(),
            is_active: user.is_active,
            email_verified: user.email_verified,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String, // Plaintext password for login attempt
}
