// lib/src/config/config_structs.rs
use std::path::PathBuf;

use serde::Deserialize;

use crate::chatbot::MatchMode;
use crate::config::config_defaults::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { data_directory: default_data_directory() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityConfig {
    /// HS256 signing secret. Left unset, a random per-process secret is used.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
    /// YAML file with the role seed; the built-in roles are used when unset.
    #[serde(default)]
    pub roles_file: Option<PathBuf>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            roles_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Upper bound on accepted request bodies for the chat endpoint.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            match_mode: MatchMode::default(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        SchedulingConfig {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
}
