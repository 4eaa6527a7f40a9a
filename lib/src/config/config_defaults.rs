// lib/src/config/config_defaults.rs
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "bariatric.yaml";
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/bariatric";

pub const ENV_SECRET_KEY: &str = "BARIATRIC_SECRET_KEY";
pub const ENV_DATA_DIR: &str = "BARIATRIC_DATA_DIR";
pub const ENV_HOST: &str = "BARIATRIC_HOST";
pub const ENV_PORT: &str = "BARIATRIC_PORT";

/// Longest token lifetime accepted from configuration: one year.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

pub fn default_host() -> String { "127.0.0.1".to_string() }
pub fn default_port() -> u16 { 5000 }
pub fn default_data_directory() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIRECTORY) }
pub fn default_token_ttl_hours() -> u64 { 24 }
pub fn default_items_per_page() -> usize { 10 }
pub fn default_max_message_bytes() -> usize { 16 * 1024 }
pub fn default_start_hour() -> u32 { 9 }
pub fn default_end_hour() -> u32 { 17 }
pub fn default_slot_minutes() -> u32 { 30 }
