// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_structs;

use std::fs;
use std::path::Path;

use security::RolesConfig;
use tracing::{debug, info};

pub use config_defaults::*;
pub use config_structs::{AppConfig, ChatConfig, SchedulingConfig, SecurityConfig, ServerConfig, StorageConfig};

use crate::errors::{ClinicError, Result};

impl AppConfig {
    /// Loads configuration from `path`, or from `bariatric.yaml` in the
    /// working directory when present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_yaml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No configuration file found, using defaults");
                AppConfig::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClinicError::ConfigurationError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `BARIATRIC_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_SECRET_KEY).filter(|s| !s.is_empty()) {
            self.security.jwt_secret = Some(secret);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_directory = dir.into();
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|_| ClinicError::ConfigurationError(format!("{} is not a valid port: {}", ENV_PORT, port)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduling;
        if s.start_hour >= s.end_hour || s.end_hour > 23 {
            return Err(ClinicError::ConfigurationError(format!(
                "working hours {}..{} are invalid",
                s.start_hour, s.end_hour
            )));
        }
        if s.slot_minutes == 0 || s.slot_minutes > 240 {
            return Err(ClinicError::ConfigurationError(format!(
                "slot length of {} minutes is invalid",
                s.slot_minutes
            )));
        }
        let ttl = self.security.token_ttl_hours;
        if ttl == 0 || ttl > MAX_TOKEN_TTL_HOURS {
            return Err(ClinicError::ConfigurationError(format!(
                "token lifetime of {} hours is outside 1..={}",
                ttl, MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.items_per_page == 0 {
            return Err(ClinicError::ConfigurationError("items_per_page must be positive".into()));
        }
        Ok(())
    }

    /// The role seed named by `security.roles_file`, or the built-in roles.
    pub fn roles(&self) -> Result<RolesConfig> {
        match &self.security.roles_file {
            Some(path) => Ok(RolesConfig::from_yaml_file(&path.to_string_lossy())?),
            None => Ok(RolesConfig::default()),
        }
    }
}
