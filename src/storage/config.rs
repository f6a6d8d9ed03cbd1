//! JSON Configuration Management
//!
//! Handles reading and writing the service configuration file.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_app_dir};

/// Outbound mail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// HTTP mail gateway endpoint.
    pub gateway_url: String,
    /// Bearer token for the gateway, if it requires one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_token: Option<String>,
    /// Sender address stamped on every notification.
    pub from_address: String,
    /// Sender display name.
    pub from_name: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8025/send".to_string(),
            api_token: None,
            from_address: "examcell@mahindrauniversity.edu.in".to_string(),
            from_name: "Examination Cell".to_string(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub mailer: MailerConfig,
}

impl AppConfig {
    /// Validate the configuration, returning a message on the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if !self.mailer.gateway_url.starts_with("http://")
            && !self.mailer.gateway_url.starts_with("https://")
        {
            return Err(format!(
                "mailer.gateway_url must be an http(s) URL, got '{}'",
                self.mailer.gateway_url
            ));
        }
        if !self.mailer.from_address.contains('@') {
            return Err(format!(
                "mailer.from_address must be an email address, got '{}'",
                self.mailer.from_address
            ));
        }
        if self.mailer.from_name.trim().is_empty() {
            return Err("mailer.from_name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Configuration service for managing settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Create a new config service, loading existing config or creating defaults
    pub fn new() -> AppResult<Self> {
        ensure_app_dir()?;
        Self::with_path(config_path()?)
    }

    /// Create a config service over an explicit file path.
    pub fn with_path(config_path: PathBuf) -> AppResult<Self> {
        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &PathBuf) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &PathBuf, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }
}
