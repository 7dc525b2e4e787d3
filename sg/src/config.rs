//! Skyglow configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main skyglow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level from the config file (CLI flag takes precedence)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Notification configuration
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .skyglow.yml
        let local_config = PathBuf::from(".skyglow.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/skyglow/skyglow.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("skyglow").join("skyglow.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load config from {}: {}",
                            user_config.display(),
                            e
                        );
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let config = Self::load(config_path).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the SQLite store
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("skyglow")
                .join("store"),
        }
    }
}

/// Notification configuration
///
/// SMTP wins when fully configured, then the webhook; with neither, the
/// notifier degrades to a log-only channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// SMTP relay host (empty disables SMTP)
    #[serde(rename = "smtp-host")]
    pub smtp_host: String,

    /// SMTP relay port
    #[serde(rename = "smtp-port")]
    pub smtp_port: u16,

    /// SMTP username
    #[serde(rename = "smtp-username")]
    pub smtp_username: String,

    /// Environment variable holding the SMTP password
    #[serde(rename = "smtp-password-env")]
    pub smtp_password_env: String,

    /// From address for outgoing mail
    pub from: String,

    /// Destination address for alert notifications
    pub to: String,

    /// Webhook URL (empty disables the webhook channel)
    #[serde(rename = "webhook-url")]
    pub webhook_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password_env: "SKYGLOW_SMTP_PASSWORD".to_string(),
            from: "skyglow@localhost".to_string(),
            to: "dev@local.invalid".to_string(),
            webhook_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.notify.smtp_host.is_empty());
        assert_eq!(config.notify.smtp_port, 587);
        assert!(config.storage.store_dir.ends_with("store"));
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
log-level: DEBUG
notify:
  smtp-host: smtp.example.org
  smtp-username: alerts@example.org
  to: lights@example.org
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(config.notify.smtp_host, "smtp.example.org");
        assert_eq!(config.notify.to, "lights@example.org");
        // Unspecified sections fall back to defaults
        assert_eq!(config.notify.smtp_port, 587);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("skyglow.yml");
        std::fs::write(&path, "notify:\n  webhook-url: http://localhost/hook\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.notify.webhook_url, "http://localhost/hook");
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let path = PathBuf::from("/nonexistent/skyglow.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
