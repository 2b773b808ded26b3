//! Global downloader configuration and the option keys a db may override.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::db::DbOptions;

pub const K_BASE_PATH: &str = "base_path";
pub const K_BASE_SYSTEM_PATH: &str = "base_system_path";
pub const K_STORAGE_PRIORITY: &str = "storage_priority";
pub const K_ALLOW_REBOOT: &str = "allow_reboot";
pub const K_VERBOSE: &str = "verbose";
pub const K_UPDATE_LINUX: &str = "update_linux";
pub const K_DOWNLOADER_SIZE_MB_LIMIT: &str = "downloader_size_mb_limit";
pub const K_DOWNLOADER_PROCESS_LIMIT: &str = "downloader_process_limit";
pub const K_DOWNLOADER_TIMEOUT: &str = "downloader_timeout";
pub const K_DOWNLOADER_RETRIES: &str = "downloader_retries";
pub const K_FILTER: &str = "filter";

/// Keys that only the global configuration may set. A db's `default_options` must not
/// shadow them.
pub const RESERVED_GLOBAL_OPTIONS: [&str; 5] = [
    K_BASE_PATH,
    K_BASE_SYSTEM_PATH,
    K_STORAGE_PRIORITY,
    K_ALLOW_REBOOT,
    K_VERBOSE,
];

/// Configuration of a synchronization run.
///
/// Missing keys take their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_path: PathBuf,
    pub base_system_path: PathBuf,
    pub storage_priority: String,
    pub allow_reboot: bool,
    pub verbose: bool,
    pub update_linux: bool,
    pub downloader_size_mb_limit: u64,
    pub downloader_process_limit: u64,
    pub downloader_timeout: u64,
    pub downloader_retries: u64,
    pub filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/media/fat"),
            base_system_path: PathBuf::from("/media/fat"),
            storage_priority: String::from("prefer_sd"),
            allow_reboot: true,
            verbose: false,
            update_linux: true,
            downloader_size_mb_limit: 100,
            downloader_process_limit: 300,
            downloader_timeout: 300,
            downloader_retries: 3,
            filter: None,
        }
    }
}

pub fn default_config() -> Config {
    Config::default()
}

impl Config {
    /// Loads a configuration from JSON, filling missing keys with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns a copy of this configuration with the options of a db applied on top.
    pub fn with_db_options(&self, options: &DbOptions) -> Config {
        let mut config = self.clone();
        if let Some(base_path) = &options.base_path {
            config.base_path = base_path.clone();
        }
        if let Some(update_linux) = options.update_linux {
            config.update_linux = update_linux;
        }
        if let Some(limit) = options.downloader_size_mb_limit {
            config.downloader_size_mb_limit = limit;
        }
        if let Some(limit) = options.downloader_process_limit {
            config.downloader_process_limit = limit;
        }
        if let Some(timeout) = options.downloader_timeout {
            config.downloader_timeout = timeout;
        }
        if let Some(retries) = options.downloader_retries {
            config.downloader_retries = retries;
        }
        if let Some(filter) = &options.filter {
            config.filter = Some(filter.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbOptionsKind;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.base_path, PathBuf::from("/media/fat"));
        assert_eq!(config.downloader_retries, 3);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_from_json_str_fills_defaults() -> Result<()> {
        let config = Config::from_json_str(r#"{"base_path": "/media/usb0", "verbose": true}"#)?;

        assert_eq!(config.base_path, PathBuf::from("/media/usb0"));
        assert!(config.verbose);
        assert_eq!(config.downloader_timeout, 300);
        Ok(())
    }

    #[test]
    fn test_from_json_str_wrong_type() {
        assert!(Config::from_json_str(r#"{"downloader_retries": "three"}"#).is_err());
    }

    #[test]
    fn test_with_db_options() -> Result<()> {
        let props = json!({"downloader_timeout": 60, "filter": "arcade"});
        let options = DbOptions::from_props(
            props.as_object().unwrap(),
            DbOptionsKind::DefaultOptions,
        )?;

        let config = default_config().with_db_options(&options);

        assert_eq!(config.downloader_timeout, 60);
        assert_eq!(config.filter.as_deref(), Some("arcade"));
        assert_eq!(config.base_path, PathBuf::from("/media/fat"));
        Ok(())
    }

    #[test]
    fn test_with_ini_section_base_path() -> Result<()> {
        let props = json!({"base_path": "/media/usb0"});
        let options =
            DbOptions::from_props(props.as_object().unwrap(), DbOptionsKind::IniSection)?;

        let config = default_config().with_db_options(&options);

        assert_eq!(config.base_path, PathBuf::from("/media/usb0"));
        Ok(())
    }
}
