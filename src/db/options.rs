use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{
    K_BASE_PATH, K_DOWNLOADER_PROCESS_LIMIT, K_DOWNLOADER_RETRIES, K_DOWNLOADER_SIZE_MB_LIMIT,
    K_DOWNLOADER_TIMEOUT, K_FILTER, K_UPDATE_LINUX,
};
use crate::error::DbOptionsValidationError;

/// Where a set of db options comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DbOptionsKind {
    /// `default_options` shipped inside a db. Untrusted.
    DefaultOptions,
    /// Options the user wrote in the db's INI section. May also relocate the db (`base_path`).
    IniSection,
}

/// Options that override the global [`Config`](crate::Config) for one db.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DbOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_linux: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader_size_mb_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader_process_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader_retries: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl DbOptions {
    /// Validates raw options.
    ///
    /// Every offending key is reported at once: keys reserved for the global configuration,
    /// unknown keys and keys whose value has the wrong type.
    pub fn from_props(
        props: &Map<String, Value>,
        kind: DbOptionsKind,
    ) -> Result<DbOptions, DbOptionsValidationError> {
        let mut options = DbOptions::default();
        let mut wrong = Vec::new();

        for (key, value) in props {
            let accepted = match key.as_str() {
                K_BASE_PATH if kind == DbOptionsKind::IniSection => value
                    .as_str()
                    .map(|path| options.base_path = Some(PathBuf::from(path))),
                K_UPDATE_LINUX => value.as_bool().map(|b| options.update_linux = Some(b)),
                K_DOWNLOADER_SIZE_MB_LIMIT => value
                    .as_u64()
                    .map(|n| options.downloader_size_mb_limit = Some(n)),
                K_DOWNLOADER_PROCESS_LIMIT => value
                    .as_u64()
                    .map(|n| options.downloader_process_limit = Some(n)),
                K_DOWNLOADER_TIMEOUT => value.as_u64().map(|n| options.downloader_timeout = Some(n)),
                K_DOWNLOADER_RETRIES => value.as_u64().map(|n| options.downloader_retries = Some(n)),
                K_FILTER => value
                    .as_str()
                    .map(|filter| options.filter = Some(filter.to_owned())),
                _ => None,
            };
            if accepted.is_none() {
                wrong.push(key.clone());
            }
        }

        if !wrong.is_empty() {
            return Err(DbOptionsValidationError { fields: wrong });
        }
        Ok(options)
    }

    pub fn is_empty(&self) -> bool {
        *self == DbOptions::default()
    }
}
