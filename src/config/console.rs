use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_USAGE_HISTORY_DAYS: u32 = 30;

const ENV_API_BASE_URL: &str = "SHORELINE_API_BASE_URL";
const ENV_USAGE_HISTORY_DAYS: &str = "SHORELINE_USAGE_HISTORY_DAYS";
const ENV_DATA_DIR: &str = "SHORELINE_DATA_DIR";
const ENV_REQUEST_TIMEOUT_SECS: &str = "SHORELINE_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL every relative API path is joined onto. May be empty, in which
    /// case callers must pass absolute URLs.
    pub api_base_url: String,
    pub usage_history_days: u32,
    /// Directory holding the local membership/profile database.
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ConsoleConfig {
    /// Builds a config from `SHORELINE_*` environment variables. Blank values
    /// count as unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| clean(lookup(key).as_deref());

        if let Some(base) = get(ENV_API_BASE_URL) {
            config.api_base_url = base;
        }
        if let Some(days) = get(ENV_USAGE_HISTORY_DAYS) {
            config.usage_history_days = days.parse().map_err(|_| {
                Error::Config(format!("{ENV_USAGE_HISTORY_DAYS} must be a whole number, got '{days}'"))
            })?;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be a whole number, got '{secs}'"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("shoreline.db")
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            usage_history_days: DEFAULT_USAGE_HISTORY_DAYS,
            data_dir: PathBuf::from("./data"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ConsoleConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, "");
        assert_eq!(config.usage_history_days, 30);
        assert_eq!(config.db_path(), PathBuf::from("./data/shoreline.db"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = ConsoleConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE_URL, "   "),
            (ENV_USAGE_HISTORY_DAYS, ""),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "");
        assert_eq!(config.usage_history_days, DEFAULT_USAGE_HISTORY_DAYS);
    }

    #[test]
    fn test_values_are_trimmed_and_parsed() {
        let config = ConsoleConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE_URL, " https://api.example.com/ "),
            (ENV_USAGE_HISTORY_DAYS, "14"),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/");
        assert_eq!(config.usage_history_days, 14);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_days_is_config_error() {
        let result = ConsoleConfig::from_lookup(lookup_from(&[(ENV_USAGE_HISTORY_DAYS, "a week")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
