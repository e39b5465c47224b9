use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::resilient::RetryConfig;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub report_dir: PathBuf,
    pub storage_timeout_ms: u64,
    pub storage_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/lotto.db"),
            report_dir: PathBuf::from("reports"),
            storage_timeout_ms: 5000,
            storage_retries: 3,
            retry_base_delay_ms: 100,
        }
    }
}

impl Config {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.storage_retries,
            base_delay_ms: self.retry_base_delay_ms,
            timeout_ms: self.storage_timeout_ms,
            ..RetryConfig::default()
        }
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Ok(Config {
            database_path: lookup("LOTTO_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            report_dir: lookup("LOTTO_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            storage_timeout_ms: parse_var(&lookup, "LOTTO_STORAGE_TIMEOUT_MS")?
                .unwrap_or(defaults.storage_timeout_ms),
            storage_retries: parse_var(&lookup, "LOTTO_STORAGE_RETRIES")?
                .unwrap_or(defaults.storage_retries),
            retry_base_delay_ms: parse_var(&lookup, "LOTTO_RETRY_BASE_DELAY_MS")?
                .unwrap_or(defaults.retry_base_delay_ms),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

pub fn load() -> Result<Config> {
    Config::from_lookup(|key| env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.retry_config().max_retries, 3);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("LOTTO_DB_PATH", "/tmp/x.db"),
            ("LOTTO_STORAGE_TIMEOUT_MS", "250"),
            ("LOTTO_STORAGE_RETRIES", "0"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.retry_config().timeout_ms, 250);
        assert_eq!(config.storage_retries, 0);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("LOTTO_STORAGE_RETRIES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("LOTTO_STORAGE_RETRIES"));
    }
}
