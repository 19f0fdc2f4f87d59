//! Runtime configuration for the sync core, sourced from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const API_URL_ENV: &str = "SENIORLINK_API_URL";
pub const API_TOKEN_ENV: &str = "SENIORLINK_API_TOKEN";
pub const DATA_DIR_ENV: &str = "SENIORLINK_DATA_DIR";
pub const REMOTE_TIMEOUT_ENV: &str = "SENIORLINK_REMOTE_TIMEOUT_SECS";
pub const HOST_ENV: &str = "SENIORLINK_HOST";

/// Deadline applied to every remote call when none is configured.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

const DEFAULT_DATA_DIR: &str = ".seniorlink";

/// Kind of host the core runs inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    /// Installed app with a durable filesystem; enables the native mirror.
    Native,
    /// Browser-like host with only the Local Store.
    Web,
}

impl FromStr for HostPlatform {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "android" | "ios" => Ok(Self::Native),
            "web" | "browser" => Ok(Self::Web),
            other => Err(Error::Config(format!("Unknown host platform '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the remote API. `None` keeps the core permanently offline.
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub data_dir: PathBuf,
    pub remote_timeout: Duration,
    pub host: HostPlatform,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            host: HostPlatform::Web,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SyncConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url =
            non_empty(lookup(API_URL_ENV)).map(|v| v.trim_end_matches('/').to_string());
        let api_token = non_empty(lookup(API_TOKEN_ENV));
        let data_dir = non_empty(lookup(DATA_DIR_ENV))
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let remote_timeout = match non_empty(lookup(REMOTE_TIMEOUT_ENV)) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!("{} must be a whole number of seconds", REMOTE_TIMEOUT_ENV))
                })?;
                if secs == 0 {
                    return Err(Error::Config(format!(
                        "{} must be greater than zero",
                        REMOTE_TIMEOUT_ENV
                    )));
                }
                Duration::from_secs(secs)
            }
            None => defaults.remote_timeout,
        };

        let host = match non_empty(lookup(HOST_ENV)) {
            Some(raw) => raw.parse()?,
            None => defaults.host,
        };

        Ok(Self {
            api_base_url,
            api_token,
            data_dir,
            remote_timeout,
            host,
        })
    }

    pub fn is_remote_configured(&self) -> bool {
        self.api_base_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::from_lookup(|_| None).expect("config");
        assert_eq!(config, SyncConfig::default());
        assert!(!config.is_remote_configured());
    }

    #[test]
    fn reads_and_normalizes_values() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            (API_URL_ENV, " https://api.example.test/ "),
            (API_TOKEN_ENV, "   "),
            (DATA_DIR_ENV, "/var/lib/seniorlink"),
            (REMOTE_TIMEOUT_ENV, "12"),
            (HOST_ENV, "Android"),
        ]))
        .expect("config");

        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://api.example.test")
        );
        assert_eq!(config.api_token, None);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/seniorlink"));
        assert_eq!(config.remote_timeout, Duration::from_secs(12));
        assert_eq!(config.host, HostPlatform::Native);
    }

    #[test]
    fn rejects_zero_timeout_and_unknown_host() {
        assert!(SyncConfig::from_lookup(lookup_from(&[(REMOTE_TIMEOUT_ENV, "0")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(REMOTE_TIMEOUT_ENV, "soon")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(HOST_ENV, "toaster")])).is_err());
    }
}
