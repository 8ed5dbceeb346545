//! Backend connection settings loaded from the environment.

use reqwest::Url;
use std::time::Duration;

use crate::{PodupuError, Result};

/// Environment variable holding the hosted backend's base URL.
pub const URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the backend's public API key.
pub const API_KEY_VAR: &str = "SUPABASE_ANON_KEY";
/// Optional request timeout override, in whole seconds.
pub const TIMEOUT_VAR: &str = "PODUPU_HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the backend lives and how to authenticate against it.
///
/// | Env Var                    | Default    |
/// |----------------------------|------------|
/// | `SUPABASE_URL`             | (required) |
/// | `SUPABASE_ANON_KEY`        | (required) |
/// | `PODUPU_HTTP_TIMEOUT_SECS` | `30`       |
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub api_key: String,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Loads `.env` (without overriding variables already set) and reads the
    /// settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PodupuError::Configuration`] if the URL or key is missing,
    /// empty, or malformed.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {e}");
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PodupuError::Configuration(format!("{name} is not set")))
        };

        let raw_url = required(URL_VAR)?;
        let api_key = required(API_KEY_VAR)?;

        let url = Url::parse(&raw_url)
            .map_err(|e| PodupuError::Configuration(format!("{URL_VAR} is not a valid URL: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(PodupuError::Configuration(format!(
                "{URL_VAR} must be an http(s) base URL"
            )));
        }

        let timeout_secs = match lookup(TIMEOUT_VAR) {
            Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<u64>().map_err(|_| {
                PodupuError::Configuration(format!("{TIMEOUT_VAR} must be a whole number of seconds"))
            })?,
            _ => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(PodupuError::Configuration(format!(
                "{TIMEOUT_VAR} must be at least 1 second"
            )));
        }

        Ok(Self {
            url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
