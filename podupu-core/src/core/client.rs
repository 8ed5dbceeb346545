//! The hosted-backend handle shared by the REST and auth surfaces.

use reqwest::blocking::RequestBuilder;
use reqwest::{Method, Url};
use serde_json::Value;

use crate::core::auth::{Auth, Session};
use crate::{BackendConfig, PodupuError, Result};

/// A configured connection to the hosted backend.
///
/// Build one at start-up and pass it to the query functions; cloning is cheap
/// because the underlying HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl Client {
    /// # Errors
    ///
    /// Returns [`PodupuError::Configuration`] if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PodupuError::Configuration(format!("Could not build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            access_token: None,
        })
    }

    /// Returns a handle whose table requests run as the signed-in user.
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    /// The authentication service of this backend.
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Resolves `path` below the configured base URL, keeping any base path prefix.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| PodupuError::Configuration(format!("Invalid endpoint {joined}: {e}")))
    }

    /// A request carrying the API key and the current bearer token.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.request_as(method, url, bearer)
    }

    /// A request carrying the API key and an explicit bearer token.
    pub(crate) fn request_as(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }
}

/// Pulls the human-readable message out of a backend error body.
///
/// The REST service reports `message`; the auth service uses
/// `error_description`, `msg` or `error` depending on the endpoint.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Formats a non-success response for an error variant.
pub(crate) fn describe_failure(status: reqwest::StatusCode, body: &[u8]) -> String {
    match error_message(body) {
        Some(message) => format!("HTTP {}: {message}", status.as_u16()),
        None => {
            let text = String::from_utf8_lossy(body);
            let text: String = text.chars().take(200).collect();
            if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), text.trim())
            }
        }
    }
}
