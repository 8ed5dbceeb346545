//! Email/password authentication against the backend's auth service.
//!
//! Authentication is independent of the riddle queries: a [`Session`] only
//! changes which bearer token [`Client::with_session`] attaches to table
//! requests, and every failure here is reported as [`PodupuError::Auth`].

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::client::{describe_failure, Client};
use crate::{PodupuError, Result};

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds) after which `access_token` is rejected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Whether the access token has expired at `now` (Unix seconds).
    /// Sessions without an expiry are treated as live.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Outcome of a sign-up. `session` is `None` while the address awaits confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

/// The auth service as seen through a [`Client`]; obtain one with [`Client::auth`].
pub struct Auth<'a> {
    client: &'a Client,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`PodupuError::Validation`] for a blank email or empty password,
    /// and [`PodupuError::Auth`] if the credentials are rejected or the
    /// service cannot be reached.
    pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let body = credentials(email, password)?;
        let url = self.client.endpoint("auth/v1/token")?;
        let request = self
            .client
            .request_as(Method::POST, url, self.api_bearer())
            .query(&[("grant_type", "password")])
            .json(&body);
        let payload = send(request)?;
        let session = parse_session(&payload)?;
        log::info!("Signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        Ok(session)
    }

    /// # Errors
    ///
    /// Same as [`Auth::sign_in_with_password`].
    pub fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let body = credentials(email, password)?;
        let url = self.client.endpoint("auth/v1/signup")?;
        let request = self
            .client
            .request_as(Method::POST, url, self.api_bearer())
            .json(&body);
        let payload = send(request)?;
        let outcome = parse_sign_up(&payload)?;
        if outcome.session.is_none() {
            log::info!("Sign-up pending email confirmation for {}", outcome.user.id);
        }
        Ok(outcome)
    }

    /// Revokes the session's tokens on the server.
    ///
    /// # Errors
    ///
    /// Returns [`PodupuError::Auth`] if the service rejects the request.
    pub fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.client.endpoint("auth/v1/logout")?;
        let request = self
            .client
            .request_as(Method::POST, url, &session.access_token);
        send(request)?;
        log::info!("Signed out");
        Ok(())
    }

    /// Looks up the user the session belongs to, confirming it is still valid.
    ///
    /// # Errors
    ///
    /// Returns [`PodupuError::Auth`] if the token is expired or revoked.
    pub fn current_user(&self, session: &Session) -> Result<User> {
        let url = self.client.endpoint("auth/v1/user")?;
        let request = self
            .client
            .request_as(Method::GET, url, &session.access_token);
        let payload = send(request)?;
        serde_json::from_value(payload)
            .map_err(|e| PodupuError::Auth(format!("Unexpected user payload: {e}")))
    }

    fn api_bearer(&self) -> &str {
        self.client.api_key()
    }
}

fn credentials(email: &str, password: &str) -> Result<Value> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(PodupuError::Validation(
            "Email and password are required.".to_string(),
        ));
    }
    Ok(json!({ "email": email, "password": password }))
}

/// Sends an auth request and returns its JSON body (`null` when empty).
fn send(request: reqwest::blocking::RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .map_err(|e| PodupuError::Auth(format!("Auth service unreachable: {e}")))?;
    let status = response.status();
    let body = response
        .bytes()
        .map_err(|e| PodupuError::Auth(format!("Could not read auth response: {e}")))?;
    if !status.is_success() {
        return Err(PodupuError::Auth(describe_failure(status, &body)));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(|e| PodupuError::Auth(format!("Auth response is not JSON: {e}")))
}

pub(crate) fn parse_session(payload: &Value) -> Result<Session> {
    Session::deserialize(payload).map_err(|e| PodupuError::Auth(format!("Unexpected session payload: {e}")))
}

/// A sign-up answers with a session when confirmation is off, otherwise with
/// the bare user (either at the top level or under `user`).
pub(crate) fn parse_sign_up(payload: &Value) -> Result<SignUp> {
    if payload.get("access_token").is_some() {
        let session = parse_session(payload)?;
        return Ok(SignUp {
            user: session.user.clone(),
            session: Some(session),
        });
    }
    let user_value = match payload.get("user") {
        Some(user) if user.is_object() => user,
        _ => payload,
    };
    let user = User::deserialize(user_value)
        .map_err(|e| PodupuError::Auth(format!("Unexpected sign-up payload: {e}")))?;
    Ok(SignUp {
        user,
        session: None,
    })
}
