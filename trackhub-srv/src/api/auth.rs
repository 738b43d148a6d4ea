//! HTTP Basic authentication
//!
//! A single configured account; the password is verified against an
//! Argon2 PHC-string hash, never stored in the clear. The verified
//! username is stashed in request extensions for handlers that need to
//! cross-check it against request input.

use argon2::password_hash::{Error as PasswordHashError, PasswordHash, PasswordVerifier};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::error;

use trackhub_common::{Error, Result};

use crate::AppState;

const REALM: &str = "trackhub";

/// Accepted client credentials.
pub struct Credentials {
    username: String,
    password_hash: String,
}

impl Credentials {
    /// Validates the PHC string up front, so a bad hash fails at startup
    /// instead of on the first request.
    pub fn new(username: &str, password_hash: &str) -> Result<Self> {
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".into()));
        }
        PasswordHash::new(password_hash)
            .map_err(|e| Error::InvalidInput(format!("invalid password hash: {e}")))?;
        Ok(Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    /// Check a presented username/password pair.
    pub fn check(&self, username: &str, password: &str) -> Result<bool> {
        if username != self.username {
            return Ok(false);
        }
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| Error::Internal(format!("invalid password hash configuration: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("password verification failed: {e}"))),
        }
    }
}

/// Username the auth middleware verified for this request.
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub String);

/// Authentication middleware for all protected routes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;
    let (username, password) =
        decode_basic(header_value).ok_or(AuthError::MissingCredentials)?;

    match state.credentials.check(&username, &password) {
        Ok(true) => {}
        Ok(false) => return Err(AuthError::InvalidCredentials),
        Err(e) => {
            error!("credential check failed: {e}");
            return Err(AuthError::Internal);
        }
    }

    request.extensions_mut().insert(VerifiedUser(username));
    Ok(next.run(request).await)
}

fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidCredentials,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{REALM}\""))],
                "unauthorized",
            )
                .into_response(),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "authorization failed with an internal error",
            )
                .into_response(),
        }
    }
}
