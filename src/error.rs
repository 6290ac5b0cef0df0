//! Error taxonomy for the auth subsystem.
//! Three layers: `ApiError` is the failure of one HTTP call, `AuthError` is
//! what a login attempt surfaces to the login form, and `ResolutionError` is
//! the deliberately uniform "could not establish who is logged in" failure.

use thiserror::Error;

/// Failure of a single API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status. `message` carries
    /// whatever human-readable detail the error body offered.
    #[error("unexpected status {code}")]
    Status { code: u16, message: Option<String> },
    /// The body did not decode into the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The request could not even be built (bad base URL or path).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// What a login attempt reports back to the login form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The backend rejected the credentials; shown verbatim on the form.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Anything else: network trouble, server errors, a post-login probe
    /// that failed. The form shows a generic try-again message.
    #[error("login failed: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Collapse a failed login call onto the two cases the form
    /// distinguishes: an explicit rejection versus everything else.
    pub fn from_login_failure(err: ApiError) -> Self {
        match err {
            ApiError::Status { code: 400 | 401 | 403 | 422, .. } => AuthError::InvalidCredentials,
            other => AuthError::Unknown(other.to_string()),
        }
    }
}

/// Failure to establish the current identity. Opaque on purpose: a missing
/// session, a network error and a malformed body all look alike to callers,
/// which treat any of them as "no session".
#[derive(Debug, Error)]
#[error("identity resolution failed: {0}")]
pub struct ResolutionError(#[from] pub ApiError);
