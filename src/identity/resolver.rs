//! The auth backend seam and the who-am-I probe.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ApiError, ResolutionError};
use crate::http::ApiClient;

use super::user::{Credentials, User, UserRecord};

// Endpoint paths on the shared API; trailing slashes are part of the contract.
const LOGIN_PATH: &str = "/auth/login/";
const LOGOUT_PATH: &str = "/auth/logout/";
const ME_PATH: &str = "/auth/me/";

/// The three calls this subsystem makes against the auth collaborator.
/// `HttpAuthBackend` is the real one; tests script their own.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Establish a session for the given credentials. The interesting result
    /// is the session cookie, not the body; identity is re-fetched afterwards.
    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError>;
    /// Fetch the identity attached to the current session cookie.
    async fn current_user(&self) -> Result<UserRecord, ApiError>;
    /// Tear down the server-side session.
    async fn logout(&self) -> Result<(), ApiError>;
}

/// `AuthBackend` over the shared REST API. The auth endpoints interpret
/// their own status codes, so this always talks through the policy-free
/// client view.
pub struct HttpAuthBackend {
    api: ApiClient,
}

impl HttpAuthBackend {
    pub fn new(api: &ApiClient) -> Self {
        Self { api: api.without_redirects() }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let _: serde_json::Value = self.api.post_json(LOGIN_PATH, credentials).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserRecord, ApiError> {
        self.api.get_json(ME_PATH).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.api.post_empty(LOGOUT_PATH).await
    }
}

/// Answers "who is logged in right now?" with exactly one backend call.
///
/// Every failure mode (no cookie, an expired session, network trouble, a
/// body that does not parse) collapses into the same `ResolutionError`;
/// callers treat any of them as "no session" and never branch on the cause.
pub struct IdentityResolver {
    backend: Arc<dyn AuthBackend>,
}

impl IdentityResolver {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    pub async fn who_am_i(&self) -> Result<User, ResolutionError> {
        let record = self.backend.current_user().await?;
        let user = User::from_record(record);
        debug!(target: "auth", username = %user.username, role = %user.role, "identity resolved");
        Ok(user)
    }
}
