//!
//! HTTP surface to the shared REST API
//! ------------------------------------
//! One cookie-jar `reqwest::Client` carries the opaque session credential on
//! every call; the consumer never sees or stores the cookie itself.
//! `ApiClient` joins endpoint paths onto the configured API base, decodes
//! JSON bodies and funnels failures into `ApiError`. Calls through the
//! default view report 401s to the `RoleRouter` (the unauthorized policy);
//! `without_redirects` yields a view that shares the same cookie jar but
//! leaves status handling entirely to the caller; the auth endpoints use it
//! because they interpret 401 themselves.

use std::sync::Arc;

use anyhow::Context;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::routing::RoleRouter;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    router: Option<Arc<RoleRouter>>,
}

impl ApiClient {
    /// Client over `base` (e.g. `http://localhost:8000/api/v1`) that reports
    /// 401s to `router`.
    pub fn new(base: &str, router: Arc<RoleRouter>) -> anyhow::Result<Self> {
        let mut client = Self::bare(base)?;
        client.router = Some(router);
        Ok(client)
    }

    /// Client with no unauthorized policy attached.
    pub fn bare(base: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid api base URL: {base}"))?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { http, base, router: None })
    }

    /// A view over the same client that skips the 401 policy. Clones of a
    /// reqwest client share their cookie store, so a session established
    /// through one view is visible through the other.
    pub fn without_redirects(&self) -> ApiClient {
        ApiClient { http: self.http.clone(), base: self.base.clone(), router: None }
    }

    /// GET a JSON payload.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let resp = self.http.get(url).send().await?;
        self.read_json(resp).await
    }

    /// POST a JSON body and decode a JSON payload back.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let resp = self.http.post(url).json(body).send().await?;
        self.read_json(resp).await
    }

    /// POST with no request body, ignoring whatever comes back beyond the
    /// status.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        let resp = self.http.post(url).send().await?;
        self.check_status(resp).await.map(|_| ())
    }

    // The API base keeps its path segment (`/api/v1`), so endpoints are
    // joined textually rather than with Url::join, which would discard it.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidRequest(format!("{path:?}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, ApiError> {
        let resp = self.check_status(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Status gate shared by every call: non-success becomes `ApiError::Status`
    /// carrying whatever message the error body offered, and a 401 through a
    /// policy-attached view pokes the router.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            if let Some(router) = &self.router {
                router.on_unauthorized();
            }
        }
        let message = extract_message(resp).await;
        debug!(target: "api", code = status.as_u16(), message = message.as_deref().unwrap_or(""), "request rejected");
        Err(ApiError::Status { code: status.as_u16(), message })
    }
}

/// Pull a human-readable message out of an error body, tolerating non-JSON.
async fn extract_message(resp: reqwest::Response) -> Option<String> {
    let val: serde_json::Value = resp.json().await.ok()?;
    for key in ["message", "detail", "error"] {
        if let Some(s) = val.get(key).and_then(|v| v.as_str()) {
            return Some(s.to_string());
        }
    }
    None
}
