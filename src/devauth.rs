//!
//! Dev auth service
//! -----------------
//! A small in-process rendition of the platform's auth endpoints, used by
//! the integration tests and the `agman_authd` binary so the console can be
//! exercised without the real backend.
//!
//! Endpoints (cookie-session model, per the production contract):
//! - `POST /api/v1/auth/login/` checks credentials and issues an opaque
//!   session cookie.
//! - `GET  /api/v1/auth/me/` returns the session's user record.
//! - `POST /api/v1/auth/logout/` revokes the session and clears the cookie.
//!
//! Accounts are seeded in memory. `account_role` strings are returned
//! exactly as seeded (including mixed case); normalizing them is the
//! client's job.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use getrandom::getrandom;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::identity::UserRecord;

const SESSION_COOKIE: &str = "agman_session";

/// Seeded account: login credentials plus the record `/auth/me/` returns.
#[derive(Debug, Clone)]
pub struct SeedUser {
    pub password: String,
    pub record: UserRecord,
}

/// Shared state injected into all handlers: the account table and the live
/// session id -> username map.
#[derive(Clone)]
pub struct AuthState {
    users: Arc<HashMap<String, SeedUser>>,
    sessions: Arc<RwLock<HashMap<String, String>>>,
}

impl AuthState {
    pub fn new(seed: Vec<SeedUser>) -> AuthState {
        let users = seed.into_iter().map(|u| (u.record.username.clone(), u)).collect();
        AuthState { users: Arc::new(users), sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// The demo account set: one per role, a legacy account whose role is
    /// stored in mixed case, and one with a role the console does not know.
    pub fn with_demo_users() -> AuthState {
        AuthState::new(demo_users())
    }
}

pub fn demo_users() -> Vec<SeedUser> {
    vec![
        seed(1, "admin1", "admin1pass", "Amara Okafor", "admin"),
        seed(2, "staff1", "staff1pass", "Stefan Brandt", "staff"),
        seed(3, "agent1", "agent1pass", "Agathe Leroux", "agent"),
        // stored as entered before role strings were normalized server-side
        seed(4, "admin2", "admin2pass", "Ade Badmus", "Admin"),
        seed(5, "mgr1", "mgr1pass", "Mina Haddad", "manager"),
    ]
}

fn seed(id: i64, username: &str, password: &str, full_name: &str, role: &str) -> SeedUser {
    let t = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().unwrap_or_else(Utc::now);
    SeedUser {
        password: password.to_string(),
        record: UserRecord {
            user_id: id,
            username: username.to_string(),
            full_name: full_name.to_string(),
            email: format!("{username}@agms.example"),
            phone_number: None,
            address: None,
            account_role: role.to_string(),
            created_at: t,
            updated_at: t,
        },
    }
}

/// Routes of the service, mounted under the production API prefix.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/api/v1/auth/login/", post(login))
        .route("/api/v1/auth/me/", get(me))
        .route("/api/v1/auth/logout/", post(logout))
        .with_state(state)
}

/// Serve on an already-bound listener; tests bind ephemeral ports.
pub async fn serve(listener: tokio::net::TcpListener, state: AuthState) -> anyhow::Result<()> {
    info!(target: "devauth", addr = %listener.local_addr()?, "dev auth service listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    let _ = getrandom(&mut bytes);
    let mut sid = String::with_capacity(32);
    use std::fmt::Write as _;
    for b in &bytes {
        let _ = write!(&mut sid, "{:02x}", b);
    }
    sid
}

fn set_session_cookie(sid: &str) -> HeaderValue {
    // HttpOnly, no Secure: the dev service runs over plain http
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, sid)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

async fn login(State(state): State<AuthState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    let ok = state.users.get(&payload.username).map(|u| u.password == payload.password).unwrap_or(false);
    if !ok {
        info!(target: "devauth", username = %payload.username, "login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({"status":"unauthorized","message":"invalid credentials"})),
        );
    }
    let sid = new_session_id();
    {
        let mut map = state.sessions.write().await;
        map.insert(sid.clone(), payload.username.clone());
    }
    info!(target: "devauth", username = %payload.username, "login ok");
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&sid));
    (StatusCode::OK, headers, Json(json!({"status":"ok"})))
}

async fn me(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"})));
    };
    let username = { state.sessions.read().await.get(&sid).cloned() };
    match username.and_then(|u| state.users.get(&u)) {
        Some(seeded) => {
            let body = serde_json::to_value(&seeded.record).unwrap_or_else(|_| json!({"status":"error"}));
            (StatusCode::OK, Json(body))
        }
        None => (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))),
    }
}

async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) {
        let mut map = state.sessions.write().await;
        map.remove(&sid);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status":"ok"})))
}
