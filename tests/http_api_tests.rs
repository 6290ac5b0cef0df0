//! End-to-end auth flow over HTTP: real reqwest cookie jar, real axum
//! handlers from the bundled dev auth service, real 401s through the
//! unauthorized policy.

mod common;

use std::sync::Arc;

use tokio::task::JoinHandle;

use agman::devauth::{self, AuthState};
use agman::error::{ApiError, AuthError};
use agman::guard::{GuardView, RouteGuard};
use agman::http::ApiClient;
use agman::identity::{Credentials, HttpAuthBackend, Role, SessionStore};
use agman::routing::{Destination, RoleRouter};
use agman::storage::ClientStorage;

use common::*;

struct ServerGuard(JoinHandle<()>);
impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Bind an ephemeral port, then serve on it; binding first means clients can
/// connect immediately without a readiness poll.
async fn start_devauth() -> (ServerGuard, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = devauth::serve(listener, AuthState::with_demo_users()).await {
            eprintln!("devauth task error: {e:?}");
        }
    });
    (ServerGuard(handle), format!("http://{addr}/api/v1"))
}

struct LiveRig {
    _server: ServerGuard,
    navigator: Arc<RecordingNavigator>,
    router: Arc<RoleRouter>,
    api: ApiClient,
    store: Arc<SessionStore>,
}

async fn live_rig_at(path: &str) -> LiveRig {
    let (server, api_base) = start_devauth().await;
    let mut urls = test_urls();
    urls.api_base = api_base.clone();
    let navigator = RecordingNavigator::at(path);
    let router = Arc::new(RoleRouter::new(urls, navigator.clone()));
    let api = ApiClient::new(&api_base, router.clone()).expect("api client");
    let backend = Arc::new(HttpAuthBackend::new(&api));
    let store = SessionStore::new(backend, router.clone(), ClientStorage::new());
    LiveRig { _server: server, navigator, router, api, store }
}

fn login_dest() -> Destination {
    Destination::ExternalApp {
        base: "http://login.local:5179".to_string(),
        path: "/login".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_login_resolve_logout_cycle_over_http() {
    let rig = live_rig_at("/login").await;

    // cold probe: no cookie yet, and the miss reads as "no session"
    assert!(rig.store.resolve_session_if_needed().await.is_none());
    assert_eq!(rig.store.epoch(), 0);

    let err = rig.store.login(&Credentials::new("admin1", "wrong")).await.expect_err("bad password");
    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(rig.navigator.hop_count(), 0);

    let user = rig.store.login(&Credentials::new("admin1", "admin1pass")).await.expect("login");
    assert_eq!(user.username, "admin1");
    assert_eq!(user.role, Role::Admin);
    assert_eq!(rig.store.epoch(), 1);
    assert_eq!(rig.navigator.last_hop(), Some(Destination::InApp("/admin".to_string())));

    // the cookie jar carries the session: a fresh store over the same client
    // resolves the identity without logging in again
    let resumed_backend = Arc::new(HttpAuthBackend::new(&rig.api));
    let resumed = SessionStore::new(resumed_backend, rig.router.clone(), ClientStorage::new());
    let who = resumed.resolve_session_if_needed().await.expect("cookie session");
    assert_eq!(who.username, "admin1");

    rig.store.logout().await;
    assert_eq!(rig.store.epoch(), 2);
    assert_eq!(rig.navigator.last_hop(), Some(login_dest()));

    // the server session is gone, not just the local state
    let after_backend = Arc::new(HttpAuthBackend::new(&rig.api));
    let after = SessionStore::new(after_backend, rig.router.clone(), ClientStorage::new());
    assert!(after.resolve_session_if_needed().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn legacy_mixed_case_roles_normalize_to_admin() {
    let rig = live_rig_at("/login").await;

    let user = rig.store.login(&Credentials::new("admin2", "admin2pass")).await.expect("login");
    assert_eq!(user.role, Role::Admin);
    assert_eq!(rig.navigator.last_hop(), Some(Destination::InApp("/admin".to_string())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_roles_log_in_but_are_routed_to_the_login_page() {
    let rig = live_rig_at("/login").await;

    let user = rig.store.login(&Credentials::new("mgr1", "mgr1pass")).await.expect("login");
    assert_eq!(user.role, Role::Unknown);
    // the session is real even though no app claims the role
    assert!(rig.store.snapshot().identity.is_some());
    assert_eq!(rig.navigator.last_hop(), Some(login_dest()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn real_401s_follow_the_public_route_policy() {
    let rig = live_rig_at("/login").await;

    // on a public route a rejected data call triggers no navigation
    let err = rig.api.get_json::<serde_json::Value>("/auth/me/").await.expect_err("no session");
    assert!(matches!(err, ApiError::Status { code: 401, .. }));
    assert_eq!(rig.navigator.hop_count(), 0);

    // on a protected route the first 401 redirects and the second is absorbed
    rig.navigator.set_path("/admin/agencies");
    rig.api.get_json::<serde_json::Value>("/auth/me/").await.expect_err("no session");
    rig.api.get_json::<serde_json::Value>("/auth/me/").await.expect_err("no session");
    assert_eq!(rig.navigator.hop_count(), 1);
    assert_eq!(rig.navigator.last_hop(), Some(login_dest()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_cold_admin_visit_with_no_cookie_redirects_once_via_the_guard() {
    let rig = live_rig_at("/admin/agencies").await;

    let mut guard = RouteGuard::admin();
    guard.evaluate(&rig.store).await;
    assert_eq!(guard.render(&rig.router), GuardView::Redirecting);
    guard.render(&rig.router);

    // the probe's own 401 stays quiet; only the guard navigates, and once
    assert_eq!(rig.navigator.hop_count(), 1);
    assert_eq!(rig.navigator.last_hop(), Some(login_dest()));
}
