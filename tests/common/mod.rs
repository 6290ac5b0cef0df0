//! Shared fixtures: a scriptable auth backend, a recording navigator and a
//! fully wired session rig.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use agman::config::AppUrls;
use agman::error::ApiError;
use agman::identity::{AuthBackend, Credentials, SessionStore, UserRecord};
use agman::routing::{Destination, Navigator, RoleRouter};
use agman::storage::ClientStorage;

/// Backend whose responses are queued up front. An empty queue falls back to
/// the quiet default: logins succeed, `/auth/me/` answers 401, logouts
/// succeed.
pub struct MockBackend {
    login_results: Mutex<VecDeque<Result<(), ApiError>>>,
    me_results: Mutex<VecDeque<Result<UserRecord, ApiError>>>,
    logout_results: Mutex<VecDeque<Result<(), ApiError>>>,
    login_calls: AtomicUsize,
    me_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    me_delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend {
            login_results: Mutex::new(VecDeque::new()),
            me_results: Mutex::new(VecDeque::new()),
            logout_results: Mutex::new(VecDeque::new()),
            login_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            me_delay: Mutex::new(None),
        }
    }

    pub fn queue_login(&self, result: Result<(), ApiError>) {
        self.login_results.lock().push_back(result);
    }

    pub fn queue_me(&self, result: Result<UserRecord, ApiError>) {
        self.me_results.lock().push_back(result);
    }

    pub fn queue_logout(&self, result: Result<(), ApiError>) {
        self.logout_results.lock().push_back(result);
    }

    /// Make every following `/auth/me/` answer only after `delay`.
    pub fn delay_me(&self, delay: Duration) {
        *self.me_delay.lock() = Some(delay);
    }

    pub fn clear_me_delay(&self) {
        *self.me_delay.lock() = None;
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn me_count(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

pub fn status(code: u16) -> ApiError {
    ApiError::Status { code, message: None }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<(), ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn current_user(&self) -> Result<UserRecord, ApiError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.me_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.me_results.lock().pop_front().unwrap_or_else(|| Err(status(401)))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_results.lock().pop_front().unwrap_or(Ok(()))
    }
}

/// Navigator that records every hop. In-app hops move the pretend address
/// bar; external hops leave it alone, as a real hand-off would unload the
/// app entirely.
pub struct RecordingNavigator {
    path: Mutex<String>,
    gone: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Arc<RecordingNavigator> {
        Arc::new(RecordingNavigator {
            path: Mutex::new(path.to_string()),
            gone: Mutex::new(Vec::new()),
        })
    }

    pub fn set_path(&self, path: &str) {
        *self.path.lock() = path.to_string();
    }

    pub fn hops(&self) -> Vec<Destination> {
        self.gone.lock().clone()
    }

    pub fn hop_count(&self) -> usize {
        self.gone.lock().len()
    }

    pub fn last_hop(&self) -> Option<Destination> {
        self.gone.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path.lock().clone()
    }

    fn go(&self, dest: &Destination) {
        if let Destination::InApp(route) = dest {
            *self.path.lock() = route.clone();
        }
        self.gone.lock().push(dest.clone());
    }
}

/// Fixed URL table so assertions never depend on the host environment.
pub fn test_urls() -> AppUrls {
    AppUrls {
        login_page: "http://login.local:5179".to_string(),
        admin_app: "http://admin.local:5178".to_string(),
        staff_app: "http://staff.local:5176".to_string(),
        agency_app: "http://agency.local:5175".to_string(),
        api_base: "http://api.local:8000/api/v1".to_string(),
    }
}

pub fn record(user_id: i64, username: &str, role: &str) -> UserRecord {
    let joined = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().expect("fixed timestamp");
    UserRecord {
        user_id,
        username: username.to_string(),
        full_name: format!("Test {username}"),
        email: format!("{username}@agms.example"),
        phone_number: None,
        address: None,
        account_role: role.to_string(),
        created_at: joined,
        updated_at: joined,
    }
}

/// Everything a session test needs, wired the way the bins wire it.
pub struct Rig {
    pub backend: Arc<MockBackend>,
    pub navigator: Arc<RecordingNavigator>,
    pub router: Arc<RoleRouter>,
    pub storage: ClientStorage,
    pub store: Arc<SessionStore>,
}

pub fn rig_at(path: &str) -> Rig {
    let backend = Arc::new(MockBackend::new());
    let navigator = RecordingNavigator::at(path);
    let router = Arc::new(RoleRouter::new(test_urls(), navigator.clone()));
    let storage = ClientStorage::new();
    let store = SessionStore::new(backend.clone(), router.clone(), storage.clone());
    Rig { backend, navigator, router, storage, store }
}
