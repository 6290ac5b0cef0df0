//!
//! Session store
//! --------------
//! The single source of truth for "who is logged in". State lives in a
//! snapshot behind a `tokio::sync::watch` channel: readers never lock and a
//! waiter can never miss a commit. Mutations funnel through three
//! operations:
//! - `resolve_session` (and its identity-only view
//!   `resolve_session_if_needed`): lazy, deduplicated identity resolution.
//!   The first caller flips `Idle -> Resolving` and spawns the probe;
//!   everyone else awaits the commit. The probe task owns the commit, so a
//!   caller cancelling mid-wait cannot wedge the store.
//! - `login`: credentials -> backend session -> fresh identity -> commit ->
//!   role-routed navigation.
//! - `logout`: backend teardown (result ignored) -> storage wipe -> commit
//!   -> login page. Safe to call when already logged out.
//!
//! A commit that changes the identity bumps `epoch`; consumers key
//! "once per session change" behavior on it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::routing::RoleRouter;
use crate::storage::ClientStorage;

use super::resolver::{AuthBackend, IdentityResolver};
use super::user::{Credentials, User};

/// Where the store is in the resolve lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingState {
    /// Nothing asked yet.
    Idle,
    /// A probe is in flight.
    Resolving,
    /// The question has been answered for the current session; the stored
    /// identity (possibly absent) is the answer.
    Resolved,
}

/// One observable snapshot of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub identity: Option<User>,
    pub loading: LoadingState,
    /// Bumped exactly when a commit changes the identity: every login, and
    /// any logout that actually dropped one. Strictly monotonic.
    pub epoch: u64,
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    resolver: IdentityResolver,
    router: Arc<RoleRouter>,
    storage: ClientStorage,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        router: Arc<RoleRouter>,
        storage: ClientStorage,
    ) -> Arc<SessionStore> {
        let resolver = IdentityResolver::new(backend.clone());
        let (state, _) = watch::channel(SessionState {
            identity: None,
            loading: LoadingState::Idle,
            epoch: 0,
        });
        Arc::new(SessionStore { backend, resolver, router, storage, state })
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Watch session commits. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Settled snapshot of the session, resolving it on first use.
    ///
    /// `Resolved` is sticky until a login or logout replaces the session: a
    /// stored "nobody" answer is returned without another backend call. The
    /// snapshot is one commit, so its identity and epoch always belong
    /// together; decisions keyed on the epoch should read both from here.
    pub async fn resolve_session(self: &Arc<Self>) -> SessionState {
        let mut rx = self.state.subscribe();
        loop {
            let mut claimed = false;
            self.state.send_if_modified(|s| {
                if s.loading == LoadingState::Idle {
                    s.loading = LoadingState::Resolving;
                    claimed = true;
                    true
                } else {
                    false
                }
            });
            if claimed {
                self.spawn_probe();
            }
            let snap = rx.borrow_and_update().clone();
            if snap.loading == LoadingState::Resolved {
                return snap;
            }
            if rx.changed().await.is_err() {
                // store dropped while waiting; report what was known
                return snap;
            }
        }
    }

    /// Identity for the current session, when only the answer matters.
    pub async fn resolve_session_if_needed(self: &Arc<Self>) -> Option<User> {
        self.resolve_session().await.identity
    }

    /// Run the who-am-I probe in its own task and commit the answer. Runs
    /// detached so the resolution survives caller cancellation. The commit
    /// is skipped when a login or logout settled the session first.
    fn spawn_probe(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let identity = match store.resolver.who_am_i().await {
                Ok(user) => Some(user),
                Err(err) => {
                    // every resolution failure reads as "no session"
                    debug!(target: "auth", error = %err, "session probe found no identity");
                    None
                }
            };
            store.state.send_if_modified(|s| {
                if s.loading != LoadingState::Resolving {
                    return false;
                }
                s.identity = identity;
                s.loading = LoadingState::Resolved;
                true
            });
        });
    }

    /// Authenticate and establish a fresh session.
    ///
    /// The login response body is never trusted for identity: on success the
    /// resolver is asked again and only its answer is committed. The commit
    /// happens before the post-login navigation, so by the time the role's
    /// home destination loads, the session already reads as logged in.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        if let Err(err) = self.backend.login(credentials).await {
            let mapped = AuthError::from_login_failure(err);
            info!(target: "auth", username = %credentials.username, error = %mapped, "login rejected");
            return Err(mapped);
        }
        let user = match self.resolver.who_am_i().await {
            Ok(user) => user,
            Err(err) => {
                warn!(target: "auth", error = %err, "login succeeded but the session probe failed");
                return Err(AuthError::Unknown("could not confirm the new session".to_string()));
            }
        };
        self.state.send_modify(|s| {
            s.identity = Some(user.clone());
            s.loading = LoadingState::Resolved;
            s.epoch += 1;
        });
        info!(target: "auth", username = %user.username, role = %user.role, epoch = self.epoch(), "login established");
        self.router.navigate(&self.router.destination_for_role(user.role));
        Ok(user)
    }

    /// Drop the session everywhere and land on the login page.
    ///
    /// The backend call's outcome is logged and ignored: local teardown and
    /// the redirect proceed regardless. When the store already knows it is
    /// logged out this is a redirect and nothing else. Never fails.
    pub async fn logout(&self) {
        let snap = self.snapshot();
        let known_logged_out = snap.identity.is_none() && snap.loading == LoadingState::Resolved;
        if !known_logged_out {
            if let Err(err) = self.backend.logout().await {
                warn!(target: "auth", error = %err, "backend logout failed; clearing the local session anyway");
            }
            self.storage.clear();
            self.state.send_modify(|s| {
                if s.identity.take().is_some() {
                    s.epoch += 1;
                }
                s.loading = LoadingState::Resolved;
            });
            info!(target: "auth", epoch = self.epoch(), "session cleared");
        }
        self.router.navigate(&self.router.login_destination());
    }
}
