//!
//! Route guard
//! ------------
//! Protects a route subtree behind a required role set. A guard is a small
//! state machine driven by the session store:
//!
//!   Init -> Checking -> Unauthenticated | WrongRole | Authorized
//!
//! `evaluate` runs the transition, triggering session resolution when
//! needed; `render` reports what the host should draw and fires the
//! machine's redirect side effect, at most once per session epoch, however
//! many times the host re-renders. Protected content is never shown, even
//! transiently, outside `Authorized`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::identity::{Role, SessionState, SessionStore, User};
use crate::routing::{Destination, RoleRouter};

/// What the protected area shows right now.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardView {
    /// Resolution still pending; draw the placeholder, decide nothing.
    Loading,
    /// A redirect has been issued (or suppressed as a duplicate); draw
    /// nothing.
    Redirecting,
    /// The session checked out; draw the protected content.
    Content(User),
}

/// Decision states. Terminal ones capture the epoch of the resolution that
/// produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Init,
    Checking,
    Unauthenticated { epoch: u64 },
    WrongRole { role: Role, epoch: u64 },
    Authorized { user: User, epoch: u64 },
}

pub struct RouteGuard {
    allowed: Vec<Role>,
    state: GuardState,
    /// Epoch the last redirect fired for; the guard never redirects twice
    /// for the same resolution.
    redirected_for: Option<u64>,
}

impl RouteGuard {
    /// Guard admitting the given roles. An empty set admits nobody.
    pub fn new(allowed: &[Role]) -> RouteGuard {
        RouteGuard { allowed: allowed.to_vec(), state: GuardState::Init, redirected_for: None }
    }

    /// The admin console's usual guard.
    pub fn admin() -> RouteGuard {
        RouteGuard::new(&[Role::Admin])
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Drive the machine to a decision against the current session.
    ///
    /// `Checking` is set before the first await, so a host snapshotting
    /// mid-resolution sees the waiting state. Re-running after a session
    /// change re-decides against the new epoch.
    pub async fn evaluate(&mut self, store: &Arc<SessionStore>) -> &GuardState {
        self.state = GuardState::Checking;
        // one snapshot: the identity judged and the epoch stamped on the
        // decision come from the same commit
        let SessionState { identity, epoch, .. } = store.resolve_session().await;
        self.state = match identity {
            None => {
                debug!(target: "guard", epoch, "no session");
                GuardState::Unauthenticated { epoch }
            }
            Some(user) if self.allowed.contains(&user.role) => {
                debug!(target: "guard", username = %user.username, role = %user.role, "authorized");
                GuardState::Authorized { user, epoch }
            }
            Some(user) => {
                info!(target: "guard", username = %user.username, role = %user.role, "wrong role for this area");
                GuardState::WrongRole { role: user.role, epoch }
            }
        };
        &self.state
    }

    /// What to draw, firing the redirect side effect when the decision calls
    /// for one. Rendering is idempotent: the same decision redirects once.
    pub fn render(&mut self, router: &RoleRouter) -> GuardView {
        match &self.state {
            GuardState::Init | GuardState::Checking => GuardView::Loading,
            GuardState::Authorized { user, .. } => GuardView::Content(user.clone()),
            GuardState::Unauthenticated { epoch } => {
                let epoch = *epoch;
                self.redirect_once(epoch, router, router.login_destination());
                GuardView::Redirecting
            }
            GuardState::WrongRole { role, epoch } => {
                let (role, epoch) = (*role, *epoch);
                self.redirect_once(epoch, router, router.destination_for_role(role));
                GuardView::Redirecting
            }
        }
    }

    fn redirect_once(&mut self, epoch: u64, router: &RoleRouter, dest: Destination) {
        if self.redirected_for == Some(epoch) {
            return;
        }
        self.redirected_for = Some(epoch);
        router.navigate(&dest);
    }
}
