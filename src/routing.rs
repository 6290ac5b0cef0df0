//!
//! Role routing and the unauthorized-redirect policy
//! --------------------------------------------------
//! Maps resolved roles onto their home applications and owns every redirect
//! this subsystem performs.
//!
//! Responsibilities:
//! - `destination_for` is total over arbitrary role strings; anything the
//!   console does not recognize lands on the login page.
//! - `navigate` performs an on-purpose navigation through the pluggable
//!   `Navigator` and re-arms the unauthorized gate.
//! - `on_unauthorized` implements the 401 policy: no redirect on public
//!   routes, and on protected routes at most one redirect however many
//!   rejected requests pile up. Only `navigate` clears the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{is_public_route, AppUrls};
use crate::identity::Role;

/// Where a navigation lands: a route inside the admin console, or a full
/// hand-off to one of the sibling applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    InApp(String),
    ExternalApp { base: String, path: String },
}

impl Destination {
    /// Absolute URL for external hops; the bare route for in-app ones.
    pub fn href(&self) -> String {
        match self {
            Destination::InApp(route) => route.clone(),
            Destination::ExternalApp { base, path } => {
                format!("{}{}", base.trim_end_matches('/'), path)
            }
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.href())
    }
}

/// Browser seam. Bins track a pretend address bar; tests record calls.
pub trait Navigator: Send + Sync {
    /// Path part of the current location, e.g. `/admin/users`.
    fn current_path(&self) -> String;
    /// Perform the navigation.
    fn go(&self, dest: &Destination);
}

pub struct RoleRouter {
    urls: AppUrls,
    navigator: Arc<dyn Navigator>,
    /// Set while an unauthorized redirect is in flight; cleared only by the
    /// next `navigate`.
    redirecting: AtomicBool,
}

impl RoleRouter {
    pub fn new(urls: AppUrls, navigator: Arc<dyn Navigator>) -> Self {
        Self { urls, navigator, redirecting: AtomicBool::new(false) }
    }

    pub fn urls(&self) -> &AppUrls {
        &self.urls
    }

    /// The one place unauthenticated traffic is sent.
    pub fn login_destination(&self) -> Destination {
        Destination::ExternalApp { base: self.urls.login_page.clone(), path: "/login".to_string() }
    }

    /// Total mapping from a role string to its home destination. Case does
    /// not matter.
    pub fn destination_for(&self, role: &str) -> Destination {
        self.destination_for_role(Role::parse(role))
    }

    /// Same mapping over an already-normalized role.
    pub fn destination_for_role(&self, role: Role) -> Destination {
        match role {
            Role::Admin => Destination::InApp("/admin".to_string()),
            Role::Staff => Destination::ExternalApp { base: self.urls.staff_app.clone(), path: "/".to_string() },
            Role::Agent => Destination::ExternalApp { base: self.urls.agency_app.clone(), path: "/".to_string() },
            Role::Unknown => self.login_destination(),
        }
    }

    /// Navigate somewhere on purpose. This begins a new navigation, so the
    /// unauthorized gate is re-armed before the hop.
    pub fn navigate(&self, dest: &Destination) {
        self.redirecting.store(false, Ordering::SeqCst);
        info!(target: "nav", to = %dest, "navigate");
        self.navigator.go(dest);
    }

    /// 401 policy. Returns true when a redirect was actually issued.
    ///
    /// Public routes never redirect; the rejected call is the caller's
    /// problem. Elsewhere the first 401 wins the gate and hops to the login
    /// page; later ones are suppressed until `navigate` re-arms the gate.
    pub fn on_unauthorized(&self) -> bool {
        let path = self.navigator.current_path();
        if is_public_route(&path) {
            debug!(target: "nav", %path, "401 on a public route; no redirect");
            return false;
        }
        if self.redirecting.swap(true, Ordering::SeqCst) {
            debug!(target: "nav", %path, "401 redirect already in flight; suppressed");
            return false;
        }
        let dest = self.login_destination();
        info!(target: "nav", %path, to = %dest, "401 on a protected route; redirecting to login");
        self.navigator.go(&dest);
        true
    }
}
