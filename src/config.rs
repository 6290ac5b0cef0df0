//! URL table for the application federation and the public route registry.
//! Values are read once from the environment with hard-coded dev fallbacks.

use once_cell::sync::Lazy;

/// Base URLs of the sibling applications and the shared REST API.
///
/// Each field can be overridden through an `AGMAN_*` environment variable and
/// falls back to the conventional local dev port for that app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUrls {
    pub login_page: String,
    pub admin_app: String,
    pub staff_app: String,
    pub agency_app: String,
    pub api_base: String,
}

impl AppUrls {
    pub fn from_env() -> Self {
        Self {
            login_page: env_or("AGMAN_LOGIN_PAGE_URL", "http://localhost:5179"),
            admin_app: env_or("AGMAN_ADMIN_APP_URL", "http://localhost:5178"),
            staff_app: env_or("AGMAN_STAFF_APP_URL", "http://localhost:5176"),
            agency_app: env_or("AGMAN_AGENCY_APP_URL", "http://localhost:5175"),
            api_base: env_or("AGMAN_API_BASE_URL", "http://localhost:8000/api/v1"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

static APP_URLS: Lazy<AppUrls> = Lazy::new(AppUrls::from_env);

/// Process-wide URL table, resolved on first use and static afterwards.
pub fn app_urls() -> &'static AppUrls {
    &APP_URLS
}

/// Routes that never require a session. A 401 observed while the browser
/// sits on one of these must not bounce the user to the login page.
pub const PUBLIC_ROUTES: &[&str] = &["/", "/landing", "/about", "/login", "/register", "/forgot-password"];

/// True when `path` is in the public set. Matching ignores query strings,
/// fragments and a trailing slash, so `/login/?next=%2Fadmin` is still public.
pub fn is_public_route(path: &str) -> bool {
    let p = path.split(['?', '#']).next().unwrap_or(path);
    let p = if p.len() > 1 { p.trim_end_matches('/') } else { p };
    PUBLIC_ROUTES.iter().any(|r| *r == p)
}
