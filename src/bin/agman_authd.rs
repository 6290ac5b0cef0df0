//!
//! agman dev auth service
//! -----------------------
//! Stands in for the shared platform API during local development: serves
//! the `/api/v1/auth/*` endpoints with a seeded account per role so the
//! console and shell have something real to authenticate against.

use tracing::info;

use agman::devauth::{self, AuthState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
                .unwrap(),
        )
        .init();

    let addr = std::env::var("AGMAN_AUTHD_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());

    info!("Starting agman dev auth service");
    info!("Seeded accounts:");
    for user in devauth::demo_users() {
        info!(
            "  {:<8} password={:<12} role={}",
            user.record.username, user.password, user.record.account_role
        );
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    devauth::serve(listener, AuthState::with_demo_users()).await
}
