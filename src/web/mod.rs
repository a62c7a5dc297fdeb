//! Browser dashboard.
//!
//! Routes:
//! - GET  /              login page
//! - POST /login         form login
//! - GET  /logout
//! - GET  /dashboard     filtered list
//! - POST /edit/{id}     admin only
//! - GET  /delete/{id}   admin only
//! - GET  /export        CSV, admin only
//! - GET  /export-excel  XLSX, admin only

pub mod export;
pub mod handlers;
pub mod session;
pub mod templates;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::dashboard::DashboardService;
use templates::Templates;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct WebState {
    pub service: DashboardService,
    pub templates: Arc<Templates>,
}

/// Sessions unused for this long stop authenticating.
const SESSION_IDLE_TIMEOUT: Duration = Duration::hours(8);

pub fn router(state: WebState, secure_cookie: bool) -> Router {
    // MemoryStore only hides expired records; they are freed on logout or
    // when the process restarts.
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure_cookie)
        .with_expiry(Expiry::OnInactivity(SESSION_IDLE_TIMEOUT));

    Router::new()
        .route("/", get(handlers::login_page))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/edit/{id}", post(handlers::edit))
        .route("/delete/{id}", get(handlers::delete))
        .route("/export", get(handlers::export_csv))
        .route("/export-excel", get(handlers::export_excel))
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(addr: &str, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Dashboard listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Dashboard stopped");
    Ok(())
}
