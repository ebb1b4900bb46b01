//! HTTP surface: answer stream, pages and the contact form.

pub mod chat;
pub mod contact;
pub mod pages;

use crate::config::SiteConfig;
use crate::context::ContextDocument;
use crate::provider::SharedProvider;
use crate::render::Templates;
use crate::store::SqliteStore;
use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Everything handlers need, built once at startup and never mutated.
pub struct AppState {
    pub site: SiteConfig,
    pub context: ContextDocument,
    /// `None` when no provider credential is configured.
    pub provider: Option<SharedProvider>,
    pub templates: Templates,
    pub store: SqliteStore,
    pub static_dir: PathBuf,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(pages::landing))
        .route("/resume", get(pages::resume))
        .route("/contact", post(contact::submit))
        .route("/ask-stream", post(chat::ask_stream))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, "portfolio server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
