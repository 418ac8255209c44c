//! Ollama-compatible HTTP proxy.
//!
//! `/api/generate` and `/api/chat` are intercepted for context injection and learning.
//! `/vault/*` exposes local management. Every other path is relayed to the backend
//! unchanged.

pub mod admin;
pub mod backend;
pub mod generate;
pub mod learn_queue;
pub mod ollama;
pub mod relay;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::VaultConfig;
use crate::vault::Vault;
use backend::Backend;
use learn_queue::LearnQueue;

/// Request bodies may carry base64 images for multimodal models.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    pub backend: Arc<Backend>,
    pub learner: LearnQueue,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Intercepted inference
        .route("/api/generate", post(generate::generate))
        .route("/api/chat", post(generate::chat))
        // Management
        .route("/vault/health", get(admin::health))
        .route("/vault/entries", get(admin::list_entries).post(admin::add_entry))
        .route("/vault/entries/{id}", get(admin::get_entry))
        .route("/vault/entries/{id}/confirm", post(admin::confirm_entry))
        .route("/vault/search", get(admin::search))
        .route("/vault/permissions", get(admin::list_permissions))
        .route("/vault/permissions/{model}", put(admin::set_permission))
        // Everything else goes straight to the backend
        .fallback(generate::passthrough)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Open the vault, start the learner and serve until ctrl-c.
pub async fn serve(config: VaultConfig) -> Result<()> {
    let config = Arc::new(config);

    let vault = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Vault::open(config))
            .await
            .context("vault open task failed")??
    };
    let vault = Arc::new(vault);
    info!(
        db = %config.resolved_db_path().display(),
        backend = vault.index().name(),
        "vault ready"
    );

    let backend = Arc::new(Backend::new(&config.backend)?);
    let (learner, worker) = if config.learning.enabled {
        let (queue, worker) = LearnQueue::start(vault.clone(), config.learning.queue_capacity);
        (queue, Some(worker))
    } else {
        info!("learning disabled");
        (LearnQueue::disabled(), None)
    };

    let state = AppState {
        vault,
        backend: backend.clone(),
        learner,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!(
        addr = %config.server.listen,
        upstream = %backend.base_url(),
        "proxy listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutting down proxy");
        })
        .await?;

    // The router held the last queue senders; wait for pending exchanges.
    if let Some(worker) = worker {
        if let Err(e) = worker.await {
            warn!(error = %e, "learning worker ended abnormally");
        }
    }
    Ok(())
}
