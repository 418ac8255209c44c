//! Local management endpoints under `/vault`.

use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::VaultError;
use crate::vault::permissions::PermissionRecord;
use crate::vault::types::{CategoryScope, ContextEntry, EntryFilter, Relationship};
use crate::vault::{AddEntry, SearchHit, Vault, VaultHealth};

/// Run a vault call on the blocking pool.
async fn blocking<T, F>(vault: Arc<Vault>, f: F) -> Result<T, VaultError>
where
    F: FnOnce(&Vault) -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&vault))
        .await
        .map_err(|e| VaultError::Internal(anyhow!("vault task failed: {e}")))?
}

pub async fn health(State(state): State<AppState>) -> Result<Json<VaultHealth>, VaultError> {
    blocking(state.vault, |v| v.health()).await.map(Json)
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(filter): Query<EntryFilter>,
) -> Result<Json<Vec<ContextEntry>>, VaultError> {
    blocking(state.vault, move |v| v.list_entries(&filter))
        .await
        .map(Json)
}

pub async fn add_entry(
    State(state): State<AppState>,
    Json(req): Json<AddEntry>,
) -> Result<impl IntoResponse, VaultError> {
    let outcome = blocking(state.vault, move |v| v.add_entry(req)).await?;
    let status = if outcome.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

#[derive(Serialize)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: ContextEntry,
    pub relationships: Vec<Relationship>,
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntryDetail>, VaultError> {
    blocking(state.vault, move |v| {
        Ok(EntryDetail {
            entry: v.get_entry(&id)?,
            relationships: v.relationships_for(&id)?,
        })
    })
    .await
    .map(Json)
}

pub async fn confirm_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContextEntry>, VaultError> {
    blocking(state.vault, move |v| v.confirm_entry(&id))
        .await
        .map(Json)
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, VaultError> {
    if params.q.trim().is_empty() {
        return Err(VaultError::InvalidInput("q must not be empty".into()));
    }
    let limit = params.limit.clamp(1, 100);
    blocking(state.vault, move |v| v.search_entries(&params.q, limit))
        .await
        .map(Json)
}

pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermissionRecord>>, VaultError> {
    blocking(state.vault, |v| v.list_permissions()).await.map(Json)
}

pub async fn set_permission(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Json(scope): Json<CategoryScope>,
) -> Result<StatusCode, VaultError> {
    blocking(state.vault, move |v| v.set_permission(&model, &scope)).await?;
    Ok(StatusCode::NO_CONTENT)
}
