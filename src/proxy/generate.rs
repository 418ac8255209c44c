//! Interception of `/api/generate` and `/api/chat`.
//!
//! ```text
//! Idle -> PermissionCheck -> Retrieving -> Injecting -> Forwarding -> Streaming -> Done
//!                                                           |             |
//!                                                           +--> Error <--+
//! ```
//!
//! Any failure before `Forwarding` degrades to forwarding the caller's request bytes
//! untouched. Only backend failures surface to the caller.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::learn_queue::Exchange;
use super::ollama::{self, Endpoint};
use super::relay::RelayStream;
use super::AppState;
use crate::error::VaultError;
use crate::vault::injector;
use crate::vault::types::CategoryScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    PermissionCheck,
    Retrieving,
    Injecting,
    Forwarding,
    Streaming,
    Done,
    Error,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PermissionCheck => "permission_check",
            Self::Retrieving => "retrieving",
            Self::Injecting => "injecting",
            Self::Forwarding => "forwarding",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

/// Phase tracker for one intercepted request.
pub struct Lifecycle {
    id: u64,
    phase: RequestPhase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            id: REQUEST_SEQ.fetch_add(1, Ordering::Relaxed),
            phase: RequestPhase::Idle,
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn advance(&mut self, next: RequestPhase) {
        debug!(request = self.id, from = %self.phase, to = %next, "request phase");
        self.phase = next;
    }

    pub fn fail(&mut self, err: &VaultError) {
        warn!(request = self.id, phase = %self.phase, error = %err, "request failed");
        self.phase = RequestPhase::Error;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn generate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    intercept(state, Endpoint::Generate, headers, body).await
}

pub async fn chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    intercept(state, Endpoint::Chat, headers, body).await
}

/// What the request looked like before any context was added.
struct Parsed {
    json: Value,
    model: String,
    prompt: String,
    streaming: bool,
}

fn parse(endpoint: Endpoint, body: &Bytes) -> Option<Parsed> {
    let json: Value = serde_json::from_slice(body).ok()?;
    if !json.is_object() {
        return None;
    }
    let model = ollama::model(&json)?.to_string();
    let prompt = ollama::extract_prompt(endpoint, &json)?;
    let streaming = ollama::is_streaming(&json);
    Some(Parsed {
        json,
        model,
        prompt,
        streaming,
    })
}

/// Resolve the caller's scope and render context. `None` means forward untouched.
async fn retrieve_context(state: &AppState, lifecycle: &mut Lifecycle, parsed: &Parsed) -> Option<String> {
    lifecycle.advance(RequestPhase::PermissionCheck);
    let vault = state.vault.clone();
    let model = parsed.model.clone();
    let scope = match tokio::task::spawn_blocking(move || vault.allowed_scope(&model)).await {
        Ok(Ok(scope)) => scope,
        Ok(Err(e)) => {
            warn!(model = %parsed.model, error = %e, "permission lookup failed, no context injected");
            CategoryScope::DenyAll
        }
        Err(e) => {
            warn!(error = %e, "permission task failed");
            CategoryScope::DenyAll
        }
    };
    if scope.is_empty() {
        debug!(model = %parsed.model, "model has no context permissions");
        return None;
    }

    lifecycle.advance(RequestPhase::Retrieving);
    let vault = state.vault.clone();
    let prompt = parsed.prompt.clone();
    let retrieval = match tokio::task::spawn_blocking(move || vault.retrieve(&prompt, &scope)).await {
        Ok(Ok(retrieval)) => retrieval,
        Ok(Err(e)) => {
            warn!(model = %parsed.model, error = %e, "retrieval failed, forwarding unmodified");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "retrieval task failed, forwarding unmodified");
            return None;
        }
    };
    if retrieval.context.is_empty() {
        return None;
    }
    debug!(
        model = %parsed.model,
        entries = retrieval.context.included,
        "injecting context"
    );
    Some(injector::inject(&retrieval.context, &parsed.prompt))
}

async fn intercept(state: AppState, endpoint: Endpoint, headers: HeaderMap, body: Bytes) -> Response {
    let mut lifecycle = Lifecycle::new();

    let parsed = parse(endpoint, &body);
    let mut outgoing = body.clone();
    if let Some(parsed) = &parsed {
        if let Some(prompt) = retrieve_context(&state, &mut lifecycle, parsed).await {
            lifecycle.advance(RequestPhase::Injecting);
            let mut json = parsed.json.clone();
            if ollama::replace_prompt(endpoint, &mut json, prompt) {
                match serde_json::to_vec(&json) {
                    Ok(bytes) => outgoing = Bytes::from(bytes),
                    Err(e) => warn!(error = %e, "could not re-encode request, forwarding unmodified"),
                }
            }
        }
    } else {
        debug!(path = endpoint.path(), "request not interceptable, forwarding unmodified");
    }

    lifecycle.advance(RequestPhase::Forwarding);
    let response = match state
        .backend
        .send(Method::POST, endpoint.path(), &headers, outgoing)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            lifecycle.fail(&e);
            return e.into_response();
        }
    };

    lifecycle.advance(RequestPhase::Streaming);
    let learnable = response.status().is_success() && state.learner.is_enabled();
    let capture = parsed.filter(|_| learnable);

    let status = response.status();
    let upstream_headers = response.headers().clone();
    let stream = response.bytes_stream();
    let relay = match capture {
        Some(parsed) => {
            let learner = state.learner.clone();
            RelayStream::capturing(stream, move |body| {
                lifecycle.advance(RequestPhase::Done);
                match ollama::collect_response(endpoint, &body, parsed.streaming) {
                    Some(response) => {
                        learner.submit(Exchange {
                            model: parsed.model,
                            prompt: parsed.prompt,
                            response,
                        });
                    }
                    None => debug!("incomplete response, not learned"),
                }
            })
        }
        None => RelayStream::passthrough(stream),
    };

    relay_response(status, &upstream_headers, relay)
}

/// Build the caller-facing response around a relayed body.
pub(crate) fn relay_response(
    status: axum::http::StatusCode,
    upstream: &HeaderMap,
    relay: RelayStream,
) -> Response {
    let mut builder = Response::builder().status(status);
    for (name, value) in upstream {
        if super::backend::is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from_stream(relay))
        .unwrap_or_else(|e| VaultError::Internal(anyhow::anyhow!(e)).into_response())
}

/// Relay any request the proxy does not intercept.
pub async fn passthrough(
    State(state): State<AppState>,
    method: Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    match state.backend.send(method, &path, &headers, body).await {
        Ok(response) => {
            let status = response.status();
            let upstream = response.headers().clone();
            relay_response(status, &upstream, RelayStream::passthrough(response.bytes_stream()))
        }
        Err(e) => {
            warn!(path = %path, error = %e, "passthrough failed");
            e.into_response()
        }
    }
}
