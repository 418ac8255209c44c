mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};

use contextvault::config::{BackendConfig, VaultConfig};
use contextvault::db;
use contextvault::proxy::backend::Backend;
use contextvault::proxy::learn_queue::LearnQueue;
use contextvault::proxy::{self, AppState};
use contextvault::vault::types::{Category, CategoryScope, EntryFilter};
use contextvault::vault::Vault;
use helpers::{seed_entries, test_vault, BrokenIndex, Seed};

/// Echoes the prompt it received back as the model output.
async fn mock_generate(Json(body): Json<Value>) -> Response {
    let model = body["model"].clone();
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    if prompt.contains("slow") {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(true);
    if streaming && (prompt.contains("abort") || prompt.contains("stall")) {
        let first = format!("{}\n", json!({"model": model, "response": prompt, "done": false}));
        let done = format!("{}\n", json!({"model": model, "response": "", "done": true}));
        let abort = prompt.contains("abort");
        let chunks = futures_util::stream::once(async move { Ok(Bytes::from(first)) }).chain(
            futures_util::stream::once(async move {
                if abort {
                    return Err(std::io::Error::other("backend crashed"));
                }
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(Bytes::from(done))
            }),
        );
        return (
            [(header::CONTENT_TYPE, "application/x-ndjson")],
            Body::from_stream(chunks),
        )
            .into_response();
    }
    if streaming {
        let lines = format!(
            "{}\n{}\n",
            json!({"model": model, "response": prompt, "done": false}),
            json!({"model": model, "response": "", "done": true}),
        );
        ([(header::CONTENT_TYPE, "application/x-ndjson")], lines).into_response()
    } else {
        Json(json!({"model": model, "response": prompt, "done": true})).into_response()
    }
}

async fn mock_chat(Json(body): Json<Value>) -> Json<Value> {
    let last_user = body["messages"]
        .as_array()
        .and_then(|m| m.iter().rev().find(|m| m["role"] == "user"))
        .map(|m| m["content"].clone())
        .unwrap_or(Value::Null);
    Json(json!({
        "model": body["model"],
        "message": {"role": "assistant", "content": last_user},
        "done": true
    }))
}

async fn mock_tags() -> Json<Value> {
    Json(json!({"models": [{"name": "llama3:8b"}]}))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_backend() -> String {
    spawn(
        Router::new()
            .route("/api/generate", post(mock_generate))
            .route("/api/chat", post(mock_chat))
            .route("/api/tags", get(mock_tags)),
    )
    .await
}

/// A loopback address nothing listens on.
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn spawn_proxy(vault: Vault, backend_url: &str, timeout_secs: u64) -> (String, Arc<Vault>) {
    let vault = Arc::new(vault);
    let backend = Backend::new(&BackendConfig {
        url: backend_url.to_string(),
        timeout_secs,
        connect_timeout_secs: 2,
    })
    .unwrap();
    let (learner, _worker) = LearnQueue::start(vault.clone(), 8);
    let state = AppState {
        vault: vault.clone(),
        backend: Arc::new(backend),
        learner,
    };
    (spawn(proxy::router(state)).await, vault)
}

fn cat_vault() -> Vault {
    let vault = test_vault();
    helpers::add(&vault, "I have two cats named Luna and Pixel");
    vault
}

async fn generate(proxy: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{proxy}/api/generate"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn permitted_model_receives_context() {
    let backend = spawn_backend().await;
    let vault = cat_vault();
    vault.set_permission("llama3", &CategoryScope::AllowAll).unwrap();
    let (proxy, _) = spawn_proxy(vault, &backend, 30).await;

    let resp = generate(
        &proxy,
        json!({"model": "llama3:8b", "prompt": "What pets do I have?", "stream": false}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    let seen = body["response"].as_str().unwrap();
    assert!(seen.starts_with("[User context]\n"), "{seen}");
    assert!(seen.contains("- I have two cats named Luna and Pixel\n"));
    assert!(seen.ends_with("[End of user context]\n\nWhat pets do I have?"));
    assert_eq!(body["model"], "llama3:8b");
}

#[tokio::test]
async fn model_without_permission_gets_prompt_untouched() {
    let backend = spawn_backend().await;
    let (proxy, _) = spawn_proxy(cat_vault(), &backend, 30).await;

    let resp = generate(
        &proxy,
        json!({"model": "mistral", "prompt": "What pets do I have?", "stream": false}),
    )
    .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "What pets do I have?");
}

#[tokio::test]
async fn scope_restricts_injected_categories() {
    let backend = spawn_backend().await;
    let vault = cat_vault();
    let prefs = CategoryScope::Categories([Category::Preference].into_iter().collect());
    vault.set_permission("llama3", &prefs).unwrap();
    let (proxy, _) = spawn_proxy(vault, &backend, 30).await;

    let resp = generate(
        &proxy,
        json!({"model": "llama3", "prompt": "What pets do I have?", "stream": false}),
    )
    .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "What pets do I have?");
}

#[tokio::test]
async fn chat_injects_into_last_user_message() {
    let backend = spawn_backend().await;
    let vault = cat_vault();
    vault.set_permission("*", &CategoryScope::AllowAll).unwrap();
    let (proxy, _) = spawn_proxy(vault, &backend, 30).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .json(&json!({
            "model": "llama3",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "What pets do I have?"}
            ]
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let seen = body["message"]["content"].as_str().unwrap();
    assert!(seen.contains("Luna and Pixel"));
    assert!(seen.ends_with("What pets do I have?"));
}

#[tokio::test]
async fn retrieval_failure_forwards_original_request() {
    let backend = spawn_backend().await;
    let mut conn = db::open_memory_database().unwrap();
    seed_entries(
        &mut conn,
        &[Seed::new("I have two cats named Luna and Pixel", Category::Personal)],
    );
    let vault = Vault::with_parts(conn, Arc::new(BrokenIndex), Arc::new(VaultConfig::default()))
        .unwrap();
    vault.set_permission("*", &CategoryScope::AllowAll).unwrap();
    let (proxy, _) = spawn_proxy(vault, &backend, 30).await;

    let resp = generate(
        &proxy,
        json!({"model": "llama3", "prompt": "What pets do I have?", "stream": false}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "What pets do I have?");
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    let backend = closed_port_url().await;
    let (proxy, _) = spawn_proxy(test_vault(), &backend, 30).await;

    let resp = generate(&proxy, json!({"model": "llama3", "prompt": "Hello"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("backend unavailable"));
}

#[tokio::test]
async fn slow_backend_is_gateway_timeout() {
    let backend = spawn_backend().await;
    let (proxy, _) = spawn_proxy(test_vault(), &backend, 1).await;

    let resp = generate(
        &proxy,
        json!({"model": "llama3", "prompt": "be slow", "stream": false}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn streamed_exchange_is_relayed_and_learned() {
    let backend = spawn_backend().await;
    let (proxy, vault) = spawn_proxy(test_vault(), &backend, 30).await;

    let prompt = "I live in Denver. Any hiking tips?";
    let resp = generate(&proxy, json!({"model": "llama3", "prompt": prompt})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let text = resp.text().await.unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["response"], prompt);
    assert_eq!(lines[1]["done"], true);

    let mut learned = Vec::new();
    for _ in 0..50 {
        learned = vault.list_entries(&EntryFilter::default()).unwrap();
        if !learned.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].content, "I live in Denver");
}

#[tokio::test]
async fn stream_broken_by_backend_is_not_learned() {
    let backend = spawn_backend().await;
    let (proxy, vault) = spawn_proxy(test_vault(), &backend, 30).await;

    let resp = generate(
        &proxy,
        json!({"model": "llama3", "prompt": "I live in Lisbon. Please abort."}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    // the body ends in a transport error or a truncated stream
    let _ = resp.text().await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(vault.list_entries(&EntryFilter::default()).unwrap().is_empty());
}

#[tokio::test]
async fn caller_disconnect_mid_stream_is_not_learned() {
    let backend = spawn_backend().await;
    let (proxy, vault) = spawn_proxy(test_vault(), &backend, 30).await;

    let mut resp = generate(
        &proxy,
        json!({"model": "llama3", "prompt": "I live in Lisbon. Please stall."}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = resp.chunk().await.unwrap().unwrap();
    let line: Value = serde_json::from_slice(first.trim_ascii_end()).unwrap();
    assert_eq!(line["done"], false);
    drop(resp);

    // past the point where the backend would have finished
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(vault.list_entries(&EntryFilter::default()).unwrap().is_empty());
}

#[tokio::test]
async fn malformed_request_is_forwarded_verbatim() {
    let backend = spawn_backend().await;
    let (proxy, vault) = spawn_proxy(test_vault(), &backend, 30).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/generate"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    // the backend's own rejection comes back unchanged
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(vault.list_entries(&EntryFilter::default()).unwrap().is_empty());
}

#[tokio::test]
async fn other_paths_are_relayed() {
    let backend = spawn_backend().await;
    let (proxy, _) = spawn_proxy(test_vault(), &backend, 30).await;

    let body: Value = reqwest::get(format!("{proxy}/api/tags"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["models"][0]["name"], "llama3:8b");

    let missing = reqwest::get(format!("{proxy}/api/nothing-here")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_manage_the_vault() {
    let backend = spawn_backend().await;
    let (proxy, _) = spawn_proxy(test_vault(), &backend, 30).await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{proxy}/vault/entries"))
        .json(&json!({"content": "I like jazz", "tags": ["music"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["entry"]["category"], "preference");
    let id = created["entry"]["id"].as_str().unwrap().to_string();

    let again = client
        .post(format!("{proxy}/vault/entries"))
        .json(&json!({"content": "I like jazz"}))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::OK);

    let hits: Value = client
        .get(format!("{proxy}/vault/search?q=jazz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits[0]["id"], id.as_str());
    assert!(hits[0]["similarity"].as_f64().unwrap() > 0.0);

    let listed: Value = client
        .get(format!("{proxy}/vault/entries?category=preference"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let put = client
        .put(format!("{proxy}/vault/permissions/llama3"))
        .json(&json!({"mode": "categories", "categories": ["preference", "goal"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::NO_CONTENT);

    let perms: Value = client
        .get(format!("{proxy}/vault/permissions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(perms[0]["model_id"], "llama3");
    assert_eq!(perms[0]["mode"], "categories");

    let health: Value = client
        .get(format!("{proxy}/vault/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["stats"]["active_entries"], 1);

    let missing = client
        .get(format!("{proxy}/vault/entries/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let empty = client
        .post(format!("{proxy}/vault/entries"))
        .json(&json!({"content": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}
