//! Personal context memory for local LLMs.
//!
//! ContextVault sits between a client and an Ollama server as a drop-in proxy. Before a
//! prompt reaches the model it looks up stored facts about the user, picks the most
//! useful ones within a size budget and prepends them as a context block. After the
//! model answers it extracts new facts from the exchange and stores them at low
//! confidence, resolving contradictions with what is already known.
//!
//! | Category | Example |
//! |----------|---------|
//! | **personal** | I live in Seattle |
//! | **preference** | I like jazz |
//! | **goal** | I want to run a marathon |
//! | **relationship** | My sister is a nurse |
//! | **skill** | I'm learning Rust |
//! | **project** | I'm building a home weather station |
//! | **event** | I graduated in 2019 |
//! | **note** | anything else |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) with an append-only audit log
//! - **Similarity**: TF-IDF by default, or local ONNX embeddings (all-MiniLM-L6-v2)
//! - **Selection**: weighted relevance, recency, confidence and frequency with a
//!   diversity penalty per category
//! - **Access control**: per-model category scopes, deny by default
//! - **Transport**: Ollama HTTP API (`/api/generate`, `/api/chat`), everything else relayed
//!
//! # Modules
//!
//! - [`config`]: TOML configuration and environment overrides
//! - [`db`]: SQLite initialization, schema, migrations and health checks
//! - [`embedding`]: text-to-vector pipeline for the dense backend
//! - [`similarity`]: lexical and dense similarity indexes
//! - [`vault`]: entry store, scorer, conflict resolver, learner and injector
//! - [`proxy`]: the HTTP proxy and management routes
//! - [`cli`]: terminal commands

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod proxy;
pub mod similarity;
pub mod vault;
