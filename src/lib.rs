//! Engram — a local, single-node memory store for AI coding agents.
//!
//! Engram persists short textual memories in a single SQLite file and returns
//! ranked memories for natural-language queries. The same operations are
//! exposed over two transports: an MCP tool server on stdio (for agent
//! harnesses) and an HTTP/JSON API (for plugins and the CLI).
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) with an FTS5 index kept in sync by triggers
//! - **Embeddings**: local ONNX Runtime with bge-small-en-v1.5 (384 dimensions)
//! - **Retrieval**: semantic cosine ranking with FTS keyword fallback and a
//!   time-decay relevance model computed at query time
//! - **Writes**: scoped, idempotent, with create-or-replace upserts
//!
//! # Modules
//!
//! - [`config`] — TOML config file plus `ENGRAM_*` environment overrides
//! - [`db`] — database initialization, schema, and additive migrations
//! - [`embedding`] — text-to-vector pipeline with a process-wide lazy handle
//! - [`memory`] — the memory core: store, recall, remember, forget, decay
//! - [`capabilities`] — runtime feature-flag view
//! - [`error`] — typed error taxonomy

pub mod capabilities;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
