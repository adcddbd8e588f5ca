//! # newsrag
//!
//! A retrieval-augmented question answering service for news archives
//! and uploaded PDFs.
//!
//! Documents are deduplicated by content hash, split into semantically
//! coherent chunks, embedded, and upserted into a namespaced vector
//! index; questions are answered by retrieving the nearest chunks and
//! conditioning a language model on them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ Feeds / PDFs │──▶│   Pipeline     │──▶│ Record store │
//! └──────────────┘   │ Chunk + Embed │   │   (SQLite)   │
//!                    └──────┬────────┘   └──────────────┘
//!                           ▼
//!                    ┌──────────────┐    ┌──────────────┐
//!                    │ Vector index │◀──▶│   Answerer    │◀── questions
//!                    │ (namespaced) │    │ retrieve+LLM │
//!                    └──────────────┘    └──────────────┘
//! ```
//!
//! Ingestion flows one way (source text → record store → chunker →
//! vector index → flag update); querying flows one way (question →
//! vector index → language model → answer). The two flows share the
//! stores as data, not control.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Record store abstraction (SQLite + in-memory) |
//! | [`chunker`] | Embedding-similarity chunking |
//! | [`index`] | Vector index client and batched upsert |
//! | [`embedding`] | Embedding client |
//! | [`generation`] | Language model client |
//! | [`pipeline`] | Ingestion orchestration and consistency contract |
//! | [`answer`] | Retrieval-augmented answering |
//! | [`server`] | HTTP API |
//! | [`extract`] | PDF text extraction |
//! | [`context`] | Startup wiring |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunker;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod store;
