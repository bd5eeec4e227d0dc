//! # Finsight
//!
//! Ask questions about your transactions in plain language and get back
//! either a written summary or chart-ready data.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Seed JSON │──▶│  Embedding  │──▶│ Vector store │
//! └───────────┘   └─────────────┘   │ memory / PC  │
//!                                   └──────┬───────┘
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │ ask/chart│       │ /query … │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! The request pipeline itself (extraction, filtering, grouping, chart
//! assembly) lives in `finsight-core`; this crate supplies configuration,
//! the HTTP clients behind the core traits, seeding, the server and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`llm`] | Chat-completion client for chart parameters and summaries |
//! | [`pinecone`] | Pinecone vector store |
//! | [`seed`] | One-time store seeding |
//! | [`service`] | Collaborator wiring and CLI runners |
//! | [`server`] | HTTP server |

pub mod config;
pub mod embedding;
mod http;
pub mod llm;
pub mod pinecone;
pub mod seed;
pub mod server;
pub mod service;
