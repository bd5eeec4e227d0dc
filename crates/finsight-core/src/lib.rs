//! # Finsight Core
//!
//! Runtime-agnostic logic for Finsight: transaction models, record
//! extraction, relevance filtering, grouping, chart assembly, and the
//! traits through which the application reaches its external services
//! (embedding model, generation model, vector store).
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! `finsight` app crate supplies concrete providers.
//!
//! ## Pipeline
//!
//! ```text
//! hits ──▶ extract ──▶ filter ──▶ group ──▶ chart
//!                        ▲
//!                 ChartParams (model)
//! ```

pub mod chart;
pub mod embedding;
pub mod extract;
pub mod filter;
pub mod generation;
pub mod group;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod summary;
