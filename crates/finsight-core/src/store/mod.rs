//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only way the pipeline reaches stored
//! transaction payloads: a nearest-neighbour query returning
//! [`RetrievalHit`]s, and an upsert used by seeding. Backends:
//!
//! | Backend | Location |
//! |---------|----------|
//! | [`memory::InMemoryVectorStore`] | this crate (tests, offline use) |
//! | `PineconeStore` | `finsight` app crate (HTTP) |
//!
//! Implementations must be `Send + Sync`; the server shares one instance
//! across requests and treats it as read-only while serving.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RetrievalHit;

/// A vector plus the opaque text payload stored with it.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    /// JSON text of the form `{"transactions": {...}}`.
    pub text: String,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` records closest to `vector`, best first.
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>>;

    /// Insert or replace records by id.
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()>;
}
