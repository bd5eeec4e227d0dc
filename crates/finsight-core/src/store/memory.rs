//! In-memory [`VectorStore`] implementation for testing and offline use.
//!
//! Uses a `HashMap` of index name → records behind `std::sync::RwLock`.
//! Queries are brute-force cosine similarity over every record in the
//! index.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::RetrievalHit;

use super::{VectorRecord, VectorStore};

/// In-memory vector store.
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records stored in `index`.
    pub fn len(&self, index: &str) -> usize {
        self.indexes
            .read()
            .map(|guard| guard.get(index).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>> {
        let guard = self
            .indexes
            .read()
            .map_err(|_| anyhow!("in-memory vector store lock poisoned"))?;
        let Some(records) = guard.get(index) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<RetrievalHit> = records
            .iter()
            .map(|r| RetrievalHit {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.values) as f64,
                text: Some(r.text.clone()),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()> {
        let mut guard = self
            .indexes
            .write()
            .map_err(|_| anyhow!("in-memory vector store lock poisoned"))?;
        let stored = guard.entry(index.to_string()).or_default();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }
}
