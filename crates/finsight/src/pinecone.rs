//! Pinecone-backed [`VectorStore`].
//!
//! Talks to a single index through its data-plane host:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | query | `POST {host}/query` with `includeMetadata: true` |
//! | upsert | `POST {host}/vectors/upsert` |
//!
//! The transaction payload travels as the `text` metadata field. The API
//! key is read from `PINECONE_API_KEY` and sent as the `Api-Key` header.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use finsight_core::models::RetrievalHit;
use finsight_core::store::{VectorRecord, VectorStore};

use crate::config::StoreConfig;
use crate::http::{build_client, post_with_retry};

/// Pinecone rejects upserts larger than this many vectors.
const UPSERT_BATCH: usize = 100;

pub struct PineconeStore {
    host: String,
    index: String,
    namespace: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl PineconeStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let host = config
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow!("store.host required for Pinecone store"))?;
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| anyhow!("PINECONE_API_KEY environment variable not set"))?;
        Self::with_key(config, host, api_key)
    }

    /// Build a store with an explicit key instead of the environment.
    pub fn with_key(config: &StoreConfig, host: String, api_key: String) -> Result<Self> {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            namespace: config.namespace.clone(),
            api_key,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }

    fn check_index(&self, index: &str) -> Result<()> {
        if index != self.index {
            bail!(
                "Pinecone host serves index '{}', not '{}'",
                self.index,
                index
            );
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize, Deserialize)]
struct Metadata {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Metadata,
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>> {
        self.check_index(index)?;
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: &self.namespace,
        };
        let endpoint = format!("{}/query", self.host);
        let json = post_with_retry("Pinecone", self.max_retries, || {
            self.client
                .post(&endpoint)
                .header("Api-Key", &self.api_key)
                .json(&body)
        })
        .await?;

        let response: QueryResponse = serde_json::from_value(json)
            .map_err(|e| anyhow!("Invalid Pinecone query response: {}", e))?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| RetrievalHit {
                id: m.id,
                score: m.score,
                text: m.metadata.and_then(|md| md.text),
            })
            .collect())
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()> {
        self.check_index(index)?;
        let endpoint = format!("{}/vectors/upsert", self.host);

        for batch in records.chunks(UPSERT_BATCH) {
            let body = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|r| UpsertVector {
                        id: &r.id,
                        values: &r.values,
                        metadata: Metadata {
                            text: Some(r.text.clone()),
                        },
                    })
                    .collect(),
                namespace: &self.namespace,
            };
            post_with_retry("Pinecone", self.max_retries, || {
                self.client
                    .post(&endpoint)
                    .header("Api-Key", &self.api_key)
                    .json(&body)
            })
            .await?;
            tracing::debug!(count = batch.len(), "upserted vectors");
        }
        Ok(())
    }
}
