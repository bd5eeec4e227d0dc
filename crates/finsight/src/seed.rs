//! One-time seeding of the vector store from a JSON transaction file.
//!
//! # File format
//!
//! ```json
//! { "users": [ { "userGuid": "u-1", "transactions": { "t1": { ... } } } ] }
//! ```
//!
//! or a single bare `{ "transactions": { ... } }` object. `transactions`
//! may also be an array.
//!
//! # Documents
//!
//! Each user's transactions are split into documents of `batch_size`
//! records. A document's text is `{"transactions": {...}}`, the same shape
//! the extractor reads back. Its id is the SHA-256 hex digest of that text,
//! so seeding the same file twice overwrites instead of duplicating.
//!
//! # Lifecycle
//!
//! [`SeedState::ensure_seeded`] runs once at process start, before the
//! listener is bound. It takes `&mut self`, so nothing can query the store
//! concurrently with it; later calls are no-ops.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

use finsight_core::embedding::{check_dims, EmbeddingProvider};
use finsight_core::store::{VectorRecord, VectorStore};

/// Documents embedded per provider call.
const EMBED_BATCH: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Users { users: Vec<SeedUser> },
    Single(SeedUser),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    #[serde(default, alias = "user_guid")]
    user_guid: Option<String>,
    transactions: Value,
}

/// A document ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedDocument {
    pub id: String,
    pub text: String,
    pub transactions: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub documents: usize,
    pub transactions: usize,
}

/// Tracks whether this process has already seeded its store.
#[derive(Debug, Default)]
pub struct SeedState {
    seeded: bool,
}

impl SeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Embed and upsert every document from `path`, once.
    ///
    /// Returns `None` when this state has already seeded.
    pub async fn ensure_seeded(
        &mut self,
        path: &Path,
        batch_size: usize,
        index: &str,
        embedder: &dyn EmbeddingProvider,
        store: &dyn VectorStore,
    ) -> Result<Option<SeedReport>> {
        if self.seeded {
            tracing::debug!("seed data already loaded");
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        let documents = build_documents(&content, batch_size)
            .with_context(|| format!("Invalid seed file: {}", path.display()))?;

        let report = upsert_documents(&documents, index, embedder, store).await?;
        self.seeded = true;
        tracing::info!(
            documents = report.documents,
            transactions = report.transactions,
            index,
            model = embedder.model_name(),
            "seeded vector store"
        );
        Ok(Some(report))
    }
}

/// Parse a seed file and split it into documents.
pub fn build_documents(content: &str, batch_size: usize) -> Result<Vec<SeedDocument>> {
    if batch_size == 0 {
        bail!("seed batch size must be >= 1");
    }
    let file: SeedFile = serde_json::from_str(content)?;
    let users = match file {
        SeedFile::Users { users } => users,
        SeedFile::Single(user) => vec![user],
    };

    let mut documents = Vec::new();
    for user in users {
        let entries = user_entries(user)?;
        for chunk in entries.chunks(batch_size) {
            let transactions: Map<String, Value> = chunk.iter().cloned().collect();
            let text = serde_json::json!({ "transactions": transactions }).to_string();
            documents.push(SeedDocument {
                id: content_id(&text),
                text,
                transactions: chunk.len(),
            });
        }
    }
    Ok(documents)
}

/// Keyed transactions for one user, tagged with the user's guid.
fn user_entries(user: SeedUser) -> Result<Vec<(String, Value)>> {
    let entries: Vec<(String, Value)> = match user.transactions {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => bail!("transactions must be an object or array, got {}", other),
    };

    Ok(entries
        .into_iter()
        .map(|(key, mut value)| {
            if let (Some(guid), Value::Object(obj)) = (&user.user_guid, &mut value) {
                obj.entry("userGuid")
                    .or_insert_with(|| Value::String(guid.clone()));
            }
            (key, value)
        })
        .collect())
}

fn content_id(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

async fn upsert_documents(
    documents: &[SeedDocument],
    index: &str,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for batch in documents.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .context("Failed to embed seed documents")?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} documents",
                vectors.len(),
                batch.len()
            );
        }
        for vector in &vectors {
            check_dims(embedder, vector).context("Seed embedding has the wrong width")?;
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(doc, values)| VectorRecord {
                id: doc.id.clone(),
                values,
                text: doc.text.clone(),
            })
            .collect();
        store
            .upsert(index, &records)
            .await
            .context("Failed to upsert seed documents")?;

        report.documents += batch.len();
        report.transactions += batch.iter().map(|d| d.transactions).sum::<usize>();
    }
    Ok(report)
}
