//! The two request paths, wired over the collaborator traits.
//!
//! ```text
//! summary:        embed → query → extract → relevance filter → render → complete
//! visualization:  embed → query → extract → chart params → filter → group → assemble
//! ```
//!
//! Both paths are linear: the external calls run sequentially and any
//! failure aborts the request with a [`PipelineError`]. Everything after
//! retrieval is synchronous and touches only request-local data.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::chart::{assemble_chart, ChartOutcome, ChartSettings};
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::extract::extract_transactions;
use crate::filter::{filter_for_summary, FilterSettings};
use crate::generation::{ChartParamRequest, ChartParameterSelector, SummaryGenerator};
use crate::models::{QueryContext, Totals, Transaction};
use crate::store::VectorStore;
use crate::summary::{build_prompt, render_context, NO_TRANSACTIONS_MESSAGE, SYSTEM_PROMPT};

/// Request-level failure. The HTTP layer maps each variant to a status.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),
    #[error("chart parameter selection failed: {0:#}")]
    ChartParameters(anyhow::Error),
    #[error("summary generation failed: {0:#}")]
    Completion(anyhow::Error),
}

/// Tuning for both paths, decoupled from application config.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Vector index holding transaction payloads.
    pub index: String,
    /// Nearest neighbours fetched per query.
    pub top_k: usize,
    /// Records sent to the chart-parameter model.
    pub sample_size: usize,
    pub filter: FilterSettings,
    pub chart: ChartSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            index: "transactions".to_string(),
            top_k: 20,
            sample_size: 5,
            filter: FilterSettings::default(),
            chart: ChartSettings::default(),
        }
    }
}

/// Summary path response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Shared read-only collaborators for one request.
pub struct Pipeline<'a> {
    pub store: &'a dyn VectorStore,
    pub embedder: &'a dyn EmbeddingProvider,
    pub settings: &'a PipelineSettings,
}

impl Pipeline<'_> {
    /// Embed the query, fetch neighbours, and extract records.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Transaction>, PipelineError> {
        let vector = embed_query(self.embedder, query)
            .await
            .map_err(PipelineError::Retrieval)?;
        let hits = self
            .store
            .query(&self.settings.index, &vector, self.settings.top_k)
            .await
            .map_err(PipelineError::Retrieval)?;
        let records = extract_transactions(&hits);
        tracing::info!(
            hits = hits.len(),
            records = records.len(),
            "retrieved transactions"
        );
        Ok(records)
    }

    /// Summary path.
    pub async fn summarize(
        &self,
        generator: &dyn SummaryGenerator,
        query: &str,
    ) -> Result<SummaryResponse, PipelineError> {
        let query = non_blank(query)?;
        let records = self.retrieve(query).await?;

        let context = QueryContext::new(query);
        let relevant = filter_for_summary(records, &context, &self.settings.filter);

        let Some(rendered) = render_context(&relevant) else {
            tracing::info!("no usable transactions for summary");
            return Ok(SummaryResponse {
                summary: NO_TRANSACTIONS_MESSAGE.to_string(),
            });
        };

        let summary = generator
            .summarize(SYSTEM_PROMPT, &build_prompt(query, &rendered))
            .await
            .map_err(PipelineError::Completion)?;
        Ok(SummaryResponse { summary })
    }

    /// Visualization path.
    pub async fn visualize(
        &self,
        selector: &dyn ChartParameterSelector,
        query: &str,
    ) -> Result<ChartOutcome, PipelineError> {
        let query = non_blank(query)?;
        let records = self.retrieve(query).await?;
        if records.is_empty() {
            return Ok(ChartOutcome::no_data());
        }

        let sample_len = self.settings.sample_size.min(records.len());
        let request = ChartParamRequest {
            query,
            sample: &records[..sample_len],
            totals: Totals::from_records(&records),
        };
        let params = selector
            .select(&request)
            .await
            .map_err(PipelineError::ChartParameters)?;
        params.validate().map_err(PipelineError::ChartParameters)?;

        tracing::info!(
            chart = ?params.visualization_type,
            grouping = %params.data_grouping,
            filter = ?params.filter_type,
            "selected chart parameters"
        );

        let mut rng = StdRng::from_entropy();
        Ok(assemble_chart(
            records,
            &params,
            &QueryContext::new(query),
            &self.settings.filter,
            &self.settings.chart,
            &mut rng,
        ))
    }
}

fn non_blank(query: &str) -> Result<&str, PipelineError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(PipelineError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}
