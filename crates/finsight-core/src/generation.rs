//! Traits for the two language-model calls and the prompt material they
//! share.
//!
//! - [`ChartParameterSelector`]: structured generation of [`ChartParams`]
//!   from the query, a bounded record sample, and running totals.
//! - [`SummaryGenerator`]: free-text answer for the summary path.
//!
//! The app crate implements both over an OpenAI-compatible chat endpoint.
//! Tests implement them with fixed responses.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{ChartParams, Totals, Transaction};

/// Everything the chart-parameter model sees for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartParamRequest<'a> {
    pub query: &'a str,
    /// Leading slice of the extracted records, never the full set.
    pub sample: &'a [Transaction],
    pub totals: Totals,
}

#[async_trait]
pub trait ChartParameterSelector: Send + Sync {
    /// Choose chart parameters. Malformed output must be an error; callers
    /// do not retry.
    async fn select(&self, request: &ChartParamRequest<'_>) -> Result<ChartParams>;
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, system: &str, prompt: &str) -> Result<String>;
}

pub const CHART_SYSTEM_PROMPT: &str = "You design charts for personal finance questions. \
Given a question, a sample of the user's transactions and running totals, choose the chart \
type, how to group the data (by_category, by_merchant, by_type, by_month, by_date or \
by_description), which transactions to keep, a short title, axis labels, hex colors, and \
optional keywords that identify the transactions the question is about.";

/// User message for the chart-parameter call.
pub fn chart_prompt(request: &ChartParamRequest<'_>) -> Result<String> {
    let sample = serde_json::to_string_pretty(request.sample)?;
    Ok(format!(
        "Question: {}\n\nTotals: {} transactions, income {:.2}, expenses {:.2}\n\n\
         Sample transactions:\n{}",
        request.query.trim(),
        request.totals.count,
        request.totals.income,
        request.totals.expenses,
        sample
    ))
}

/// JSON Schema for [`ChartParams`], in the strict form accepted by
/// structured-output endpoints (every property required, no extras).
pub fn chart_params_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "visualizationType": {
                "type": "string",
                "enum": ["bar", "line", "pie", "area", "scatter", "donut"]
            },
            "dataGrouping": { "type": "string" },
            "filterType": {
                "type": "string",
                "enum": ["all", "income_only", "expenses_only", "recurring_only", "query_specific"]
            },
            "title": { "type": "string" },
            "xAxis": { "type": "string" },
            "yAxis": { "type": "string" },
            "colors": { "type": "array", "items": { "type": "string" } },
            "queryKeywords": { "type": "array", "items": { "type": "string" } }
        },
        "required": [
            "visualizationType", "dataGrouping", "filterType", "title",
            "xAxis", "yAxis", "colors", "queryKeywords"
        ],
        "additionalProperties": false
    })
}
