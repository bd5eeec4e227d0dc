//! Core data types shared by every stage of the pipeline.
//!
//! | Type | Produced by |
//! |------|-------------|
//! | [`RetrievalHit`] | a [`VectorStore`](crate::store::VectorStore) query |
//! | [`Transaction`] | [`extract`](crate::extract) |
//! | [`QueryContext`] | the caller, once per request |
//! | [`ChartParams`] | a [`ChartParameterSelector`](crate::generation::ChartParameterSelector) |
//! | [`Bucket`] | [`group`](crate::group) |
//! | [`ChartPayload`] | [`chart`](crate::chart) |
//!
//! Wire names are camelCase to match the payloads stored in the vector
//! index and the JSON returned to HTTP clients.

use serde::{Deserialize, Serialize};

/// A single nearest-neighbour hit returned by a vector store.
///
/// `text` is the opaque JSON blob stored alongside the vector; it is
/// only interpreted by [`extract_transactions`](crate::extract::extract_transactions).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub id: String,
    /// Similarity score reported by the store (cosine, higher is closer).
    pub score: f64,
    pub text: Option<String>,
}

/// Direction of a transaction.
///
/// Only `"income"` and `"expense"` (case-insensitive) have meaning to the
/// filters; any other value is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Other(String),
}

impl TransactionType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "income" => TransactionType::Income,
            "expense" => TransactionType::Expense,
            _ => TransactionType::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Other(s) => s,
        }
    }
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        TransactionType::parse(&s)
    }
}

impl From<TransactionType> for String {
    fn from(t: TransactionType) -> Self {
        t.as_str().to_string()
    }
}

/// A validated transaction record.
///
/// `date` is the only mandatory field; everything else is optional at the
/// extraction boundary. The summary path additionally requires
/// [`is_complete`](Transaction::is_complete).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_level_category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl Transaction {
    /// Absolute amount; a missing amount counts as zero.
    pub fn magnitude(&self) -> f64 {
        self.amount.map(f64::abs).unwrap_or(0.0)
    }

    /// `true` when amount, type, description and category are all present
    /// and the text fields are non-empty.
    pub fn is_complete(&self) -> bool {
        self.amount.is_some()
            && self.kind.is_some()
            && non_empty(self.description.as_deref()).is_some()
            && non_empty(self.category.as_deref()).is_some()
    }

    pub fn is_income(&self) -> bool {
        self.kind == Some(TransactionType::Income) || self.amount.is_some_and(|a| a > 0.0)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == Some(TransactionType::Expense) || self.amount.is_some_and(|a| a < 0.0)
    }

    /// Description lower-cased with whitespace runs collapsed to one space.
    ///
    /// Returns `None` when the description is missing or blank.
    pub fn normalized_description(&self) -> Option<String> {
        let desc = non_empty(self.description.as_deref())?;
        Some(
            desc.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        )
    }
}

/// Returns the trimmed string when it is non-empty.
pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// The user query plus the terms used for keyword matching.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub raw: String,
    /// Lower-cased whitespace-split terms longer than two characters.
    pub terms: Vec<String>,
}

impl QueryContext {
    pub fn new(query: &str) -> Self {
        let terms = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.chars().count() > 2)
            .map(str::to_string)
            .collect();
        Self {
            raw: query.to_string(),
            terms,
        }
    }

    /// Case-insensitive substring test against the raw query.
    pub fn mentions(&self, word: &str) -> bool {
        self.raw.to_lowercase().contains(&word.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
    Donut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    All,
    IncomeOnly,
    ExpensesOnly,
    RecurringOnly,
    QuerySpecific,
}

/// Chart shape chosen by the structured-generation model.
///
/// Produced once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartParams {
    pub visualization_type: VisualizationType,
    pub data_grouping: String,
    pub filter_type: FilterType,
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub colors: Vec<String>,
    #[serde(default)]
    pub query_keywords: Vec<String>,
}

impl ChartParams {
    /// Rejects responses that parsed but are unusable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data_grouping.trim().is_empty() {
            anyhow::bail!("chart parameters: dataGrouping must not be empty");
        }
        if self.title.trim().is_empty() {
            anyhow::bail!("chart parameters: title must not be empty");
        }
        if self.colors.is_empty() {
            anyhow::bail!("chart parameters: colors must not be empty");
        }
        Ok(())
    }
}

/// Running totals over the extracted record set, sent to the model with
/// the sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub count: usize,
    pub income: f64,
    pub expenses: f64,
}

impl Totals {
    pub fn from_records(records: &[Transaction]) -> Self {
        let mut totals = Totals {
            count: records.len(),
            ..Default::default()
        };
        for r in records {
            if r.is_income() {
                totals.income += r.magnitude();
            } else if r.is_expense() {
                totals.expenses += r.magnitude();
            }
        }
        totals
    }
}

/// One aggregation group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    /// Sum of absolute amounts; never negative.
    pub total_amount: f64,
    /// Greatest date string seen among the members.
    pub most_recent_date: String,
    pub members: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub date: String,
    /// Set on padding points that do not come from real records.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub colors: Vec<String>,
}

/// Final visualization response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    #[serde(rename = "type")]
    pub chart_type: VisualizationType,
    pub data: Vec<ChartPoint>,
    pub options: ChartOptions,
}
