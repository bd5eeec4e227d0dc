//! Relevance filtering of extracted transactions.
//!
//! Three independent strategies:
//!
//! - **Score threshold** ([`filter_by_relevance`]): used by the summary
//!   path. Drops low-similarity hits, then requires a textual, amount, or
//!   date match against the query terms.
//! - **Type filter** ([`filter_by_type`]): income / expenses / recurring,
//!   as selected by the chart parameters.
//! - **Keywords** ([`filter_by_keywords`]): case-insensitive substring
//!   match of model-supplied keywords.
//!
//! Each request path is wrapped once in the leniency rule
//! ([`with_leniency`]): when filtering leaves fewer than `min_filtered`
//! records out of at least `leniency_pool` inputs, the unfiltered records
//! are used unchanged.

use std::collections::HashMap;

use crate::models::{ChartParams, FilterType, QueryContext, Transaction};

/// Thresholds for the relevance filters and the leniency rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    /// Hits scoring below this are dropped by [`filter_by_relevance`].
    pub min_score: f64,
    /// Absolute distance between a numeric query term and an amount.
    pub amount_tolerance: f64,
    /// A stage keeping fewer records than this may be over-restrictive.
    pub min_filtered: usize,
    /// Smallest input size at which the leniency rule applies.
    pub leniency_pool: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_score: 0.7,
            amount_tolerance: 5.0,
            min_filtered: 3,
            leniency_pool: 6,
        }
    }
}

/// Run `filter` over `records`, falling back to the unfiltered input when
/// the result is over-restrictive.
pub fn with_leniency<F>(
    records: Vec<Transaction>,
    settings: &FilterSettings,
    stage: &str,
    filter: F,
) -> Vec<Transaction>
where
    F: FnOnce(&[Transaction]) -> Vec<Transaction>,
{
    let filtered = filter(&records);
    if filtered.len() < settings.min_filtered && records.len() >= settings.leniency_pool {
        tracing::debug!(
            stage,
            kept = filtered.len(),
            available = records.len(),
            "filter too restrictive, using unfiltered records"
        );
        return records;
    }
    filtered
}

/// Score-threshold filter for the summary path.
///
/// A record survives when its score is at least `min_score` (records
/// without a score are not penalized) and it matches at least one query
/// term. With no usable query terms only the score threshold applies.
pub fn filter_by_relevance(
    records: &[Transaction],
    query: &QueryContext,
    settings: &FilterSettings,
) -> Vec<Transaction> {
    records
        .iter()
        .filter(|r| r.relevance_score.map_or(true, |s| s >= settings.min_score))
        .filter(|r| query.terms.is_empty() || matches_query(r, &query.terms, settings))
        .cloned()
        .collect()
}

fn matches_query(record: &Transaction, terms: &[String], settings: &FilterSettings) -> bool {
    let text_fields: Vec<String> = [
        record.description.as_deref(),
        record.category.as_deref(),
        record.top_level_category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .collect();

    terms.iter().any(|raw| {
        let term = clean_term(raw);
        if term.is_empty() {
            return false;
        }
        if text_fields.iter().any(|f| f.contains(term)) {
            return true;
        }
        if let (Ok(n), Some(amount)) = (term.parse::<f64>(), record.amount) {
            if (n - amount.abs()).abs() <= settings.amount_tolerance {
                return true;
            }
        }
        date_token(term).is_some_and(|token| record.date.contains(&token))
    })
}

/// Strip surrounding punctuation such as `$50?` → `50`.
fn clean_term(term: &str) -> &str {
    term.trim_matches(|c: char| !(c.is_alphanumeric() || c == '.' || c == '-'))
        .trim_end_matches('.')
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Recognize year (`2024`), year-month (`2024-03`) and month-name tokens.
///
/// Month names are rewritten to the `-MM-` fragment of an ISO date.
fn date_token(term: &str) -> Option<String> {
    let bytes = term.as_bytes();
    let all_digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);

    if bytes.len() == 4 && all_digits(bytes) {
        return Some(term.to_string());
    }
    if bytes.len() == 7 && bytes[4] == b'-' && all_digits(&bytes[..4]) && all_digits(&bytes[5..])
    {
        return Some(term.to_string());
    }
    MONTHS
        .iter()
        .position(|m| *m == term || (term.len() == 3 && m.starts_with(term)))
        .map(|i| format!("-{:02}-", i + 1))
}

/// Type filter for the visualization path.
///
/// A query mentioning "recurring" applies recurring detection on top of
/// whichever filter type was selected.
pub fn filter_by_type(
    records: &[Transaction],
    filter: FilterType,
    query: &QueryContext,
) -> Vec<Transaction> {
    let selected: Vec<Transaction> = match filter {
        FilterType::IncomeOnly => records.iter().filter(|r| r.is_income()).cloned().collect(),
        FilterType::ExpensesOnly => records.iter().filter(|r| r.is_expense()).cloned().collect(),
        FilterType::RecurringOnly => recurring(records),
        FilterType::All | FilterType::QuerySpecific => records.to_vec(),
    };

    if filter != FilterType::RecurringOnly && query.mentions("recurring") {
        recurring(&selected)
    } else {
        selected
    }
}

/// Keep records whose normalized description occurs more than once.
///
/// Records without a description are never recurring.
pub fn recurring(records: &[Transaction]) -> Vec<Transaction> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in records {
        if let Some(desc) = r.normalized_description() {
            *counts.entry(desc).or_default() += 1;
        }
    }

    records
        .iter()
        .filter(|r| {
            r.normalized_description()
                .and_then(|d| counts.get(&d))
                .is_some_and(|&n| n > 1)
        })
        .cloned()
        .collect()
}

/// Keyword filter: any keyword as a substring of description, category,
/// merchant, or type.
///
/// When the survivors carry relevance scores they are re-sorted by score,
/// highest first. An empty keyword list keeps everything.
pub fn filter_by_keywords(records: &[Transaction], keywords: &[String]) -> Vec<Transaction> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return records.to_vec();
    }

    let mut kept: Vec<Transaction> = records
        .iter()
        .filter(|r| {
            let fields = [
                r.description.as_deref(),
                r.category.as_deref(),
                r.merchant.as_deref(),
                r.kind.as_ref().map(|k| k.as_str()),
            ];
            fields.into_iter().flatten().any(|f| {
                let f = f.to_lowercase();
                keywords.iter().any(|k| f.contains(k.as_str()))
            })
        })
        .cloned()
        .collect();

    if kept.iter().any(|r| r.relevance_score.is_some()) {
        kept.sort_by(|a, b| {
            let sa = a.relevance_score.unwrap_or(f64::NEG_INFINITY);
            let sb = b.relevance_score.unwrap_or(f64::NEG_INFINITY);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    kept
}

/// Summary-path filtering: score threshold plus query matching, lenient.
pub fn filter_for_summary(
    records: Vec<Transaction>,
    query: &QueryContext,
    settings: &FilterSettings,
) -> Vec<Transaction> {
    with_leniency(records, settings, "relevance", |r| {
        filter_by_relevance(r, query, settings)
    })
}

/// Visualization-path filtering: type filter, then keywords.
///
/// Leniency is judged once over both stages, against the records that
/// existed before any filtering. `query_specific` without model keywords
/// falls back to the query terms.
pub fn filter_for_chart(
    records: Vec<Transaction>,
    params: &ChartParams,
    query: &QueryContext,
    settings: &FilterSettings,
) -> Vec<Transaction> {
    let keywords: &[String] =
        if params.query_keywords.is_empty() && params.filter_type == FilterType::QuerySpecific {
            &query.terms
        } else {
            &params.query_keywords
        };

    with_leniency(records, settings, "chart", |r| {
        let by_type = filter_by_type(r, params.filter_type, query);
        if keywords.is_empty() {
            by_type
        } else {
            filter_by_keywords(&by_type, keywords)
        }
    })
}
