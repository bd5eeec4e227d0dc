//! Grouping and aggregation of filtered transactions into buckets.
//!
//! The grouping dimension comes from the model's free-form `dataGrouping`
//! string (e.g. `"by_category"`, `"monthly"`), resolved by [`GroupBy::parse`].
//! Each bucket sums absolute amounts and tracks the greatest date seen.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{non_empty, Bucket, Transaction};

const UNCATEGORIZED: &str = "Uncategorized";
const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
const UNKNOWN_TYPE: &str = "Unknown Type";
const UNKNOWN_DATE: &str = "Unknown Date";

/// Longest description label kept before truncation.
const MAX_LABEL_CHARS: usize = 22;

/// Phrases removed from descriptions before they are used as labels.
/// Longer phrases come first so they win over their suffixes.
const BOILERPLATE: &[&str] = &[
    "debit card purchase",
    "recurring payment to",
    "online payment to",
    "card purchase at",
    "pos purchase",
    "card purchase",
    "payment to",
    "payment from",
    "purchase at",
    "direct debit",
    "transfer to",
    "transfer from",
];

const LEGAL_SUFFIXES: &[&str] = &[
    "inc.", "inc", "llc", "l.l.c.", "ltd.", "ltd", "corp.", "corp", "co.", "gmbh", "plc",
];

/// Grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Category,
    TopLevelCategory,
    Merchant,
    Type,
    Month,
    Date,
    /// Cleaned-up description; the fallback for unrecognized names.
    Description,
}

impl GroupBy {
    pub fn parse(name: &str) -> Self {
        let n = name.to_lowercase();
        if n.contains("top_level") || n.contains("toplevel") || n.contains("top level") {
            GroupBy::TopLevelCategory
        } else if n.contains("category") {
            GroupBy::Category
        } else if n.contains("merchant") || n.contains("vendor") || n.contains("payee") {
            GroupBy::Merchant
        } else if n.contains("type") {
            GroupBy::Type
        } else if n.contains("month") {
            GroupBy::Month
        } else if n.contains("date") || n.contains("day") {
            GroupBy::Date
        } else {
            GroupBy::Description
        }
    }
}

/// Resolve the bucket label for one record. Never returns an empty string.
pub fn group_key(record: &Transaction, by: GroupBy) -> String {
    let label = match by {
        GroupBy::Category => non_empty(record.category.as_deref()).map(str::to_string),
        GroupBy::TopLevelCategory => non_empty(record.top_level_category.as_deref())
            .or_else(|| non_empty(record.category.as_deref()))
            .map(str::to_string),
        GroupBy::Merchant => non_empty(record.merchant.as_deref())
            .map(str::to_string)
            .or_else(|| record.description.as_deref().and_then(clean_description)),
        GroupBy::Type => record.kind.as_ref().map(|k| k.as_str().to_string()),
        GroupBy::Month => non_empty(Some(record.date.as_str()))
            .map(|d| month_label(d).unwrap_or_else(|| d.to_string())),
        GroupBy::Date => non_empty(Some(record.date.as_str())).map(str::to_string),
        GroupBy::Description => record.description.as_deref().and_then(clean_description),
    };

    label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| fallback_label(by).to_string())
}

fn fallback_label(by: GroupBy) -> &'static str {
    match by {
        GroupBy::Merchant => UNKNOWN_MERCHANT,
        GroupBy::Type => UNKNOWN_TYPE,
        GroupBy::Month | GroupBy::Date => UNKNOWN_DATE,
        GroupBy::Category | GroupBy::TopLevelCategory | GroupBy::Description => UNCATEGORIZED,
    }
}

/// Format an ISO-ish date as a short month label, e.g. `"Jan 2025"`.
///
/// Accepts `YYYY-MM-DD` (with any time suffix), `YYYY-MM`, and
/// `MM/DD/YYYY`.
pub fn month_label(date: &str) -> Option<String> {
    let d = date.trim();
    d.get(..10)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .or_else(|| {
            d.get(..7)
                .and_then(|s| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok())
        })
        .or_else(|| NaiveDate::parse_from_str(d, "%m/%d/%Y").ok())
        .map(|parsed| parsed.format("%b %Y").to_string())
}

/// Strip boilerplate phrases and legal suffixes and truncate long labels.
///
/// Returns `None` when nothing is left.
pub fn clean_description(description: &str) -> Option<String> {
    let words: Vec<&str> = description.split_whitespace().collect();
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let mut kept: Vec<&str> = Vec::with_capacity(words.len());
    let mut i = 0;
    'outer: while i < words.len() {
        for phrase in BOILERPLATE {
            let parts: Vec<&str> = phrase.split(' ').collect();
            let end = i + parts.len();
            if end <= words.len()
                && lower[i..end]
                    .iter()
                    .zip(&parts)
                    .all(|(w, p)| w.as_str() == *p)
            {
                i = end;
                continue 'outer;
            }
        }
        kept.push(words[i]);
        i += 1;
    }

    while let Some(last) = kept.last() {
        let bare = last.trim_end_matches(',').to_lowercase();
        if LEGAL_SUFFIXES.contains(&bare.as_str()) {
            kept.pop();
        } else {
            break;
        }
    }

    let joined = kept.join(" ");
    let cleaned = joined.trim().trim_end_matches(',').trim();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.chars().count() > MAX_LABEL_CHARS {
        let head: String = cleaned.chars().take(MAX_LABEL_CHARS).collect();
        Some(format!("{}...", head.trim_end()))
    } else {
        Some(cleaned.to_string())
    }
}

/// Bucket records by `by`, summing absolute amounts.
pub fn group_records(records: &[Transaction], by: GroupBy) -> HashMap<String, Bucket> {
    let mut buckets: HashMap<String, Bucket> = HashMap::new();

    for record in records {
        let bucket = buckets.entry(group_key(record, by)).or_default();
        bucket.total_amount += record.magnitude();
        if record.date > bucket.most_recent_date {
            bucket.most_recent_date = record.date.clone();
        }
        bucket.members.push(record.clone());
    }

    buckets
}
