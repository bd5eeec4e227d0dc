//! Record extraction from opaque retrieval hits.
//!
//! Each hit carries a JSON text blob of the shape
//! `{"transactions": {"<id>": {...}, ...}}`. Extraction is per-item
//! tolerant: a hit whose blob does not parse is skipped and logged, and a
//! transaction without a `date` is rejected, but neither aborts the batch.
//!
//! Field values are loosely typed upstream. Text fields accept strings or
//! numbers, and `amount` accepts numbers or numeric strings. Anything else
//! becomes `None` on the validated [`Transaction`].

use serde::Deserialize;
use serde_json::Value;

use crate::models::{RetrievalHit, Transaction, TransactionType};

/// Why a raw transaction value was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("transaction is not a JSON object")]
    NotAnObject,
    #[error("transaction has no date")]
    MissingDate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default, alias = "currency_code", alias = "currency")]
    currency_code: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default, alias = "top_level_category")]
    top_level_category: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<Value>,
    #[serde(default)]
    merchant: Option<Value>,
    #[serde(default, alias = "user_guid")]
    user_guid: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    transactions: Option<Value>,
}

/// Validate one raw transaction value and attach the hit score.
pub fn parse_transaction(value: &Value, score: Option<f64>) -> Result<Transaction, RecordError> {
    if !value.is_object() {
        return Err(RecordError::NotAnObject);
    }
    let raw: RawTransaction =
        serde_json::from_value(value.clone()).map_err(|_| RecordError::NotAnObject)?;

    let date = coerce_text(raw.date).ok_or(RecordError::MissingDate)?;

    Ok(Transaction {
        date,
        amount: raw.amount.as_ref().and_then(coerce_amount),
        currency_code: coerce_text(raw.currency_code),
        description: coerce_text(raw.description),
        category: coerce_text(raw.category),
        top_level_category: coerce_text(raw.top_level_category),
        kind: coerce_text(raw.kind).map(|k| TransactionType::parse(&k)),
        merchant: coerce_text(raw.merchant),
        user_guid: coerce_text(raw.user_guid),
        relevance_score: score,
    })
}

/// Flatten a batch of retrieval hits into validated transactions.
///
/// Output order follows hit order. Within one payload, keyed collections
/// come out in key order and arrays in element order.
pub fn extract_transactions(hits: &[RetrievalHit]) -> Vec<Transaction> {
    let mut records = Vec::new();

    for hit in hits {
        let Some(text) = hit.text.as_deref() else {
            tracing::debug!(hit = %hit.id, "retrieval hit has no text payload");
            continue;
        };

        let payload: Payload = match serde_json::from_str(text) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(hit = %hit.id, error = %e, "skipping hit with malformed payload");
                continue;
            }
        };

        let values: Vec<&Value> = match &payload.transactions {
            Some(Value::Object(map)) => map.values().collect(),
            Some(Value::Array(items)) => items.iter().collect(),
            _ => {
                tracing::debug!(hit = %hit.id, "payload has no transactions collection");
                continue;
            }
        };

        for value in values {
            match parse_transaction(value, Some(hit.score)) {
                Ok(t) => records.push(t),
                Err(e) => tracing::debug!(hit = %hit.id, "dropping transaction: {}", e),
            }
        }
    }

    records
}

fn coerce_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, score: f64, text: &str) -> RetrievalHit {
        RetrievalHit {
            id: id.to_string(),
            score,
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_malformed_blob_is_skipped() {
        let hits = vec![hit("h1", 0.9, "{not json")];
        assert!(extract_transactions(&hits).is_empty());
    }

    #[test]
    fn test_only_bad_hits_are_excluded() {
        let good = json!({
            "transactions": {
                "t1": {"date": "2024-01-05", "amount": -50, "description": "Cafe"}
            }
        })
        .to_string();
        let hits = vec![
            hit("bad1", 0.8, "{not json"),
            hit("good", 0.9, &good),
            hit("bad2", 0.8, "[1, 2"),
        ];
        let records = extract_transactions(&hits);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relevance_score, Some(0.9));
        assert_eq!(records[0].description.as_deref(), Some("Cafe"));
    }

    #[test]
    fn test_records_without_date_are_rejected() {
        let blob = json!({
            "transactions": {
                "a": {"date": "2024-02-01", "amount": 10},
                "b": {"amount": 20},
                "c": {"date": "   ", "amount": 30},
                "d": "not an object"
            }
        })
        .to_string();
        let records = extract_transactions(&[hit("h", 0.75, &blob)]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "2024-02-01");
    }

    #[test]
    fn test_preserves_retrieval_order() {
        let first = json!({"transactions": {"x": {"date": "2024-03-01"}}}).to_string();
        let second = json!({"transactions": [{"date": "2024-01-01"}, {"date": "2024-02-01"}]})
            .to_string();
        let records = extract_transactions(&[hit("1", 0.9, &first), hit("2", 0.8, &second)]);
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-01-01", "2024-02-01"]);
    }

    #[test]
    fn test_loose_field_types_are_coerced() {
        let value = json!({
            "date": "2024-04-01",
            "amount": "1,250.50",
            "currency_code": "USD",
            "type": "Income",
            "category": 42,
            "merchant": ["not", "text"]
        });
        let t = parse_transaction(&value, None).unwrap();
        assert_eq!(t.amount, Some(1250.5));
        assert_eq!(t.currency_code.as_deref(), Some("USD"));
        assert_eq!(t.kind, Some(TransactionType::Income));
        assert_eq!(t.category.as_deref(), Some("42"));
        assert_eq!(t.merchant, None);
    }

    #[test]
    fn test_non_numeric_amount_becomes_none() {
        let value = json!({"date": "2024-04-01", "amount": "n/a"});
        let t = parse_transaction(&value, None).unwrap();
        assert_eq!(t.amount, None);
        assert_eq!(t.magnitude(), 0.0);
    }

    #[test]
    fn test_missing_date_error() {
        let value = json!({"amount": 5});
        assert_eq!(parse_transaction(&value, None), Err(RecordError::MissingDate));
        assert_eq!(
            parse_transaction(&json!(3), None),
            Err(RecordError::NotAnObject)
        );
    }
}
