//! Summary-path context rendering.
//!
//! Complete records are rendered one per line and handed to the
//! completion model with [`SYSTEM_PROMPT`]. Incomplete records are dropped
//! here, not at extraction.

use crate::models::{Totals, Transaction};

pub const NO_TRANSACTIONS_MESSAGE: &str =
    "No matching transactions were found for your question.";

pub const SYSTEM_PROMPT: &str = "You are a personal finance assistant. Answer the user's \
question using only the transactions provided. Quote amounts with their currency, mention \
dates when they matter, and say so plainly when the transactions do not answer the question.";

/// Render one record as a context line, or `None` when it is incomplete.
pub fn format_line(t: &Transaction) -> Option<String> {
    if !t.is_complete() {
        return None;
    }
    let amount = t.amount?;
    let currency = t.currency_code.as_deref().unwrap_or("");
    let line = format!(
        "{} | {} | {} | {} | {:.2} {}",
        t.date,
        t.description.as_deref()?.trim(),
        t.category.as_deref()?.trim(),
        t.kind.as_ref()?.as_str(),
        amount,
        currency
    );
    Some(line.trim_end().to_string())
}

/// Build the transaction context block for the completion prompt.
///
/// Returns `None` when no record is complete enough to render.
pub fn render_context(records: &[Transaction]) -> Option<String> {
    let complete: Vec<Transaction> = records
        .iter()
        .filter(|t| t.is_complete())
        .cloned()
        .collect();
    if complete.is_empty() {
        return None;
    }

    let totals = Totals::from_records(&complete);
    let mut out = format!(
        "Transactions: {} (income {:.2}, expenses {:.2})\n",
        totals.count, totals.income, totals.expenses
    );
    out.push_str("date | description | category | type | amount\n");
    for line in complete.iter().filter_map(format_line) {
        out.push_str(&line);
        out.push('\n');
    }
    Some(out)
}

/// The user message sent alongside [`SYSTEM_PROMPT`].
pub fn build_prompt(query: &str, context: &str) -> String {
    format!("Question: {}\n\n{}", query.trim(), context)
}
