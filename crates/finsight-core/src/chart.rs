//! Visualization assembly: filter → group → label → sort → truncate.
//!
//! [`assemble_chart`] turns extracted records plus model-selected
//! [`ChartParams`] into a [`ChartOutcome`]. An empty result is reported as
//! [`ChartOutcome::NoData`] with [`NO_CHART_DATA_MESSAGE`] rather than an
//! empty chart.
//!
//! # Synthetic padding
//!
//! When [`ChartSettings::synthetic_padding`] is on, sparse "recurring"
//! charts are padded with jittered copies of the largest bucket. Those
//! points have no data provenance: each one is flagged `synthetic` and
//! labelled "(estimated)". The option is off by default.

use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;

use crate::filter::{filter_for_chart, FilterSettings};
use crate::group::{group_records, GroupBy};
use crate::models::{
    Bucket, ChartOptions, ChartParams, ChartPayload, ChartPoint, QueryContext, Transaction,
};

pub const NO_CHART_DATA_MESSAGE: &str = "No valid transactions found for this query.";

/// Padding never grows a chart beyond this many points.
const PADDED_POINTS: usize = 5;
/// Padding only kicks in below this many real points.
const SPARSE_POINTS: usize = 3;
/// Maximum relative jitter applied to padded values.
const JITTER: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    /// Points kept after sorting by value.
    pub max_points: usize,
    pub synthetic_padding: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            max_points: 20,
            synthetic_padding: false,
        }
    }
}

/// Result of the visualization path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartOutcome {
    Chart(ChartPayload),
    NoData { message: String },
}

impl ChartOutcome {
    pub fn no_data() -> Self {
        ChartOutcome::NoData {
            message: NO_CHART_DATA_MESSAGE.to_string(),
        }
    }
}

/// Run the assembler over already-extracted records.
pub fn assemble_chart<R: Rng>(
    records: Vec<Transaction>,
    params: &ChartParams,
    query: &QueryContext,
    filter: &FilterSettings,
    settings: &ChartSettings,
    rng: &mut R,
) -> ChartOutcome {
    let filtered = filter_for_chart(records, params, query, filter);
    let grouping = GroupBy::parse(&params.data_grouping);
    let buckets = group_records(&filtered, grouping);

    tracing::debug!(
        records = filtered.len(),
        buckets = buckets.len(),
        grouping = ?grouping,
        "grouped chart records"
    );

    if buckets.is_empty() {
        return ChartOutcome::no_data();
    }

    let mut points = buckets_to_points(buckets);
    points.truncate(settings.max_points);

    if settings.synthetic_padding {
        let target = PADDED_POINTS.min(settings.max_points);
        pad_recurring(&mut points, target, query, rng);
    }

    ChartOutcome::Chart(ChartPayload {
        chart_type: params.visualization_type,
        data: points,
        options: ChartOptions {
            title: params.title.clone(),
            x_axis: params.x_axis.clone(),
            y_axis: params.y_axis.clone(),
            colors: params.colors.clone(),
        },
    })
}

/// Map buckets to chart points sorted by value (desc), then label (asc).
pub fn buckets_to_points(buckets: HashMap<String, Bucket>) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = buckets
        .into_iter()
        .map(|(label, bucket)| ChartPoint {
            label: capitalize_label(&label),
            value: round_cents(bucket.total_amount),
            date: bucket.most_recent_date,
            synthetic: false,
        })
        .collect();

    points.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    points
}

/// Upper-case the first letter of each word.
///
/// Date-shaped (`2024-01-05`, `01/05/2024`) and month-shaped (`Jan 2025`)
/// labels are returned unchanged.
pub fn capitalize_label(label: &str) -> String {
    if is_date_shaped(label) || is_month_shaped(label) {
        return label.to_string();
    }
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn is_date_shaped(label: &str) -> bool {
    let b = label.as_bytes();
    let iso = b.len() >= 7 && b[..4].iter().all(u8::is_ascii_digit) && b[4] == b'-';
    let us = b.len() >= 8
        && label.contains('/')
        && label.split('/').all(|p| p.chars().all(|c| c.is_ascii_digit()));
    iso || us
}

fn is_month_shaped(label: &str) -> bool {
    match label.split_once(' ') {
        Some((month, year)) => {
            month.len() == 3
                && month.chars().all(|c| c.is_ascii_alphabetic())
                && year.len() == 4
                && year.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Pad a sparse "recurring" chart with synthetic points up to `target`.
///
/// Every synthetic point derives from the first (largest) point; only
/// the jitter is random.
pub fn pad_recurring<R: Rng>(
    points: &mut Vec<ChartPoint>,
    target: usize,
    query: &QueryContext,
    rng: &mut R,
) {
    if points.is_empty() || points.len() >= SPARSE_POINTS || !query.mentions("recurring") {
        return;
    }

    let base = points[0].clone();
    let missing = target.saturating_sub(points.len());
    if missing == 0 {
        return;
    }
    for n in 1..=missing {
        let jitter = rng.gen_range(-JITTER..=JITTER);
        points.push(ChartPoint {
            label: format!("{} (estimated {})", base.label, n),
            value: round_cents(base.value * (1.0 + jitter)),
            date: base.date.clone(),
            synthetic: true,
        });
    }
    tracing::debug!(added = missing, "padded sparse recurring chart with synthetic points");
}
