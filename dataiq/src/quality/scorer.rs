//! Five-dimension scoring over a [`TableProfile`].
//!
//! Completeness, consistency, validity and uniqueness are pure functions of the profile.
//! Freshness needs one extra `MAX(...)` query against the best timestamp candidate.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{
    ColumnProfile, Dimension, DimensionScores, MetricFailure, ReportStatus, TableProfile,
    TableQualityReport, TableRef, clamp_percent, profile_table,
};
use crate::error::EngineError;
use crate::source::{SourceDatabase, SourceError};

/// Value substituted for a dimension whose computation failed.
pub const NEUTRAL_SCORE: f64 = 50.0;
/// Freshness when the table has no timestamp-typed column.
pub const NO_TIMESTAMP_SCORE: f64 = 80.0;
/// Freshness when the candidate column holds only nulls.
pub const NULL_TIMESTAMP_SCORE: f64 = 60.0;

const PLACEHOLDERS: [&str; 7] = ["n/a", "null", "none", "unknown", "", "0", "test"];

/// Profile `table` and score it.
pub async fn score_table(
    source: &dyn SourceDatabase,
    table: &TableRef,
) -> Result<TableQualityReport, EngineError> {
    let profile = profile_table(source, table).await?;
    Ok(score_profile(source, &profile, Utc::now()).await)
}

/// Score an existing profile. Never fails: a dimension that cannot be computed falls back to
/// [`NEUTRAL_SCORE`] and is recorded in the report's `failures`.
pub async fn score_profile(
    source: &dyn SourceDatabase,
    profile: &TableProfile,
    now: DateTime<Utc>,
) -> TableQualityReport {
    if profile.is_empty_table() {
        return TableQualityReport {
            table: profile.table.clone(),
            record_count: 0,
            column_profiles: vec![],
            dimension_scores: DimensionScores::default(),
            composite_score: 0.0,
            status: ReportStatus::EmptyTable,
            failures: vec![],
            computed_at: now,
        };
    }

    let columns = &profile.columns;
    let mut scores = DimensionScores::default();
    let mut failures = Vec::new();

    let freshness = match freshness(source, &profile.table, columns, now).await {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!(table = %profile.table, error = %e, "Freshness query failed");
            Err(e.to_string())
        }
    };

    let computed = [
        (Dimension::Completeness, Ok(completeness(columns))),
        (Dimension::Consistency, Ok(consistency(columns))),
        (Dimension::Validity, Ok(validity(columns))),
        (Dimension::Freshness, freshness),
        (Dimension::Uniqueness, Ok(uniqueness(columns))),
    ];

    for (dimension, result) in computed {
        let value = match result {
            Ok(v) if v.is_finite() => v,
            Ok(v) => {
                failures.push(MetricFailure {
                    dimension,
                    fallback: NEUTRAL_SCORE,
                    message: format!("non-finite value {v}"),
                });
                NEUTRAL_SCORE
            }
            Err(message) => {
                failures.push(MetricFailure {
                    dimension,
                    fallback: NEUTRAL_SCORE,
                    message,
                });
                NEUTRAL_SCORE
            }
        };
        scores.set(dimension, value);
    }

    let composite_score = scores.composite();
    debug!(table = %profile.table, composite = composite_score, "Scored table");

    TableQualityReport {
        table: profile.table.clone(),
        record_count: profile.record_count,
        column_profiles: profile.columns.clone(),
        dimension_scores: scores,
        composite_score,
        status: if failures.is_empty() {
            ReportStatus::Complete
        } else {
            ReportStatus::PartialFailure
        },
        failures,
        computed_at: now,
    }
}

// ---------- dimensions ----------

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// `100 - mean(null_percentage)`.
pub fn completeness(columns: &[ColumnProfile]) -> f64 {
    match mean(columns.iter().map(|c| c.null_percentage)) {
        Some(avg) => clamp_percent(100.0 - avg),
        None => 100.0,
    }
}

/// Per column: double the null percentage is deducted when a NOT NULL column holds nulls, and a
/// flat 10 when a textual column is under 5% unique.
pub fn consistency(columns: &[ColumnProfile]) -> f64 {
    mean(columns.iter().map(|c| {
        let mut score = 100.0;
        if !c.nullable && c.null_count > 0 {
            score -= c.null_percentage * 2.0;
        }
        if c.is_textual() && c.unique_percentage < 5.0 {
            score -= 10.0;
        }
        clamp_percent(score)
    }))
    .unwrap_or(100.0)
}

/// Share of sampled values that are placeholders, deducted per column.
pub fn validity(columns: &[ColumnProfile]) -> f64 {
    mean(columns.iter().map(|c| {
        if c.sample_values.is_empty() {
            return 100.0;
        }
        let hits = c
            .sample_values
            .iter()
            .filter(|v| is_placeholder(v))
            .count();
        clamp_percent(100.0 - hits as f64 / c.sample_values.len() as f64 * 100.0)
    }))
    .unwrap_or(100.0)
}

pub fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    PLACEHOLDERS.contains(&normalized.as_str())
}

fn is_id_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("id") || lower.ends_with("_pk")
}

/// Mean uniqueness of id-like columns if any exist; otherwise the overall mean, doubled below 20
/// and given a +20 bonus from 20 up.
pub fn uniqueness(columns: &[ColumnProfile]) -> f64 {
    let ids: Vec<f64> = columns
        .iter()
        .filter(|c| is_id_like(&c.name))
        .map(|c| c.unique_percentage)
        .collect();

    if let Some(avg) = mean(ids.into_iter()) {
        return clamp_percent(avg);
    }

    match mean(columns.iter().map(|c| c.unique_percentage)) {
        Some(avg) if avg < 20.0 => avg * 2.0,
        Some(avg) => (avg + 20.0).min(100.0),
        None => 100.0,
    }
}

/// Piecewise decay on whole days since the last update.
///
/// Breakpoints at 1, 7, 30 and 90 days. The 31 to 90 day segment is capped at the day-30
/// value so the curve never rises again.
pub fn freshness_from_age(days: i64) -> f64 {
    let d = days.max(0) as f64;
    match days {
        ..=1 => 100.0,
        2..=7 => 95.0 - 2.0 * d,
        8..=30 => 80.0 - 1.5 * (d - 7.0),
        31..=90 => (50.0 - 0.5 * (d - 30.0)).min(45.5),
        _ => 20.0,
    }
}

/// Pick the timestamp column that best reflects last modification:
/// `updated` over `modified` over `created` over any other timestamp-typed column.
pub fn freshness_candidate(columns: &[ColumnProfile]) -> Option<&ColumnProfile> {
    fn rank(name: &str) -> u8 {
        let lower = name.to_lowercase();
        if lower.contains("updated") {
            0
        } else if lower.contains("modified") {
            1
        } else if lower.contains("created") {
            2
        } else {
            3
        }
    }

    columns
        .iter()
        .filter(|c| c.is_temporal())
        .min_by_key(|c| rank(&c.name))
}

async fn freshness(
    source: &dyn SourceDatabase,
    table: &TableRef,
    columns: &[ColumnProfile],
    now: DateTime<Utc>,
) -> Result<f64, SourceError> {
    let Some(candidate) = freshness_candidate(columns) else {
        return Ok(NO_TIMESTAMP_SCORE);
    };

    let latest = source
        .max_timestamp(&table.schema_name, &table.table_name, &candidate.name)
        .await?;

    Ok(match latest {
        Some(ts) => freshness_from_age((now - ts).num_days()),
        None => NULL_TIMESTAMP_SCORE,
    })
}
