use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{catalog_column, catalog_table, quality_issue, quality_score};

// ---------- jobs ----------

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

// ---------- quality ----------

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub id: Uuid,
    pub composite_score: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub freshness: f64,
    pub uniqueness: f64,
    pub record_count: i64,
    pub status: String,
    pub trend_percentage: Option<f64>,
    pub computed_at: NaiveDateTime,
}

impl From<quality_score::Model> for ScoreResponse {
    fn from(m: quality_score::Model) -> Self {
        Self {
            id: m.id,
            composite_score: m.composite_score,
            completeness: m.completeness,
            consistency: m.consistency,
            validity: m.validity,
            freshness: m.freshness,
            uniqueness: m.uniqueness,
            record_count: m.record_count,
            status: m.status,
            trend_percentage: m.trend_percentage,
            computed_at: m.computed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnQualityResponse {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub null_percentage: Option<f64>,
    pub unique_percentage: Option<f64>,
    pub sample_values: Vec<String>,
    pub profiled_at: Option<NaiveDateTime>,
}

impl From<catalog_column::Model> for ColumnQualityResponse {
    fn from(m: catalog_column::Model) -> Self {
        let sample_values = m
            .sample_values
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        Self {
            column_name: m.column_name,
            data_type: m.data_type,
            is_nullable: m.is_nullable,
            null_percentage: m.null_percentage,
            unique_percentage: m.unique_percentage,
            sample_values,
            profiled_at: m.profiled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TableQualityResponse {
    pub table_id: Uuid,
    pub schema_name: String,
    pub table_name: String,
    pub record_count: Option<i64>,
    pub latest: Option<ScoreResponse>,
    /// Newest first.
    pub history: Vec<ScoreResponse>,
    pub columns: Vec<ColumnQualityResponse>,
}

impl TableQualityResponse {
    pub fn new(
        table: catalog_table::Model,
        history: Vec<quality_score::Model>,
        columns: Vec<catalog_column::Model>,
    ) -> Self {
        let mut history: Vec<ScoreResponse> = history.into_iter().map(Into::into).collect();
        let latest = if history.is_empty() {
            None
        } else {
            Some(history.remove(0))
        };
        Self {
            table_id: table.id,
            schema_name: table.schema_name,
            table_name: table.table_name,
            record_count: table.record_count,
            latest,
            history,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    pub severity: Option<String>,
    pub table_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub column_name: Option<String>,
    pub issue_type: String,
    pub severity: String,
    pub description: String,
    pub affected_records: i64,
    pub is_resolved: bool,
    pub detected_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

impl From<quality_issue::Model> for IssueResponse {
    fn from(m: quality_issue::Model) -> Self {
        Self {
            id: m.id,
            table_id: m.table_id,
            column_name: m.column_name,
            issue_type: m.issue_type,
            severity: m.severity,
            description: m.description,
            affected_records: m.affected_records,
            is_resolved: m.is_resolved,
            detected_at: m.detected_at,
            resolved_at: m.resolved_at,
        }
    }
}

// ---------- lineage ----------

#[derive(Debug, Deserialize)]
pub struct LineageQuery {
    /// Center of a neighborhood; absent means the global graph.
    pub table_id: Option<Uuid>,
    pub depth: Option<usize>,
    /// Comma-separated connection ids narrowing the global graph.
    pub connection_ids: Option<String>,
}
