//! Table quality: column profiling, five-dimension scoring and rule-based issue detection.
//!
//! The profiler runs once per table; its [`TableProfile`] is shared by the scorer and the
//! issue detector so a full assessment costs a single pass of statistics queries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod issues;
pub mod profiler;
pub mod scorer;

pub use issues::detect_issues;
pub use profiler::profile_table;
pub use scorer::{score_profile, score_table};

// ---------- table reference ----------

/// Identifies a table uniquely within the catalog: connection + schema + name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub connection_id: Uuid,
    pub schema_name: String,
    pub table_name: String,
}

impl TableRef {
    pub fn new(connection_id: Uuid, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            connection_id,
            schema_name: schema.into(),
            table_name: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}

// ---------- profiles ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub total_rows: i64,
    pub null_count: i64,
    pub distinct_count: i64,
    /// Up to 10 distinct non-null values cast to text; empty when sampling failed.
    pub sample_values: Vec<String>,
    /// `null_count / total_rows * 100`
    pub null_percentage: f64,
    /// `distinct_count / (total_rows - null_count) * 100`, 0 when every row is null.
    pub unique_percentage: f64,
}

impl ColumnProfile {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        nullable: bool,
        total_rows: i64,
        null_count: i64,
        distinct_count: i64,
        sample_values: Vec<String>,
    ) -> Self {
        let null_percentage = if total_rows > 0 {
            null_count as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        };
        let non_null = total_rows - null_count;
        let unique_percentage = if non_null > 0 {
            distinct_count as f64 / non_null as f64 * 100.0
        } else {
            0.0
        };

        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            total_rows,
            null_count,
            distinct_count,
            sample_values,
            null_percentage: clamp_percent(null_percentage),
            unique_percentage: clamp_percent(unique_percentage),
        }
    }

    pub fn is_textual(&self) -> bool {
        let t = self.declared_type.to_lowercase();
        t.contains("char") || t.contains("text")
    }

    pub fn is_temporal(&self) -> bool {
        let t = self.declared_type.to_lowercase();
        t.contains("timestamp") || t == "date"
    }
}

/// All column profiles of one table, taken against the same row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub table: TableRef,
    pub record_count: i64,
    /// Empty when `record_count == 0`.
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn is_empty_table(&self) -> bool {
        self.record_count == 0
    }
}

// ---------- scores ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    Consistency,
    Validity,
    Freshness,
    Uniqueness,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Completeness,
        Dimension::Consistency,
        Dimension::Validity,
        Dimension::Freshness,
        Dimension::Uniqueness,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Dimension::Completeness => 0.30,
            Dimension::Consistency => 0.25,
            Dimension::Validity => 0.25,
            Dimension::Freshness => 0.10,
            Dimension::Uniqueness => 0.10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Completeness => "completeness",
            Dimension::Consistency => "consistency",
            Dimension::Validity => "validity",
            Dimension::Freshness => "freshness",
            Dimension::Uniqueness => "uniqueness",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub freshness: f64,
    pub uniqueness: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Completeness => self.completeness,
            Dimension::Consistency => self.consistency,
            Dimension::Validity => self.validity,
            Dimension::Freshness => self.freshness,
            Dimension::Uniqueness => self.uniqueness,
        }
    }

    pub fn set(&mut self, dimension: Dimension, value: f64) {
        let slot = match dimension {
            Dimension::Completeness => &mut self.completeness,
            Dimension::Consistency => &mut self.consistency,
            Dimension::Validity => &mut self.validity,
            Dimension::Freshness => &mut self.freshness,
            Dimension::Uniqueness => &mut self.uniqueness,
        };
        *slot = clamp_percent(value);
    }

    /// Weighted sum with the fixed dimension weights, clamped to `[0, 100]`.
    pub fn composite(&self) -> f64 {
        let sum: f64 = Dimension::ALL
            .iter()
            .map(|d| self.get(*d) * d.weight())
            .sum();
        clamp_percent(sum)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    /// Zero rows: composite is 0 and no dimension was computed.
    EmptyTable,
    /// At least one dimension fell back to the neutral default.
    PartialFailure,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Complete => "complete",
            ReportStatus::EmptyTable => "empty_table",
            ReportStatus::PartialFailure => "partial_failure",
        }
    }
}

/// A dimension whose computation failed and was replaced by a neutral value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFailure {
    pub dimension: Dimension,
    pub fallback: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQualityReport {
    pub table: TableRef,
    pub record_count: i64,
    pub column_profiles: Vec<ColumnProfile>,
    pub dimension_scores: DimensionScores,
    pub composite_score: f64,
    pub status: ReportStatus,
    pub failures: Vec<MetricFailure>,
    pub computed_at: DateTime<Utc>,
}

// ---------- issues ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    HighNulls,
    DuplicateIds,
    MostlyNull,
    EmptyTable,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::HighNulls => "high_nulls",
            IssueType::DuplicateIds => "duplicate_ids",
            IssueType::MostlyNull => "mostly_null",
            IssueType::EmptyTable => "empty_table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub table: TableRef,
    pub column_name: Option<String>,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub affected_record_count: i64,
}

pub(crate) fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_percentages() {
        let col = ColumnProfile::new("email", "text", true, 200, 50, 75, vec![]);
        assert_eq!(col.null_percentage, 25.0);
        assert_eq!(col.unique_percentage, 50.0);
    }

    #[test]
    fn test_all_null_column_has_zero_uniqueness() {
        let col = ColumnProfile::new("notes", "text", true, 10, 10, 0, vec![]);
        assert_eq!(col.null_percentage, 100.0);
        assert_eq!(col.unique_percentage, 0.0);
    }

    #[test]
    fn test_type_classification() {
        let varchar = ColumnProfile::new("a", "character varying", true, 1, 0, 1, vec![]);
        let ts = ColumnProfile::new("b", "timestamp with time zone", true, 1, 0, 1, vec![]);
        let int = ColumnProfile::new("c", "integer", true, 1, 0, 1, vec![]);
        assert!(varchar.is_textual() && !varchar.is_temporal());
        assert!(ts.is_temporal() && !ts.is_textual());
        assert!(!int.is_textual() && !int.is_temporal());
    }

    #[test]
    fn test_scores_are_clamped_on_set() {
        let mut scores = DimensionScores::default();
        scores.set(Dimension::Uniqueness, 140.0);
        scores.set(Dimension::Consistency, -12.0);
        assert_eq!(scores.uniqueness, 100.0);
        assert_eq!(scores.consistency, 0.0);
    }

    #[test]
    fn test_severity_ordering_and_parse() {
        assert!(Severity::High > Severity::Medium);
        assert_eq!("medium".parse::<Severity>(), Ok(Severity::Medium));
        assert!("critical".parse::<Severity>().is_err());
    }
}
