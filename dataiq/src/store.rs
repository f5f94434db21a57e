//! Catalog store: the only component that talks to the metadata database.
//!
//! Catalog rows use deterministic UUID v5 ids so that re-syncing or re-discovering the same
//! source object always lands on the same row. Event rows (scores, issues) use UUID v7.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{
    catalog_column, catalog_table, data_connection, lineage_edge, quality_issue, quality_score,
};
use crate::error::EngineError;
use crate::lineage::LineageEdge;
use crate::quality::{QualityIssue, Severity, TableQualityReport, TableRef};
use crate::source::{SourceColumn, SourceTable};

/// Lineage edge states written by the store. Anything else is set by governance tooling.
const EDGE_ACTIVE: &str = "active";
const EDGE_STALE: &str = "stale";

/// Ids bound per `IN (...)` list; edge lookups bind two lists per query.
const ID_CHUNK: usize = 400;

/// Sample values kept per column in the catalog.
const STORED_SAMPLES: usize = 5;

/// Namespace UUID for catalog fingerprints (UUID v5).
const CATALOG_NS: Uuid = Uuid::from_bytes([
    0x3f, 0x6c, 0x2a, 0x91, 0x5e, 0x04, 0x4b, 0x7d,
    0x9a, 0x1f, 0xc3, 0x58, 0x20, 0xe7, 0x6b, 0xd4,
]);

pub fn catalog_table_uuid(connection_id: Uuid, schema_name: &str, table_name: &str) -> Uuid {
    let key = format!("{connection_id}:{schema_name}:{table_name}");
    Uuid::new_v5(&CATALOG_NS, key.as_bytes())
}

pub fn catalog_column_uuid(table_id: Uuid, column_name: &str) -> Uuid {
    let key = format!("{table_id}:{column_name}");
    Uuid::new_v5(&CATALOG_NS, key.as_bytes())
}

pub fn lineage_edge_uuid(source_table_id: Uuid, target_table_id: Uuid) -> Uuid {
    let key = format!("edge:{source_table_id}:{target_table_id}");
    Uuid::new_v5(&CATALOG_NS, key.as_bytes())
}

/// `(current - previous) / previous * 100`, rounded to two decimals.
pub fn trend_percentage(current: f64, previous: Option<f64>) -> Option<f64> {
    match previous {
        Some(prev) if prev != 0.0 => Some(((current - prev) / prev * 100.0 * 100.0).round() / 100.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// A source table together with its declared columns, as read during catalog sync.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub table: SourceTable,
    pub columns: Vec<SourceColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub tables: usize,
    pub columns: usize,
    /// Cataloged tables no longer present at the source. They are flagged, not deleted.
    pub missing: usize,
}

/// Catalog-wide quality summary over present tables and unresolved issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityOverview {
    /// Mean latest composite score of scored tables, one decimal; 0 when none are scored.
    pub overall_score: f64,
    pub scored_tables: usize,
    pub total_issues: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
}

#[derive(Clone)]
pub struct CatalogStore {
    db: DatabaseConnection,
}

impl CatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // ---------- connections ----------

    pub async fn create_connection(
        &self,
        name: &str,
        conn_type: &str,
        config: &serde_json::Value,
        secure_config: String,
    ) -> Result<data_connection::Model, EngineError> {
        let now = Utc::now().naive_utc();
        let model = data_connection::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            conn_type: Set(conn_type.to_string()),
            config: Set(serde_json::to_string(config)?),
            secure_config: Set(secure_config),
            status: Set(ConnectionStatus::Disconnected.as_str().to_string()),
            last_sync_at: Set(None),
            last_sync_result: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(model)
    }

    pub async fn find_connection(&self, id: Uuid) -> Result<data_connection::Model, EngineError> {
        data_connection::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| EngineError::connection_not_found(id))
    }

    /// Update status; `sync_result` (when given) is recorded with the current time as the
    /// last sync attempt.
    pub async fn set_connection_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
        sync_result: Option<String>,
    ) -> Result<(), EngineError> {
        let conn = self.find_connection(id).await?;
        let now = Utc::now().naive_utc();
        let mut active: data_connection::ActiveModel = conn.into();
        active.status = Set(status.as_str().to_string());
        if let Some(result) = sync_result {
            active.last_sync_at = Set(Some(now));
            active.last_sync_result = Set(Some(result));
        }
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn connected_connection_ids(&self) -> Result<Vec<Uuid>, EngineError> {
        let ids = data_connection::Entity::find()
            .filter(data_connection::Column::Status.eq(ConnectionStatus::Connected.as_str()))
            .order_by_asc(data_connection::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        Ok(ids)
    }

    // ---------- catalog ----------

    pub async fn find_table(&self, id: Uuid) -> Result<catalog_table::Model, EngineError> {
        catalog_table::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| EngineError::table_not_found(id))
    }

    pub async fn find_table_by_ref(
        &self,
        table: &TableRef,
    ) -> Result<Option<catalog_table::Model>, EngineError> {
        Ok(catalog_table::Entity::find()
            .filter(catalog_table::Column::ConnectionId.eq(table.connection_id))
            .filter(catalog_table::Column::SchemaName.eq(table.schema_name.as_str()))
            .filter(catalog_table::Column::TableName.eq(table.table_name.as_str()))
            .one(&self.db)
            .await?)
    }

    pub async fn tables_for_connection(
        &self,
        connection_id: Uuid,
    ) -> Result<Vec<catalog_table::Model>, EngineError> {
        self.tables_for_connections(&[connection_id]).await
    }

    /// Tables currently present at their source.
    pub async fn tables_for_connections(
        &self,
        connection_ids: &[Uuid],
    ) -> Result<Vec<catalog_table::Model>, EngineError> {
        if connection_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(catalog_table::Entity::find()
            .filter(catalog_table::Column::ConnectionId.is_in(connection_ids.iter().copied()))
            .filter(catalog_table::Column::RemovedAt.is_null())
            .order_by_asc(catalog_table::Column::SchemaName)
            .order_by_asc(catalog_table::Column::TableName)
            .all(&self.db)
            .await?)
    }

    pub async fn tables_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<catalog_table::Model>, EngineError> {
        let mut tables = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            tables.extend(
                catalog_table::Entity::find()
                    .filter(catalog_table::Column::Id.is_in(chunk.iter().copied()))
                    .all(&self.db)
                    .await?,
            );
        }
        tables.sort_by(|a, b| {
            (&a.schema_name, &a.table_name).cmp(&(&b.schema_name, &b.table_name))
        });
        Ok(tables)
    }

    pub async fn columns_for_table(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<catalog_column::Model>, EngineError> {
        Ok(catalog_column::Entity::find()
            .filter(catalog_column::Column::TableId.eq(table_id))
            .order_by_asc(catalog_column::Column::OrdinalPosition)
            .all(&self.db)
            .await?)
    }

    /// Upsert the catalog of one connection from `snapshot` in a single transaction.
    ///
    /// Existing rows keep their profiling data. Columns absent from a listed table are
    /// deleted. Tables absent from the snapshot are flagged with `removed_at` and their active
    /// lineage edges become `stale`; their history, issues and edges are kept.
    pub async fn upsert_catalog(
        &self,
        connection_id: Uuid,
        snapshot: &[TableSnapshot],
    ) -> Result<SyncSummary, EngineError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().naive_utc();
        let mut summary = SyncSummary::default();
        let mut seen_tables = HashSet::new();

        for entry in snapshot {
            let t = &entry.table;
            let table_id = catalog_table_uuid(connection_id, &t.schema_name, &t.table_name);
            seen_tables.insert(table_id);

            match catalog_table::Entity::find_by_id(table_id).one(&txn).await? {
                Some(existing) => {
                    let mut active: catalog_table::ActiveModel = existing.into();
                    active.table_type = Set(t.table_type.clone());
                    active.discovered_at = Set(now);
                    active.removed_at = Set(None);
                    active.update(&txn).await?;
                }
                None => {
                    catalog_table::ActiveModel {
                        id: Set(table_id),
                        connection_id: Set(connection_id),
                        schema_name: Set(t.schema_name.clone()),
                        table_name: Set(t.table_name.clone()),
                        table_type: Set(t.table_type.clone()),
                        record_count: Set(None),
                        quality_score: Set(None),
                        last_profiled_at: Set(None),
                        discovered_at: Set(now),
                        removed_at: Set(None),
                    }
                    .insert(&txn)
                    .await?;
                }
            }

            let mut seen_columns = HashSet::new();
            for c in &entry.columns {
                let column_id = catalog_column_uuid(table_id, &c.column_name);
                seen_columns.insert(column_id);

                match catalog_column::Entity::find_by_id(column_id).one(&txn).await? {
                    Some(existing) => {
                        let mut active: catalog_column::ActiveModel = existing.into();
                        active.ordinal_position = Set(c.ordinal_position);
                        active.data_type = Set(c.data_type.clone());
                        active.is_nullable = Set(c.is_nullable);
                        active.discovered_at = Set(now);
                        active.update(&txn).await?;
                    }
                    None => {
                        catalog_column::ActiveModel {
                            id: Set(column_id),
                            table_id: Set(table_id),
                            column_name: Set(c.column_name.clone()),
                            ordinal_position: Set(c.ordinal_position),
                            data_type: Set(c.data_type.clone()),
                            is_nullable: Set(c.is_nullable),
                            null_percentage: Set(None),
                            unique_percentage: Set(None),
                            sample_values: Set(None),
                            profiled_at: Set(None),
                            discovered_at: Set(now),
                        }
                        .insert(&txn)
                        .await?;
                    }
                }
            }
            summary.columns += entry.columns.len();

            catalog_column::Entity::delete_many()
                .filter(catalog_column::Column::TableId.eq(table_id))
                .filter(catalog_column::Column::Id.is_not_in(seen_columns))
                .exec(&txn)
                .await?;
        }
        summary.tables = snapshot.len();

        let missing: Vec<catalog_table::Model> = catalog_table::Entity::find()
            .filter(catalog_table::Column::ConnectionId.eq(connection_id))
            .filter(catalog_table::Column::Id.is_not_in(seen_tables))
            .all(&txn)
            .await?;
        summary.missing = missing.len();

        if !missing.is_empty() {
            let newly_missing: Vec<Uuid> = missing
                .iter()
                .filter(|t| t.removed_at.is_none())
                .map(|t| t.id)
                .collect();
            if !newly_missing.is_empty() {
                catalog_table::Entity::update_many()
                    .col_expr(catalog_table::Column::RemovedAt, Expr::value(now))
                    .filter(catalog_table::Column::Id.is_in(newly_missing))
                    .exec(&txn)
                    .await?;
            }

            let ids: Vec<Uuid> = missing.iter().map(|t| t.id).collect();
            let staled = lineage_edge::Entity::update_many()
                .col_expr(lineage_edge::Column::Status, Expr::value(EDGE_STALE))
                .col_expr(lineage_edge::Column::UpdatedAt, Expr::value(now))
                .filter(lineage_edge::Column::Status.eq(EDGE_ACTIVE))
                .filter(
                    Condition::any()
                        .add(lineage_edge::Column::SourceTableId.is_in(ids.clone()))
                        .add(lineage_edge::Column::TargetTableId.is_in(ids)),
                )
                .exec(&txn)
                .await?;
            debug!(
                connection_id = %connection_id,
                edges = staled.rows_affected,
                "Marked edges of missing tables stale"
            );
        }

        txn.commit().await?;
        info!(
            connection_id = %connection_id,
            tables = summary.tables,
            columns = summary.columns,
            missing = summary.missing,
            "Catalog synced"
        );
        Ok(summary)
    }

    // ---------- quality scores ----------

    /// Append a score history row and mirror the result onto the catalog table and its
    /// columns, in one transaction.
    pub async fn upsert_quality_score(
        &self,
        table_id: Uuid,
        report: &TableQualityReport,
    ) -> Result<quality_score::Model, EngineError> {
        let txn = self.db.begin().await?;
        let now = report.computed_at.naive_utc();

        let previous = latest_score_in(&txn, table_id).await?;
        let trend = trend_percentage(report.composite_score, previous.map(|p| p.composite_score));

        let scores = &report.dimension_scores;
        let row = quality_score::ActiveModel {
            id: Set(Uuid::now_v7()),
            table_id: Set(table_id),
            composite_score: Set(report.composite_score),
            completeness: Set(scores.completeness),
            consistency: Set(scores.consistency),
            validity: Set(scores.validity),
            freshness: Set(scores.freshness),
            uniqueness: Set(scores.uniqueness),
            record_count: Set(report.record_count),
            status: Set(report.status.as_str().to_string()),
            report: Set(serde_json::to_string(report)?),
            trend_percentage: Set(trend),
            computed_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let table = catalog_table::Entity::find_by_id(table_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::table_not_found(table_id))?;
        let mut active: catalog_table::ActiveModel = table.into();
        active.record_count = Set(Some(report.record_count));
        active.quality_score = Set(Some(report.composite_score));
        active.last_profiled_at = Set(Some(now));
        active.update(&txn).await?;

        for profile in &report.column_profiles {
            let column_id = catalog_column_uuid(table_id, &profile.name);
            let Some(existing) = catalog_column::Entity::find_by_id(column_id).one(&txn).await?
            else {
                debug!(table_id = %table_id, column = %profile.name, "Profiled column not cataloged");
                continue;
            };
            let samples: Vec<&String> = profile.sample_values.iter().take(STORED_SAMPLES).collect();
            let mut active: catalog_column::ActiveModel = existing.into();
            active.null_percentage = Set(Some(profile.null_percentage));
            active.unique_percentage = Set(Some(profile.unique_percentage));
            active.sample_values = Set(Some(serde_json::to_string(&samples)?));
            active.profiled_at = Set(Some(now));
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(row)
    }

    pub async fn latest_score(
        &self,
        table_id: Uuid,
    ) -> Result<Option<quality_score::Model>, EngineError> {
        latest_score_in(&self.db, table_id).await
    }

    /// Newest first.
    pub async fn score_history(
        &self,
        table_id: Uuid,
        limit: u64,
    ) -> Result<Vec<quality_score::Model>, EngineError> {
        Ok(quality_score::Entity::find()
            .filter(quality_score::Column::TableId.eq(table_id))
            .order_by_desc(quality_score::Column::ComputedAt)
            .order_by_desc(quality_score::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn quality_overview(&self) -> Result<QualityOverview, EngineError> {
        let scores: Vec<f64> = catalog_table::Entity::find()
            .filter(catalog_table::Column::RemovedAt.is_null())
            .filter(catalog_table::Column::QualityScore.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|t| t.quality_score)
            .collect();

        let mut overview = QualityOverview {
            scored_tables: scores.len(),
            ..Default::default()
        };
        if !scores.is_empty() {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            overview.overall_score = (mean * 10.0).round() / 10.0;
        }

        for issue in self.list_issues(None, None).await? {
            overview.total_issues += 1;
            match issue.severity.parse::<Severity>() {
                Ok(Severity::High) => overview.high_issues += 1,
                Ok(Severity::Medium) => overview.medium_issues += 1,
                Ok(Severity::Low) => overview.low_issues += 1,
                Err(_) => {}
            }
        }
        Ok(overview)
    }

    // ---------- issues ----------

    pub async fn insert_issue(
        &self,
        table_id: Uuid,
        issue: &QualityIssue,
    ) -> Result<quality_issue::Model, EngineError> {
        insert_issue_in(&self.db, table_id, issue).await
    }

    /// Persist a detection run's issues in one transaction.
    pub async fn insert_issues(
        &self,
        table_id: Uuid,
        issues: &[QualityIssue],
    ) -> Result<Vec<quality_issue::Model>, EngineError> {
        let txn = self.db.begin().await?;
        let mut rows = Vec::with_capacity(issues.len());
        for issue in issues {
            rows.push(insert_issue_in(&txn, table_id, issue).await?);
        }
        txn.commit().await?;
        Ok(rows)
    }

    /// Unresolved issues, newest first.
    pub async fn list_issues(
        &self,
        severity: Option<Severity>,
        table_id: Option<Uuid>,
    ) -> Result<Vec<quality_issue::Model>, EngineError> {
        let mut query =
            quality_issue::Entity::find().filter(quality_issue::Column::IsResolved.eq(false));
        if let Some(severity) = severity {
            query = query.filter(quality_issue::Column::Severity.eq(severity.as_str()));
        }
        if let Some(table_id) = table_id {
            query = query.filter(quality_issue::Column::TableId.eq(table_id));
        }
        Ok(query
            .order_by_desc(quality_issue::Column::DetectedAt)
            .order_by_desc(quality_issue::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn resolve_issue(&self, issue_id: Uuid) -> Result<quality_issue::Model, EngineError> {
        let issue = quality_issue::Entity::find_by_id(issue_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                kind: "issue",
                id: issue_id.to_string(),
            })?;
        if issue.is_resolved {
            return Ok(issue);
        }
        let mut active: quality_issue::ActiveModel = issue.into();
        active.is_resolved = Set(true);
        active.resolved_at = Set(Some(Utc::now().naive_utc()));
        Ok(active.update(&self.db).await?)
    }

    // ---------- lineage ----------

    pub async fn upsert_lineage_edge(&self, edge: &LineageEdge) -> Result<bool, EngineError> {
        upsert_edge_in(&self.db, edge).await
    }

    /// Persist a discovery run's edges in one transaction. Returns how many were new.
    pub async fn upsert_lineage_edges(&self, edges: &[LineageEdge]) -> Result<usize, EngineError> {
        let txn = self.db.begin().await?;
        let mut inserted = 0;
        for edge in edges {
            if upsert_edge_in(&txn, edge).await? {
                inserted += 1;
            }
        }
        txn.commit().await?;
        Ok(inserted)
    }

    pub async fn all_edges(&self) -> Result<Vec<LineageEdge>, EngineError> {
        Ok(lineage_edge::Entity::find()
            .order_by_asc(lineage_edge::Column::DiscoveredAt)
            .order_by_asc(lineage_edge::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(LineageEdge::from)
            .collect())
    }

    /// Edges with either endpoint in `table_ids`.
    pub async fn edges_touching(&self, table_ids: &[Uuid]) -> Result<Vec<LineageEdge>, EngineError> {
        let mut edges = Vec::new();
        for chunk in table_ids.chunks(ID_CHUNK) {
            let rows = lineage_edge::Entity::find()
                .filter(
                    Condition::any()
                        .add(lineage_edge::Column::SourceTableId.is_in(chunk.iter().copied()))
                        .add(lineage_edge::Column::TargetTableId.is_in(chunk.iter().copied())),
                )
                .order_by_asc(lineage_edge::Column::DiscoveredAt)
                .order_by_asc(lineage_edge::Column::Id)
                .all(&self.db)
                .await?;
            edges.extend(rows.into_iter().map(LineageEdge::from));
        }
        Ok(edges)
    }

    /// Direct predecessors: tables with an edge into `table_id`.
    pub async fn upstream_tables(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<catalog_table::Model>, EngineError> {
        let ids: Vec<Uuid> = lineage_edge::Entity::find()
            .filter(lineage_edge::Column::TargetTableId.eq(table_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| e.source_table_id)
            .collect();
        self.tables_by_ids(&ids).await
    }

    /// Direct successors: tables `table_id` has an edge into.
    pub async fn downstream_tables(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<catalog_table::Model>, EngineError> {
        let ids: Vec<Uuid> = lineage_edge::Entity::find()
            .filter(lineage_edge::Column::SourceTableId.eq(table_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| e.target_table_id)
            .collect();
        self.tables_by_ids(&ids).await
    }
}

async fn latest_score_in<C: ConnectionTrait>(
    db: &C,
    table_id: Uuid,
) -> Result<Option<quality_score::Model>, EngineError> {
    Ok(quality_score::Entity::find()
        .filter(quality_score::Column::TableId.eq(table_id))
        .order_by_desc(quality_score::Column::ComputedAt)
        .order_by_desc(quality_score::Column::Id)
        .one(db)
        .await?)
}

/// Insert, or refresh the unresolved issue with the same `(table, column, issue_type)`.
async fn insert_issue_in<C: ConnectionTrait>(
    db: &C,
    table_id: Uuid,
    issue: &QualityIssue,
) -> Result<quality_issue::Model, EngineError> {
    let now = Utc::now().naive_utc();
    let column_filter = match &issue.column_name {
        Some(name) => quality_issue::Column::ColumnName.eq(name.as_str()),
        None => quality_issue::Column::ColumnName.is_null(),
    };

    let existing = quality_issue::Entity::find()
        .filter(quality_issue::Column::TableId.eq(table_id))
        .filter(quality_issue::Column::IssueType.eq(issue.issue_type.as_str()))
        .filter(quality_issue::Column::IsResolved.eq(false))
        .filter(column_filter)
        .one(db)
        .await?;

    let row = match existing {
        Some(open) => {
            let mut active: quality_issue::ActiveModel = open.into();
            active.severity = Set(issue.severity.as_str().to_string());
            active.description = Set(issue.description.clone());
            active.affected_records = Set(issue.affected_record_count);
            active.detected_at = Set(now);
            active.update(db).await?
        }
        None => {
            quality_issue::ActiveModel {
                id: Set(Uuid::now_v7()),
                table_id: Set(table_id),
                column_name: Set(issue.column_name.clone()),
                issue_type: Set(issue.issue_type.as_str().to_string()),
                severity: Set(issue.severity.as_str().to_string()),
                description: Set(issue.description.clone()),
                affected_records: Set(issue.affected_record_count),
                is_resolved: Set(false),
                detected_at: Set(now),
                resolved_at: Set(None),
            }
            .insert(db)
            .await?
        }
    };
    Ok(row)
}

/// Insert the edge unless `(source, target)` already exists. Existing rows are left as they
/// are, including their transformation type and status.
async fn upsert_edge_in<C: ConnectionTrait>(db: &C, edge: &LineageEdge) -> Result<bool, EngineError> {
    let id = lineage_edge_uuid(edge.source_table_id, edge.target_table_id);
    if lineage_edge::Entity::find_by_id(id).one(db).await?.is_some() {
        return Ok(false);
    }

    let now = Utc::now().naive_utc();
    lineage_edge::ActiveModel {
        id: Set(id),
        source_table_id: Set(edge.source_table_id),
        target_table_id: Set(edge.target_table_id),
        transformation_type: Set(edge.transformation_type.as_str().to_string()),
        detail: Set(edge.detail.clone()),
        status: Set(EDGE_ACTIVE.to_string()),
        discovered_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(true)
}
