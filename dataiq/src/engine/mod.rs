//! Engine operations: the entry points used by jobs, the admin API and the CLI.
//!
//! Each operation resolves catalog ids through [`CatalogStore`], opens a source through a
//! [`SourceConnector`] when it needs live statistics, and writes results back to the store.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::{catalog_table, data_connection};
use crate::error::EngineError;
use crate::lineage::{self, LineageEdge, LineageGraph, TableNode};
use crate::quality::{self, QualityIssue, TableQualityReport, TableRef};
use crate::source::SourceDatabase;
use crate::store::{CatalogStore, ConnectionStatus, SyncSummary, TableSnapshot};

mod connector;

pub use connector::{ConnectionRegistry, SourceConnector};

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Default neighborhood depth in each direction.
    pub lineage_depth: usize,
    /// Tables scored in parallel by [`CatalogEngine::assess_connection`].
    pub score_concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lineage_depth: 2,
            score_concurrency: 4,
        }
    }
}

/// Score and issues computed from one shared profile.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub table_id: Uuid,
    pub report: TableQualityReport,
    pub issues: Vec<QualityIssue>,
    pub trend_percentage: Option<f64>,
}

/// Per-table line of a connection-wide assessment.
#[derive(Debug, Clone, Serialize)]
pub struct TableAssessment {
    pub table_id: Uuid,
    pub table: String,
    pub composite_score: Option<f64>,
    pub issues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryOutcome {
    pub connection_id: Uuid,
    pub edges: Vec<LineageEdge>,
    /// Edges that did not exist before this run.
    pub inserted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub connection_id: Uuid,
    pub sync: SyncSummary,
    /// Absent when discovery failed after a successful sync.
    pub discovery: Option<DiscoveryOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub connection_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub table_id: Uuid,
    pub upstream_tables: Vec<TableNode>,
    pub downstream_tables: Vec<TableNode>,
    pub total_impacted: usize,
}

#[derive(Clone)]
pub struct CatalogEngine {
    store: CatalogStore,
    connector: Arc<dyn SourceConnector>,
    options: EngineOptions,
}

impl CatalogEngine {
    pub fn new(
        store: CatalogStore,
        connector: Arc<dyn SourceConnector>,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            connector,
            options,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    async fn open_for_table(
        &self,
        table_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(TableRef, Arc<dyn SourceDatabase>), EngineError> {
        let table = self.store.find_table(table_id).await?;
        let connection = self.store.find_connection(table.connection_id).await?;
        let source = self.connector.open(&connection, cancel.clone()).await?;
        Ok((table_ref(&table), source))
    }

    // ---------- quality ----------

    /// Profile and score one table, persisting the score.
    pub async fn score(
        &self,
        table_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<TableQualityReport, EngineError> {
        let (table, source) = self.open_for_table(table_id, &cancel).await?;
        let report = quality::score_table(source.as_ref(), &table).await?;
        self.store.upsert_quality_score(table_id, &report).await?;
        info!(table = %table, composite = report.composite_score, "Table scored");
        Ok(report)
    }

    /// Profile one table and persist the issues the rules find.
    pub async fn detect_issues(
        &self,
        table_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<Vec<QualityIssue>, EngineError> {
        let (table, source) = self.open_for_table(table_id, &cancel).await?;
        let profile = quality::profile_table(source.as_ref(), &table).await?;
        let issues = quality::detect_issues(&profile);
        self.store.insert_issues(table_id, &issues).await?;
        info!(table = %table, issues = issues.len(), "Issue detection finished");
        Ok(issues)
    }

    /// Score and detect issues from a single profiling pass.
    pub async fn assess(
        &self,
        table_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<Assessment, EngineError> {
        let (table, source) = self.open_for_table(table_id, &cancel).await?;
        self.assess_with(source.as_ref(), table_id, &table).await
    }

    async fn assess_with(
        &self,
        source: &dyn SourceDatabase,
        table_id: Uuid,
        table: &TableRef,
    ) -> Result<Assessment, EngineError> {
        let profile = quality::profile_table(source, table).await?;
        let report = quality::score_profile(source, &profile, chrono::Utc::now()).await;
        let issues = quality::detect_issues(&profile);

        let row = self.store.upsert_quality_score(table_id, &report).await?;
        self.store.insert_issues(table_id, &issues).await?;

        info!(
            table = %table,
            composite = report.composite_score,
            status = report.status.as_str(),
            issues = issues.len(),
            "Table assessed"
        );
        Ok(Assessment {
            table_id,
            report,
            issues,
            trend_percentage: row.trend_percentage,
        })
    }

    /// Assess every cataloged table of a connection over one source handle. A failing table
    /// is reported in its line and does not stop the others.
    pub async fn assess_connection(
        &self,
        connection_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<Vec<TableAssessment>, EngineError> {
        let connection = self.store.find_connection(connection_id).await?;
        let tables = self.store.tables_for_connection(connection_id).await?;
        let source = self.connector.open(&connection, cancel.clone()).await?;

        let results: Vec<TableAssessment> = stream::iter(tables)
            .map(|t| {
                let source = source.clone();
                async move {
                    let table = table_ref(&t);
                    let label = table.to_string();
                    match self.assess_with(source.as_ref(), t.id, &table).await {
                        Ok(a) => TableAssessment {
                            table_id: t.id,
                            table: label,
                            composite_score: Some(a.report.composite_score),
                            issues: a.issues.len(),
                            error: None,
                        },
                        Err(e) => {
                            warn!(table = %label, error = %e, "Table assessment failed");
                            TableAssessment {
                                table_id: t.id,
                                table: label,
                                composite_score: None,
                                issues: 0,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.options.score_concurrency.max(1))
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(results)
    }

    // ---------- catalog ----------

    /// Read tables and columns from the source and replace the connection's catalog.
    pub async fn sync_catalog(
        &self,
        connection_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<SyncSummary, EngineError> {
        let connection = self.store.find_connection(connection_id).await?;
        let source = self.connector.open(&connection, cancel).await?;
        self.sync_with(source.as_ref(), connection_id).await
    }

    async fn sync_with(
        &self,
        source: &dyn SourceDatabase,
        connection_id: Uuid,
    ) -> Result<SyncSummary, EngineError> {
        let tables = source.list_tables().await?;
        let snapshot: Vec<TableSnapshot> = stream::iter(tables)
            .map(|table| async move {
                let columns = source
                    .list_columns(&table.schema_name, &table.table_name)
                    .await?;
                Ok::<_, EngineError>(TableSnapshot { table, columns })
            })
            .buffered(self.options.score_concurrency.max(1))
            .try_collect()
            .await?;

        self.store.upsert_catalog(connection_id, &snapshot).await
    }

    /// Re-open a connection: on success mark it connected, sync the catalog and rediscover
    /// lineage; on failure mark it errored.
    pub async fn refresh_connection(
        &self,
        connection_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<RefreshOutcome, EngineError> {
        let connection = self.store.find_connection(connection_id).await?;

        let source = match self.connector.open(&connection, cancel.clone()).await {
            Ok(s) => s,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Connection refresh failed");
                self.store
                    .set_connection_status(connection_id, ConnectionStatus::Error, Some(e.to_string()))
                    .await?;
                return Err(match e {
                    EngineError::Cancelled => EngineError::Cancelled,
                    other => EngineError::SourceUnavailable(other.to_string()),
                });
            }
        };

        self.store
            .set_connection_status(connection_id, ConnectionStatus::Connected, None)
            .await?;

        let sync = self.sync_with(source.as_ref(), connection_id).await?;
        let discovery = match self.discover_with(source.as_ref(), &connection).await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Lineage discovery failed after sync");
                None
            }
        };

        let summary = format!(
            "{} tables, {} columns synced; {} missing",
            sync.tables, sync.columns, sync.missing
        );
        self.store
            .set_connection_status(connection_id, ConnectionStatus::Connected, Some(summary))
            .await?;

        Ok(RefreshOutcome {
            connection_id,
            sync,
            discovery,
        })
    }

    /// Open the source once without touching the catalog or the connection status.
    /// Unreachable or misconfigured sources are reported, not returned as errors.
    pub async fn test_connection(
        &self,
        connection_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<ConnectionCheck, EngineError> {
        let connection = self.store.find_connection(connection_id).await?;
        let error = match self.connector.open(&connection, cancel).await {
            Ok(_) => None,
            Err(EngineError::SourceUnavailable(msg)) | Err(EngineError::Config(msg)) => Some(msg),
            Err(e) => return Err(e),
        };
        Ok(ConnectionCheck {
            connection_id,
            success: error.is_none(),
            error,
        })
    }

    /// Mark a connection disconnected. Its catalog and lineage are kept, but its tables
    /// leave the global graph until the next successful refresh.
    pub async fn disconnect(&self, connection_id: Uuid) -> Result<(), EngineError> {
        self.store
            .set_connection_status(connection_id, ConnectionStatus::Disconnected, None)
            .await?;
        info!(connection_id = %connection_id, "Connection disconnected");
        Ok(())
    }

    // ---------- lineage ----------

    /// Extract foreign-key and naming-convention edges for a connection and persist them in
    /// one transaction.
    pub async fn discover_relationships(
        &self,
        connection_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<DiscoveryOutcome, EngineError> {
        let connection = self.store.find_connection(connection_id).await?;
        let source = self.connector.open(&connection, cancel).await?;
        self.discover_with(source.as_ref(), &connection).await
    }

    async fn discover_with(
        &self,
        source: &dyn SourceDatabase,
        connection: &data_connection::Model,
    ) -> Result<DiscoveryOutcome, EngineError> {
        let tables: Vec<TableNode> = self
            .store
            .tables_for_connection(connection.id)
            .await?
            .iter()
            .map(TableNode::from)
            .collect();

        let foreign_keys = source.foreign_keys().await?;
        let edges = lineage::merge_candidates([
            lineage::foreign_key_edges(connection.id, &foreign_keys, &tables),
            lineage::naming_edges(&tables),
        ]);
        let inserted = self.store.upsert_lineage_edges(&edges).await?;

        info!(
            connection_id = %connection.id,
            edges = edges.len(),
            inserted,
            "Lineage discovery finished"
        );
        Ok(DiscoveryOutcome {
            connection_id: connection.id,
            edges,
            inserted,
        })
    }

    /// Run discovery for each connection in turn; one connection failing does not stop
    /// the rest.
    pub async fn discover_all(
        &self,
        connection_ids: &[Uuid],
        cancel: CancellationToken,
    ) -> Vec<(Uuid, Result<DiscoveryOutcome, EngineError>)> {
        let mut results = Vec::with_capacity(connection_ids.len());
        for &id in connection_ids {
            let result = self.discover_relationships(id, cancel.clone()).await;
            if let Err(e) = &result {
                warn!(connection_id = %id, error = %e, "Discovery failed");
            }
            results.push((id, result));
        }
        results
    }

    /// Bounded neighborhood around one table; `depth` defaults to the configured depth.
    ///
    /// Edges are loaded from the store one frontier at a time, so only the part of the graph
    /// within `depth` hops of the center is read.
    pub async fn neighborhood(
        &self,
        table_id: Uuid,
        depth: Option<usize>,
    ) -> Result<LineageGraph, EngineError> {
        let center = TableNode::from(&self.store.find_table(table_id).await?);
        let depth = depth.unwrap_or(self.options.lineage_depth);

        let mut seen = HashSet::from([table_id]);
        let mut edge_ids = HashSet::new();
        let mut edges = Vec::new();
        let mut frontier = vec![table_id];
        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for edge in self.store.edges_touching(&frontier).await? {
                for id in [edge.source_table_id, edge.target_table_id] {
                    if seen.insert(id) {
                        next.push(id);
                    }
                }
                if edge_ids.insert((edge.source_table_id, edge.target_table_id)) {
                    edges.push(edge);
                }
            }
            frontier = next;
        }
        // edges among the outermost nodes
        for edge in self.store.edges_touching(&frontier).await? {
            if seen.contains(&edge.source_table_id)
                && seen.contains(&edge.target_table_id)
                && edge_ids.insert((edge.source_table_id, edge.target_table_id))
            {
                edges.push(edge);
            }
        }

        let ids: Vec<Uuid> = seen.into_iter().collect();
        let tables: Vec<TableNode> = self
            .store
            .tables_by_ids(&ids)
            .await?
            .iter()
            .map(TableNode::from)
            .collect();

        Ok(lineage::neighborhood(&center, &tables, &edges, depth))
    }

    /// Tables of connected connections (optionally narrowed to `connection_ids`) and the
    /// edges between them.
    pub async fn global_graph(
        &self,
        connection_ids: Option<&[Uuid]>,
    ) -> Result<LineageGraph, EngineError> {
        let mut connected = self.store.connected_connection_ids().await?;
        if let Some(filter) = connection_ids {
            connected.retain(|id| filter.contains(id));
        }

        let tables: Vec<TableNode> = self
            .store
            .tables_for_connections(&connected)
            .await?
            .iter()
            .map(TableNode::from)
            .collect();
        let edges = self.store.all_edges().await?;
        Ok(lineage::global_graph(&tables, &edges))
    }

    pub async fn upstream(&self, table_id: Uuid) -> Result<Vec<TableNode>, EngineError> {
        self.store.find_table(table_id).await?;
        let tables = self.store.upstream_tables(table_id).await?;
        Ok(tables.iter().map(TableNode::from).collect())
    }

    pub async fn downstream(&self, table_id: Uuid) -> Result<Vec<TableNode>, EngineError> {
        self.store.find_table(table_id).await?;
        let tables = self.store.downstream_tables(table_id).await?;
        Ok(tables.iter().map(TableNode::from).collect())
    }

    /// Direct upstream and downstream tables of `table_id`.
    pub async fn impact(&self, table_id: Uuid) -> Result<ImpactReport, EngineError> {
        let upstream_tables = self.upstream(table_id).await?;
        let downstream_tables = self.downstream(table_id).await?;
        Ok(ImpactReport {
            table_id,
            total_impacted: upstream_tables.len() + downstream_tables.len(),
            upstream_tables,
            downstream_tables,
        })
    }
}

fn table_ref(table: &catalog_table::Model) -> TableRef {
    TableRef::new(table.connection_id, &table.schema_name, &table.table_name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::quality::{IssueType, ReportStatus};
    use crate::source::fake::{FakeColumn, FakeSource, FakeTable};
    use crate::store::catalog_table_uuid;
    use crate::store::tests::{connection, setup};
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves one fake source per connection id; unknown ids fail like an unreachable host.
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        sources: Mutex<HashMap<Uuid, Arc<FakeSource>>>,
    }

    impl FakeConnector {
        pub(crate) fn insert(&self, connection_id: Uuid, source: FakeSource) -> Arc<FakeSource> {
            let source = Arc::new(source);
            self.sources
                .lock()
                .unwrap()
                .insert(connection_id, source.clone());
            source
        }
    }

    #[async_trait::async_trait]
    impl SourceConnector for FakeConnector {
        async fn open(
            &self,
            connection: &data_connection::Model,
            cancel: CancellationToken,
        ) -> Result<Arc<dyn SourceDatabase>, EngineError> {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let source = self.sources.lock().unwrap().get(&connection.id).cloned();
            match source {
                Some(s) => Ok(s),
                None => Err(EngineError::SourceUnavailable("connection refused".into())),
            }
        }
    }

    pub(crate) fn shop_source() -> FakeSource {
        FakeSource::new(vec![
            FakeTable::new("public", "customers", 50)
                .column(FakeColumn::new("customer_id", "integer", false).stats(0, 50))
                .column(
                    FakeColumn::new("email", "text", true)
                        .stats(30, 20)
                        .samples(&["a@shop.io", "n/a"]),
                ),
            FakeTable::new("public", "orders", 200)
                .column(FakeColumn::new("order_id", "integer", false).stats(0, 160))
                .column(FakeColumn::new("customer_id", "integer", false).stats(0, 45))
                .column(
                    FakeColumn::new("updated_at", "timestamp with time zone", true)
                        .stats(0, 200)
                        .latest(Utc::now() - Duration::days(2)),
                ),
            FakeTable::new("public", "raw_orders", 0)
                .column(FakeColumn::new("payload", "jsonb", true)),
            FakeTable::new("public", "orders_summary", 12)
                .column(FakeColumn::new("day", "date", false).stats(0, 12)),
        ])
        .with_foreign_key(("public", "orders"), ("public", "customers"))
    }

    pub(crate) async fn engine_with_shop() -> (CatalogEngine, Arc<FakeConnector>, Uuid) {
        let store = setup().await;
        let conn = connection(&store, "shop").await;
        let connector = Arc::new(FakeConnector::default());
        connector.insert(conn.id, shop_source());
        let engine = CatalogEngine::new(store, connector.clone(), EngineOptions::default());
        (engine, connector, conn.id)
    }

    #[tokio::test]
    async fn test_refresh_syncs_and_discovers() {
        let (engine, _, conn_id) = engine_with_shop().await;

        let outcome = engine
            .refresh_connection(conn_id, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.sync.tables, 4);
        assert_eq!(outcome.sync.columns, 7);

        let discovery = outcome.discovery.unwrap();
        // orders -> customers (fk), raw_orders -> orders_summary (naming)
        assert_eq!(discovery.edges.len(), 2);
        assert_eq!(discovery.inserted, 2);

        let conn = engine.store().find_connection(conn_id).await.unwrap();
        assert_eq!(conn.status, "connected");
        assert!(conn.last_sync_result.unwrap().starts_with("4 tables"));
    }

    #[tokio::test]
    async fn test_refresh_failure_marks_connection_errored() {
        let store = setup().await;
        let conn = connection(&store, "offline").await;
        let engine = CatalogEngine::new(
            store,
            Arc::new(FakeConnector::default()),
            EngineOptions::default(),
        );

        let err = engine
            .refresh_connection(conn.id, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SourceUnavailable(_)));
        let conn = engine.store().find_connection(conn.id).await.unwrap();
        assert_eq!(conn.status, "error");
    }

    #[tokio::test]
    async fn test_rediscovery_inserts_nothing_new() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.sync_catalog(conn_id, CancellationToken::new()).await.unwrap();

        let first = engine
            .discover_relationships(conn_id, CancellationToken::new())
            .await
            .unwrap();
        let second = engine
            .discover_relationships(conn_id, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(second.edges, first.edges);
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test]
    async fn test_assess_shares_one_profile() {
        let (engine, connector, conn_id) = engine_with_shop().await;
        engine.sync_catalog(conn_id, CancellationToken::new()).await.unwrap();
        let source = connector.insert(conn_id, shop_source());

        let orders = catalog_table_uuid(conn_id, "public", "orders");
        let assessment = engine.assess(orders, CancellationToken::new()).await.unwrap();

        // 1 row count + 3 columns x (nulls, distinct, sample)
        assert_eq!(source.stat_queries(), 10);
        assert_eq!(assessment.report.status, ReportStatus::Complete);
        assert_eq!(assessment.report.dimension_scores.freshness, 91.0);
        // order_id 80% unique, customer_id 22.5% unique
        let kinds: Vec<_> = assessment.issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(kinds, vec![IssueType::DuplicateIds, IssueType::DuplicateIds]);
        assert_eq!(assessment.trend_percentage, None);

        let stored = engine.store().list_issues(None, Some(orders)).await.unwrap();
        assert_eq!(stored.len(), 2);
        let latest = engine.store().latest_score(orders).await.unwrap().unwrap();
        assert_eq!(latest.composite_score, assessment.report.composite_score);
    }

    #[tokio::test]
    async fn test_empty_table_scores_zero_with_one_issue() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.sync_catalog(conn_id, CancellationToken::new()).await.unwrap();
        let raw = catalog_table_uuid(conn_id, "public", "raw_orders");

        let report = engine.score(raw, CancellationToken::new()).await.unwrap();
        assert_eq!(report.composite_score, 0.0);
        assert_eq!(report.status, ReportStatus::EmptyTable);

        let issues = engine.detect_issues(raw, CancellationToken::new()).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::EmptyTable);
    }

    #[tokio::test]
    async fn test_assess_connection_reports_each_table() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.sync_catalog(conn_id, CancellationToken::new()).await.unwrap();

        let mut lines = engine
            .assess_connection(conn_id, CancellationToken::new())
            .await
            .unwrap();
        lines.sort_by(|a, b| a.table.cmp(&b.table));

        let names: Vec<&str> = lines.iter().map(|l| l.table.as_str()).collect();
        assert_eq!(
            names,
            vec!["public.customers", "public.orders", "public.orders_summary", "public.raw_orders"]
        );
        assert!(lines.iter().all(|l| l.error.is_none()));
        assert_eq!(lines[3].composite_score, Some(0.0));
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let (engine, _, _) = engine_with_shop().await;
        let err = engine.score(Uuid::new_v4(), CancellationToken::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(engine.impact(Uuid::new_v4()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_discover_all_continues_past_failures() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.sync_catalog(conn_id, CancellationToken::new()).await.unwrap();
        let offline = connection(engine.store(), "offline").await;

        let results = engine
            .discover_all(&[offline.id, conn_id], CancellationToken::new())
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].1.as_ref().unwrap().inserted, 2);
    }

    #[tokio::test]
    async fn test_graph_queries_and_impact() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.refresh_connection(conn_id, CancellationToken::new()).await.unwrap();

        let orders = catalog_table_uuid(conn_id, "public", "orders");
        let customers = catalog_table_uuid(conn_id, "public", "customers");

        let graph = engine.neighborhood(orders, None).await.unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.node(customers).unwrap().level, Some(1));

        let impact = engine.impact(customers).await.unwrap();
        assert_eq!(impact.total_impacted, 1);
        assert_eq!(impact.upstream_tables[0].id, orders);
        assert!(impact.downstream_tables.is_empty());

        let global = engine.global_graph(None).await.unwrap();
        assert_eq!(global.nodes.len(), 4);
        assert_eq!(global.edges.len(), 2);

        let filtered = engine.global_graph(Some(&[Uuid::new_v4()])).await.unwrap();
        assert!(filtered.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_removes_tables_from_global_graph() {
        let (engine, _, conn_id) = engine_with_shop().await;
        engine.refresh_connection(conn_id, CancellationToken::new()).await.unwrap();
        assert_eq!(engine.global_graph(None).await.unwrap().nodes.len(), 4);

        engine.disconnect(conn_id).await.unwrap();
        let conn = engine.store().find_connection(conn_id).await.unwrap();
        assert_eq!(conn.status, "disconnected");
        let global = engine.global_graph(None).await.unwrap();
        assert!(global.nodes.is_empty());
        assert!(global.edges.is_empty());

        // lineage itself is untouched
        let orders = catalog_table_uuid(conn_id, "public", "orders");
        assert_eq!(engine.neighborhood(orders, None).await.unwrap().nodes.len(), 2);

        assert!(engine.disconnect(Uuid::new_v4()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_connection_check_reports_failures() {
        let (engine, _, conn_id) = engine_with_shop().await;
        let ok = engine.test_connection(conn_id, CancellationToken::new()).await.unwrap();
        assert!(ok.success);

        let offline = connection(engine.store(), "offline").await;
        let failed = engine
            .test_connection(offline.id, CancellationToken::new())
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("connection refused"));
        // status is left alone
        let offline = engine.store().find_connection(offline.id).await.unwrap();
        assert_eq!(offline.status, "disconnected");
    }

    #[tokio::test]
    async fn test_neighborhood_reads_lineage_through_store() {
        let store = setup().await;
        let conn = connection(&store, "hr").await;
        store
            .upsert_catalog(
                conn.id,
                &crate::store::tests::snapshot(&[
                    ("employees", &["id"]),
                    ("departments", &["id"]),
                    ("regions", &["id"]),
                    ("countries", &["id"]),
                ]),
            )
            .await
            .unwrap();
        let id = |name: &str| catalog_table_uuid(conn.id, "public", name);
        let edge = |from: &str, to: &str| LineageEdge {
            source_table_id: id(from),
            target_table_id: id(to),
            transformation_type: crate::lineage::TransformationType::ForeignKey,
            detail: String::new(),
        };
        store
            .upsert_lineage_edges(&[
                edge("departments", "employees"),
                edge("employees", "departments"),
                edge("departments", "regions"),
                edge("regions", "countries"),
            ])
            .await
            .unwrap();
        let engine = CatalogEngine::new(
            store,
            Arc::new(FakeConnector::default()),
            EngineOptions::default(),
        );

        let graph = engine.neighborhood(id("employees"), None).await.unwrap();
        let regions = graph.node(id("regions")).unwrap();
        assert_eq!(regions.level, Some(2));
        assert!(graph.node(id("countries")).is_none());
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 3);

        let wide = engine.neighborhood(id("employees"), Some(3)).await.unwrap();
        assert_eq!(wide.nodes.len(), 4);
        assert_eq!(wide.edges.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_source_work() {
        let (engine, _, conn_id) = engine_with_shop().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.sync_catalog(conn_id, cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }
}
