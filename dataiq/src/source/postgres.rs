use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_postgres::{NoTls, Row};
use tokio_util::sync::CancellationToken;

use super::{
    ForeignKey, SourceColumn, SourceConfig, SourceDatabase, SourceError, SourceTable,
    qualified_name, quote_ident,
};

pub struct PostgresSource {
    client: tokio_postgres::Client,
    cancel: CancellationToken,
}

impl PostgresSource {
    /// Open a client and apply a statement timeout so full-table scans cannot hang the caller.
    pub async fn connect(
        cfg: SourceConfig,
        statement_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, SourceError> {
        let ssl_mode = match cfg.ssl_mode.as_str() {
            "disable" => "disable",
            "allow" | "prefer" => "prefer",
            _ => "require",
        };

        let conn_str = format!(
            "host={} port={} dbname={} user={} password={} sslmode={} connect_timeout=30",
            cfg.host, cfg.port, cfg.database, cfg.username, cfg.password, ssl_mode,
        );

        let (client, connection) = tokio::select! {
            res = tokio_postgres::connect(&conn_str, NoTls) => {
                res.map_err(|e| SourceError::Connect(e.to_string()))?
            }
            _ = cancel.cancelled() => {
                return Err(SourceError::Cancelled);
            }
        };

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("source connection error: {e}");
            }
        });

        let source = Self { client, cancel };
        let timeout_ms = statement_timeout.as_millis().max(1);
        source
            .execute(&format!("SET statement_timeout = {timeout_ms}"))
            .await?;

        Ok(source)
    }

    async fn execute(&self, sql: &str) -> Result<(), SourceError> {
        tokio::select! {
            res = self.client.batch_execute(sql) => res.map_err(|e| SourceError::Query(e.to_string())),
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled),
        }
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>, SourceError> {
        tokio::select! {
            res = self.client.query(sql, params) => res.map_err(|e| SourceError::Query(e.to_string())),
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled),
        }
    }

    async fn query_count(&self, sql: &str) -> Result<i64, SourceError> {
        let row = tokio::select! {
            res = self.client.query_one(sql, &[]) => res.map_err(|e| SourceError::Query(e.to_string()))?,
            _ = self.cancel.cancelled() => return Err(SourceError::Cancelled),
        };
        Ok(row.get(0))
    }
}

#[async_trait::async_trait]
impl SourceDatabase for PostgresSource {
    async fn list_tables(&self) -> Result<Vec<SourceTable>, SourceError> {
        let rows = self
            .query(
                "SELECT table_schema, table_name, table_type \
                 FROM information_schema.tables \
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
                 AND table_schema !~ '^pg_toast' \
                 AND table_schema !~ '^pg_temp' \
                 ORDER BY table_schema, table_name",
                &[],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let raw_type: String = row.get(2);
                let table_type = match raw_type.as_str() {
                    "BASE TABLE" | "FOREIGN" | "FOREIGN TABLE" => "TABLE",
                    other => other,
                }
                .to_string();
                SourceTable {
                    schema_name: row.get(0),
                    table_name: row.get(1),
                    table_type,
                }
            })
            .collect())
    }

    async fn list_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<SourceColumn>, SourceError> {
        let rows = self
            .query(
                "SELECT column_name, ordinal_position, data_type, is_nullable \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 \
                 ORDER BY ordinal_position",
                &[&schema, &table],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let is_nullable: String = row.get(3);
                SourceColumn {
                    column_name: row.get(0),
                    ordinal_position: row.get(1),
                    data_type: row.get(2),
                    is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
                }
            })
            .collect())
    }

    async fn count_rows(&self, schema: &str, table: &str) -> Result<i64, SourceError> {
        self.query_count(&format!("SELECT COUNT(*) FROM {}", qualified_name(schema, table)))
            .await
    }

    async fn count_nulls(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<i64, SourceError> {
        self.query_count(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            qualified_name(schema, table),
            quote_ident(column)
        ))
        .await
    }

    async fn count_distinct(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<i64, SourceError> {
        let col = quote_ident(column);
        self.query_count(&format!(
            "SELECT COUNT(DISTINCT {col}) FROM {} WHERE {col} IS NOT NULL",
            qualified_name(schema, table),
        ))
        .await
    }

    async fn sample_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let col = quote_ident(column);
        let rows = self
            .query(
                &format!(
                    "SELECT DISTINCT {col}::text FROM {} WHERE {col} IS NOT NULL LIMIT {limit}",
                    qualified_name(schema, table),
                ),
                &[],
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.get::<_, Option<String>>(0))
            .collect())
    }

    async fn max_timestamp(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError> {
        let col = quote_ident(column);
        let rows = self
            .query(
                &format!(
                    "SELECT MAX({col})::timestamptz FROM {} WHERE {col} IS NOT NULL",
                    qualified_name(schema, table),
                ),
                &[],
            )
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.get::<_, Option<DateTime<Utc>>>(0)))
    }

    async fn foreign_keys(&self) -> Result<Vec<ForeignKey>, SourceError> {
        // Composite keys yield one usage row per column; DISTINCT folds them into one constraint.
        let rows = self
            .query(
                "SELECT DISTINCT tc.constraint_name, tc.table_schema, tc.table_name, \
                 ccu.table_schema, ccu.table_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON tc.constraint_name = ccu.constraint_name \
                  AND tc.constraint_schema = ccu.constraint_schema \
                 WHERE tc.constraint_type = 'FOREIGN KEY' \
                 AND tc.table_schema NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY tc.table_schema, tc.table_name, tc.constraint_name",
                &[],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKey {
                constraint_name: row.get(0),
                schema_name: row.get(1),
                table_name: row.get(2),
                referenced_schema: row.get(3),
                referenced_table: row.get(4),
            })
            .collect())
    }
}
