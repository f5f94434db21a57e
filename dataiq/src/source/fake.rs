//! In-memory [`SourceDatabase`] for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use super::{ForeignKey, SourceColumn, SourceDatabase, SourceError, SourceTable};

#[derive(Debug, Clone)]
pub struct FakeColumn {
    pub column: SourceColumn,
    pub nulls: i64,
    pub distinct: i64,
    /// `None` makes the sampling query fail.
    pub samples: Option<Vec<String>>,
    pub max_timestamp: Option<DateTime<Utc>>,
}

impl FakeColumn {
    pub fn new(name: &str, data_type: &str, is_nullable: bool) -> Self {
        Self {
            column: SourceColumn {
                column_name: name.to_string(),
                ordinal_position: 0,
                data_type: data_type.to_string(),
                is_nullable,
            },
            nulls: 0,
            distinct: 0,
            samples: Some(vec![]),
            max_timestamp: None,
        }
    }

    pub fn stats(mut self, nulls: i64, distinct: i64) -> Self {
        self.nulls = nulls;
        self.distinct = distinct;
        self
    }

    pub fn samples(mut self, values: &[&str]) -> Self {
        self.samples = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn failing_samples(mut self) -> Self {
        self.samples = None;
        self
    }

    pub fn latest(mut self, ts: DateTime<Utc>) -> Self {
        self.max_timestamp = Some(ts);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub schema_name: String,
    pub table_name: String,
    pub rows: i64,
    pub columns: Vec<FakeColumn>,
}

impl FakeTable {
    pub fn new(schema: &str, name: &str, rows: i64) -> Self {
        Self {
            schema_name: schema.to_string(),
            table_name: name.to_string(),
            rows,
            columns: vec![],
        }
    }

    pub fn column(mut self, mut column: FakeColumn) -> Self {
        column.column.ordinal_position = self.columns.len() as i32 + 1;
        self.columns.push(column);
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeSource {
    pub tables: Vec<FakeTable>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Fail every row-count query (simulates an unreachable source).
    pub fail_counts: bool,
    /// Fail `MAX(timestamp)` queries.
    pub fail_max_timestamp: bool,
    /// Number of statistics queries issued, for asserting profiles are shared.
    pub stat_queries: AtomicUsize,
}

impl FakeSource {
    pub fn new(tables: Vec<FakeTable>) -> Self {
        Self {
            tables,
            ..Default::default()
        }
    }

    pub fn with_foreign_key(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.foreign_keys.push(ForeignKey {
            constraint_name: format!("fk_{}_{}", from.1, to.1),
            schema_name: from.0.to_string(),
            table_name: from.1.to_string(),
            referenced_schema: to.0.to_string(),
            referenced_table: to.1.to_string(),
        });
        self
    }

    fn table(&self, schema: &str, table: &str) -> Result<&FakeTable, SourceError> {
        self.tables
            .iter()
            .find(|t| t.schema_name == schema && t.table_name == table)
            .ok_or_else(|| {
                SourceError::Query(format!("relation \"{schema}.{table}\" does not exist"))
            })
    }

    fn column(&self, schema: &str, table: &str, column: &str) -> Result<&FakeColumn, SourceError> {
        self.table(schema, table)?
            .columns
            .iter()
            .find(|c| c.column.column_name == column)
            .ok_or_else(|| SourceError::Query(format!("column \"{column}\" does not exist")))
    }

    pub fn stat_queries(&self) -> usize {
        self.stat_queries.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.stat_queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SourceDatabase for FakeSource {
    async fn list_tables(&self) -> Result<Vec<SourceTable>, SourceError> {
        Ok(self
            .tables
            .iter()
            .map(|t| SourceTable {
                schema_name: t.schema_name.clone(),
                table_name: t.table_name.clone(),
                table_type: "TABLE".to_string(),
            })
            .collect())
    }

    async fn list_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<SourceColumn>, SourceError> {
        // information_schema returns no rows for unknown tables rather than an error
        Ok(self
            .tables
            .iter()
            .find(|t| t.schema_name == schema && t.table_name == table)
            .map(|t| t.columns.iter().map(|c| c.column.clone()).collect())
            .unwrap_or_default())
    }

    async fn count_rows(&self, schema: &str, table: &str) -> Result<i64, SourceError> {
        self.tick();
        if self.fail_counts {
            return Err(SourceError::Connect("connection refused".into()));
        }
        Ok(self.table(schema, table)?.rows)
    }

    async fn count_nulls(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<i64, SourceError> {
        self.tick();
        Ok(self.column(schema, table, column)?.nulls)
    }

    async fn count_distinct(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<i64, SourceError> {
        self.tick();
        Ok(self.column(schema, table, column)?.distinct)
    }

    async fn sample_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        self.tick();
        match &self.column(schema, table, column)?.samples {
            Some(values) => Ok(values.iter().take(limit).cloned().collect()),
            None => Err(SourceError::Query("cannot cast type bytea to text".into())),
        }
    }

    async fn max_timestamp(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError> {
        if self.fail_max_timestamp {
            return Err(SourceError::Query("canceling statement due to statement timeout".into()));
        }
        Ok(self.column(schema, table, column)?.max_timestamp)
    }

    async fn foreign_keys(&self) -> Result<Vec<ForeignKey>, SourceError> {
        Ok(self.foreign_keys.clone())
    }
}

