use futures::future::try_join_all;
use tracing::{debug, info};

use super::{ColumnProfile, TableProfile, TableRef};
use crate::error::EngineError;
use crate::source::{SourceColumn, SourceDatabase};

/// Sample size for the placeholder scan.
pub const SAMPLE_LIMIT: usize = 10;

/// Profile every declared column of `table`.
///
/// The row count is taken first and shared by all columns. Null and distinct counts then run
/// concurrently per column; any failure among them fails the whole profile. Sampling is best
/// effort and degrades to an empty sample.
pub async fn profile_table(
    source: &dyn SourceDatabase,
    table: &TableRef,
) -> Result<TableProfile, EngineError> {
    let schema = table.schema_name.as_str();
    let name = table.table_name.as_str();

    let columns = source.list_columns(schema, name).await?;
    if columns.is_empty() {
        return Err(EngineError::NotFound {
            kind: "source table",
            id: table.to_string(),
        });
    }

    let record_count = source.count_rows(schema, name).await?;
    if record_count == 0 {
        info!(table = %table, "Table has no rows, skipping column profiling");
        return Ok(TableProfile {
            table: table.clone(),
            record_count,
            columns: vec![],
        });
    }

    let profiles = try_join_all(
        columns
            .iter()
            .map(|col| profile_column(source, schema, name, col, record_count)),
    )
    .await?;

    debug!(table = %table, columns = profiles.len(), rows = record_count, "Profiled table");

    Ok(TableProfile {
        table: table.clone(),
        record_count,
        columns: profiles,
    })
}

async fn profile_column(
    source: &dyn SourceDatabase,
    schema: &str,
    table: &str,
    column: &SourceColumn,
    total_rows: i64,
) -> Result<ColumnProfile, EngineError> {
    let col = column.column_name.as_str();
    let (null_count, distinct_count) = tokio::try_join!(
        source.count_nulls(schema, table, col),
        source.count_distinct(schema, table, col),
    )?;

    let sample_values = match source.sample_values(schema, table, col, SAMPLE_LIMIT).await {
        Ok(values) => values,
        Err(e) => {
            debug!(schema, table, column = col, error = %e, "Sampling failed, using empty sample");
            vec![]
        }
    };

    Ok(ColumnProfile::new(
        col,
        column.data_type.clone(),
        column.is_nullable,
        total_rows,
        null_count,
        distinct_count,
        sample_values,
    ))
}
