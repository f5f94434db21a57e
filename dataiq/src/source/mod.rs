use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::entity::data_connection;

pub mod postgres;

#[cfg(test)]
pub mod fake;

// ---------- DTOs ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub schema_name: String,
    pub table_name: String,
    /// "TABLE" or "VIEW"
    pub table_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub column_name: String,
    pub ordinal_position: i32,
    /// information_schema `data_type` (e.g. "character varying", "timestamp with time zone")
    pub data_type: String,
    pub is_nullable: bool,
}

/// A declared `FOREIGN KEY` constraint: `schema.table` references `referenced_schema.referenced_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub schema_name: String,
    pub table_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
}

// ---------- errors ----------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("connection error: {0}")]
    Connect(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("unsupported source type: {0}")]
    UnsupportedType(String),
    #[error("cancelled")]
    Cancelled,
}

// ---------- trait ----------

/// Read-only introspection and statistics over one live source database.
///
/// Every identifier passed in comes from catalog metadata and must be quoted by the
/// implementation before it is spliced into SQL.
#[async_trait::async_trait]
pub trait SourceDatabase: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<SourceTable>, SourceError>;

    async fn list_columns(&self, schema: &str, table: &str)
    -> Result<Vec<SourceColumn>, SourceError>;

    async fn count_rows(&self, schema: &str, table: &str) -> Result<i64, SourceError>;

    async fn count_nulls(&self, schema: &str, table: &str, column: &str)
    -> Result<i64, SourceError>;

    /// Distinct non-null values.
    async fn count_distinct(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<i64, SourceError>;

    /// Up to `limit` distinct non-null values cast to text.
    async fn sample_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError>;

    async fn max_timestamp(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<DateTime<Utc>>, SourceError>;

    async fn foreign_keys(&self) -> Result<Vec<ForeignKey>, SourceError>;
}

// ---------- identifier quoting ----------

/// Quote an identifier for Postgres: wrap in double quotes, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

// ---------- connection config ----------

/// Resolved (decrypted) connection parameters for a source database.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: String,
}

impl SourceConfig {
    /// Build config from a `data_connection` row by decrypting secure_config with the master key.
    pub fn from_model(
        model: &data_connection::Model,
        master_key: &[u8; 32],
    ) -> Result<Self, crate::error::EngineError> {
        use crate::error::EngineError;

        let config: serde_json::Value = serde_json::from_str(&model.config)
            .map_err(|e| EngineError::Config(format!("invalid config JSON: {e}")))?;

        let secure: serde_json::Value = if model.secure_config.is_empty() {
            serde_json::json!({})
        } else {
            crate::crypto::open_secrets(&model.secure_config, master_key)?
        };

        let field = |name: &str| -> Result<String, EngineError> {
            config[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| EngineError::Config(format!("missing {name} in config")))
        };

        let port = config["port"]
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| EngineError::Config("missing or invalid port in config".into()))?;

        Ok(Self {
            host: field("host")?,
            port,
            database: field("database")?,
            username: field("username")?,
            password: secure["password"].as_str().unwrap_or_default().to_string(),
            ssl_mode: config["sslmode"].as_str().unwrap_or("prefer").to_string(),
        })
    }
}

// ---------- factory ----------

pub async fn open_source(
    conn_type: &str,
    cfg: SourceConfig,
    statement_timeout: Duration,
    cancel: CancellationToken,
) -> Result<Arc<dyn SourceDatabase>, SourceError> {
    match conn_type {
        "postgres" | "postgresql" => {
            let source = postgres::PostgresSource::connect(cfg, statement_timeout, cancel).await?;
            Ok(Arc::new(source))
        }
        other => Err(SourceError::UnsupportedType(format!(
            "no source adapter for connection type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn connection_model(config: serde_json::Value, secure_config: String) -> data_connection::Model {
        let now = Utc::now().naive_utc();
        data_connection::Model {
            id: Uuid::now_v7(),
            name: "warehouse".into(),
            conn_type: "postgres".into(),
            config: config.to_string(),
            secure_config,
            status: "disconnected".into(),
            last_sync_at: None,
            last_sync_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            qualified_name("public", "x\"; DROP TABLE t; --"),
            "\"public\".\"x\"\"; DROP TABLE t; --\""
        );
    }

    #[test]
    fn test_config_from_model_decrypts_password() {
        let key = [7u8; 32];
        let secure = crate::crypto::seal_secrets(&serde_json::json!({"password": "pw"}), &key).unwrap();
        let model = connection_model(
            serde_json::json!({"host": "db", "port": 5433, "database": "shop", "username": "ro"}),
            secure,
        );

        let cfg = SourceConfig::from_model(&model, &key).unwrap();
        assert_eq!(cfg.host, "db");
        assert_eq!(cfg.port, 5433);
        assert_eq!(cfg.password, "pw");
        assert_eq!(cfg.ssl_mode, "prefer");
    }

    #[test]
    fn test_config_from_model_requires_host() {
        let model = connection_model(serde_json::json!({"port": 5432}), String::new());
        let err = SourceConfig::from_model(&model, &[0u8; 32]).unwrap_err();
        assert!(err.to_string().contains("host"), "got: {err}");
    }

    #[tokio::test]
    async fn test_unknown_connection_type_is_rejected() {
        let cfg = SourceConfig {
            host: "h".into(),
            port: 1,
            database: "d".into(),
            username: "u".into(),
            password: String::new(),
            ssl_mode: "disable".into(),
        };
        let result = open_source("oracle", cfg, Duration::from_secs(1), CancellationToken::new()).await;
        assert!(matches!(result, Err(SourceError::UnsupportedType(_))));
    }
}
