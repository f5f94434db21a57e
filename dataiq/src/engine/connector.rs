use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity::data_connection;
use crate::error::EngineError;
use crate::source::{SourceConfig, SourceDatabase, open_source};

/// Hands out live read handles for cataloged connections.
#[async_trait::async_trait]
pub trait SourceConnector: Send + Sync {
    async fn open(
        &self,
        connection: &data_connection::Model,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn SourceDatabase>, EngineError>;
}

/// Opens sources from stored connection rows, decrypting credentials with the master key.
pub struct ConnectionRegistry {
    master_key: [u8; 32],
    statement_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(master_key: [u8; 32], statement_timeout: Duration) -> Self {
        Self {
            master_key,
            statement_timeout,
        }
    }
}

#[async_trait::async_trait]
impl SourceConnector for ConnectionRegistry {
    async fn open(
        &self,
        connection: &data_connection::Model,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn SourceDatabase>, EngineError> {
        let cfg = SourceConfig::from_model(connection, &self.master_key)?;
        debug!(
            connection_id = %connection.id,
            host = %cfg.host,
            database = %cfg.database,
            "Opening source"
        );
        Ok(open_source(&connection.conn_type, cfg, self.statement_timeout, cancel).await?)
    }
}
