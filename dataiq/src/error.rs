use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::source::SourceError;

/// Errors surfaced by engine operations.
///
/// An empty table or a single failed metric is not an error: those are
/// reported through [`crate::quality::ReportStatus`] on an otherwise usable report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("cancelled")]
    Cancelled,

    #[error("catalog store error: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error("invalid connection config: {0}")]
    Config(String),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl EngineError {
    pub fn table_not_found(id: Uuid) -> Self {
        EngineError::NotFound {
            kind: "table",
            id: id.to_string(),
        }
    }

    pub fn connection_not_found(id: Uuid) -> Self {
        EngineError::NotFound {
            kind: "connection",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

impl From<SourceError> for EngineError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Cancelled => EngineError::Cancelled,
            SourceError::UnsupportedType(msg) => EngineError::Config(msg),
            other => EngineError::SourceUnavailable(other.to_string()),
        }
    }
}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        EngineError::Config(format!("failed to decrypt secure_config: {e}"))
    }
}
