use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "data_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub conn_type: String,
    /// JSON text: non-secret connection params (host, port, database, username, sslmode)
    pub config: String,
    /// AES-256-GCM encrypted base64: secret params (password)
    pub secure_config: String,
    /// "connected", "disconnected" or "error"
    pub status: String,
    pub last_sync_at: Option<DateTime>,
    pub last_sync_result: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::catalog_table::Entity")]
    CatalogTable,
}

impl Related<super::catalog_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogTable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
