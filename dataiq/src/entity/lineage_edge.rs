use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lineage_edge")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_table_id: Uuid,
    pub target_table_id: Uuid,
    /// "foreign_key", "transformation" or "unknown"
    pub transformation_type: String,
    pub detail: String,
    /// Owned by governance tooling: "active", "stale" or "resolved".
    pub status: String,
    pub discovered_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog_table::Entity",
        from = "Column::SourceTableId",
        to = "super::catalog_table::Column::Id",
        on_delete = "Cascade"
    )]
    SourceTable,
    #[sea_orm(
        belongs_to = "super::catalog_table::Entity",
        from = "Column::TargetTableId",
        to = "super::catalog_table::Column::Id",
        on_delete = "Cascade"
    )]
    TargetTable,
}

impl ActiveModelBehavior for ActiveModel {}
