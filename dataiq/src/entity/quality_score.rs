use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "quality_score")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub table_id: Uuid,
    pub composite_score: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub freshness: f64,
    pub uniqueness: f64,
    pub record_count: i64,
    /// "complete", "empty_table" or "partial_failure"
    pub status: String,
    /// Full `TableQualityReport` as JSON text.
    pub report: String,
    pub trend_percentage: Option<f64>,
    pub computed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog_table::Entity",
        from = "Column::TableId",
        to = "super::catalog_table::Column::Id",
        on_delete = "Cascade"
    )]
    CatalogTable,
}

impl Related<super::catalog_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogTable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
