use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_table")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub connection_id: Uuid,
    pub schema_name: String,
    pub table_name: String,
    /// "TABLE" or "VIEW"
    pub table_type: String,
    pub record_count: Option<i64>,
    /// Latest composite score, mirrored from the newest `quality_score` row.
    pub quality_score: Option<f64>,
    pub last_profiled_at: Option<DateTime>,
    pub discovered_at: DateTime,
    /// Set when the table was missing from the latest sync; cleared when it reappears.
    pub removed_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::data_connection::Entity",
        from = "Column::ConnectionId",
        to = "super::data_connection::Column::Id",
        on_delete = "Cascade"
    )]
    DataConnection,
    #[sea_orm(has_many = "super::catalog_column::Entity")]
    CatalogColumn,
    #[sea_orm(has_many = "super::quality_score::Entity")]
    QualityScore,
    #[sea_orm(has_many = "super::quality_issue::Entity")]
    QualityIssue,
}

impl Related<super::data_connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataConnection.def()
    }
}

impl Related<super::catalog_column::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogColumn.def()
    }
}

impl Related<super::quality_score::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QualityScore.def()
    }
}

impl Related<super::quality_issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QualityIssue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
