use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_column")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub table_id: Uuid,
    pub column_name: String,
    pub ordinal_position: i32,
    /// Upstream type string as reported by information_schema (e.g. "character varying")
    pub data_type: String,
    pub is_nullable: bool,
    pub null_percentage: Option<f64>,
    pub unique_percentage: Option<f64>,
    /// JSON array text of up to 5 sampled values.
    pub sample_values: Option<String>,
    pub profiled_at: Option<DateTime>,
    pub discovered_at: DateTime,
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
