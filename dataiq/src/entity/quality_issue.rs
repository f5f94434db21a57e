use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "quality_issue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub table_id: Uuid,
    /// None for table-level issues (e.g. `empty_table`).
    pub column_name: Option<String>,
    pub issue_type: String,
    pub severity: String,
    pub description: String,
    pub affected_records: i64,
    pub is_resolved: bool,
    pub detected_at: DateTime,
    pub resolved_at: Option<DateTime>,
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
