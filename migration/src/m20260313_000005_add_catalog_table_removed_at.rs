use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(CatalogTable::Table)
                    .add_column(ColumnDef::new(CatalogTable::RemovedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(CatalogTable::Table)
                    .drop_column(CatalogTable::RemovedAt)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum CatalogTable {
    Table,
    RemovedAt,
}
