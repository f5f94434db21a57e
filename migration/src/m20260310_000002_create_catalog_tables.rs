use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // catalog_table
        manager
            .create_table(
                Table::create()
                    .table(CatalogTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogTable::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogTable::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(CatalogTable::SchemaName).string().not_null())
                    .col(ColumnDef::new(CatalogTable::TableName).string().not_null())
                    .col(
                        ColumnDef::new(CatalogTable::TableType)
                            .string()
                            .not_null()
                            .default("TABLE"),
                    )
                    .col(ColumnDef::new(CatalogTable::RecordCount).big_integer().null())
                    .col(ColumnDef::new(CatalogTable::QualityScore).double().null())
                    .col(ColumnDef::new(CatalogTable::LastProfiledAt).timestamp().null())
                    .col(
                        ColumnDef::new(CatalogTable::DiscoveredAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CatalogTable::Table, CatalogTable::ConnectionId)
                            .to(DataConnection::Table, DataConnection::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .unique()
                    .name("uq_catalog_table_conn_schema_name")
                    .table(CatalogTable::Table)
                    .col(CatalogTable::ConnectionId)
                    .col(CatalogTable::SchemaName)
                    .col(CatalogTable::TableName)
                    .to_owned(),
            )
            .await?;

        // catalog_column
        manager
            .create_table(
                Table::create()
                    .table(CatalogColumn::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogColumn::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogColumn::TableId).uuid().not_null())
                    .col(ColumnDef::new(CatalogColumn::ColumnName).string().not_null())
                    .col(
                        ColumnDef::new(CatalogColumn::OrdinalPosition)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogColumn::DataType).string().not_null())
                    .col(
                        ColumnDef::new(CatalogColumn::IsNullable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(CatalogColumn::NullPercentage).double().null())
                    .col(ColumnDef::new(CatalogColumn::UniquePercentage).double().null())
                    .col(ColumnDef::new(CatalogColumn::SampleValues).text().null())
                    .col(ColumnDef::new(CatalogColumn::ProfiledAt).timestamp().null())
                    .col(
                        ColumnDef::new(CatalogColumn::DiscoveredAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CatalogColumn::Table, CatalogColumn::TableId)
                            .to(CatalogTable::Table, CatalogTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .unique()
                    .name("uq_catalog_column_table_name")
                    .table(CatalogColumn::Table)
                    .col(CatalogColumn::TableId)
                    .col(CatalogColumn::ColumnName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogColumn::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogTable::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DataConnection {
    Table,
    Id,
}

#[derive(Iden)]
enum CatalogTable {
    Table,
    Id,
    ConnectionId,
    SchemaName,
    TableName,
    TableType,
    RecordCount,
    QualityScore,
    LastProfiledAt,
    DiscoveredAt,
}

#[derive(Iden)]
enum CatalogColumn {
    Table,
    Id,
    TableId,
    ColumnName,
    OrdinalPosition,
    DataType,
    IsNullable,
    NullPercentage,
    UniquePercentage,
    SampleValues,
    ProfiledAt,
    DiscoveredAt,
}
