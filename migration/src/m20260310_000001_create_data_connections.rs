use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DataConnection::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DataConnection::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DataConnection::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DataConnection::ConnType)
                            .string()
                            .not_null()
                            .default("postgres"),
                    )
                    .col(
                        ColumnDef::new(DataConnection::Config)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(DataConnection::SecureConfig)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DataConnection::Status)
                            .string()
                            .not_null()
                            .default("disconnected"),
                    )
                    .col(ColumnDef::new(DataConnection::LastSyncAt).timestamp().null())
                    .col(ColumnDef::new(DataConnection::LastSyncResult).text().null())
                    .col(
                        ColumnDef::new(DataConnection::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DataConnection::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DataConnection::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DataConnection {
    Table,
    Id,
    Name,
    ConnType,
    Config,
    SecureConfig,
    Status,
    LastSyncAt,
    LastSyncResult,
    CreatedAt,
    UpdatedAt,
}
