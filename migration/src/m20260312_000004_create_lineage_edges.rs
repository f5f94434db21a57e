use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LineageEdge::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LineageEdge::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LineageEdge::SourceTableId).uuid().not_null())
                    .col(ColumnDef::new(LineageEdge::TargetTableId).uuid().not_null())
                    .col(
                        ColumnDef::new(LineageEdge::TransformationType)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(LineageEdge::Detail)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(LineageEdge::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(LineageEdge::DiscoveredAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LineageEdge::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(LineageEdge::Table, LineageEdge::SourceTableId)
                            .to(CatalogTable::Table, CatalogTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(LineageEdge::Table, LineageEdge::TargetTableId)
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
                    .name("uq_lineage_edge_source_target")
                    .table(LineageEdge::Table)
                    .col(LineageEdge::SourceTableId)
                    .col(LineageEdge::TargetTableId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lineage_edge_target")
                    .table(LineageEdge::Table)
                    .col(LineageEdge::TargetTableId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LineageEdge::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CatalogTable {
    Table,
    Id,
}

#[derive(Iden)]
enum LineageEdge {
    Table,
    Id,
    SourceTableId,
    TargetTableId,
    TransformationType,
    Detail,
    Status,
    DiscoveredAt,
    UpdatedAt,
}
