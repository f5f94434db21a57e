use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // quality_score: one row per scoring run
        manager
            .create_table(
                Table::create()
                    .table(QualityScore::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QualityScore::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QualityScore::TableId).uuid().not_null())
                    .col(ColumnDef::new(QualityScore::CompositeScore).double().not_null())
                    .col(ColumnDef::new(QualityScore::Completeness).double().not_null())
                    .col(ColumnDef::new(QualityScore::Consistency).double().not_null())
                    .col(ColumnDef::new(QualityScore::Validity).double().not_null())
                    .col(ColumnDef::new(QualityScore::Freshness).double().not_null())
                    .col(ColumnDef::new(QualityScore::Uniqueness).double().not_null())
                    .col(
                        ColumnDef::new(QualityScore::RecordCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(QualityScore::Status).string().not_null())
                    .col(ColumnDef::new(QualityScore::Report).text().not_null())
                    .col(ColumnDef::new(QualityScore::TrendPercentage).double().null())
                    .col(
                        ColumnDef::new(QualityScore::ComputedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(QualityScore::Table, QualityScore::TableId)
                            .to(CatalogTable::Table, CatalogTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quality_score_table_computed")
                    .table(QualityScore::Table)
                    .col(QualityScore::TableId)
                    .col(QualityScore::ComputedAt)
                    .to_owned(),
            )
            .await?;

        // quality_issue
        manager
            .create_table(
                Table::create()
                    .table(QualityIssue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QualityIssue::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QualityIssue::TableId).uuid().not_null())
                    .col(ColumnDef::new(QualityIssue::ColumnName).string().null())
                    .col(ColumnDef::new(QualityIssue::IssueType).string().not_null())
                    .col(ColumnDef::new(QualityIssue::Severity).string().not_null())
                    .col(ColumnDef::new(QualityIssue::Description).text().not_null())
                    .col(
                        ColumnDef::new(QualityIssue::AffectedRecords)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QualityIssue::IsResolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(QualityIssue::DetectedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(QualityIssue::ResolvedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(QualityIssue::Table, QualityIssue::TableId)
                            .to(CatalogTable::Table, CatalogTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quality_issue_table_resolved")
                    .table(QualityIssue::Table)
                    .col(QualityIssue::TableId)
                    .col(QualityIssue::IsResolved)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QualityIssue::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QualityScore::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CatalogTable {
    Table,
    Id,
}

#[derive(Iden)]
enum QualityScore {
    Table,
    Id,
    TableId,
    CompositeScore,
    Completeness,
    Consistency,
    Validity,
    Freshness,
    Uniqueness,
    RecordCount,
    Status,
    Report,
    TrendPercentage,
    ComputedAt,
}

#[derive(Iden)]
enum QualityIssue {
    Table,
    Id,
    TableId,
    ColumnName,
    IssueType,
    Severity,
    Description,
    AffectedRecords,
    IsResolved,
    DetectedAt,
    ResolvedAt,
}
