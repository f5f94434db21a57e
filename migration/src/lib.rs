pub use sea_orm_migration::prelude::*;

mod m20260310_000001_create_data_connections;
mod m20260310_000002_create_catalog_tables;
mod m20260311_000003_create_quality_tables;
mod m20260312_000004_create_lineage_edges;
mod m20260313_000005_add_catalog_table_removed_at;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260310_000001_create_data_connections::Migration),
            Box::new(m20260310_000002_create_catalog_tables::Migration),
            Box::new(m20260311_000003_create_quality_tables::Migration),
            Box::new(m20260312_000004_create_lineage_edges::Migration),
            Box::new(m20260313_000005_add_catalog_table_removed_at::Migration),
        ]
    }
}
