//! Integration tests for DataIQ against a real PostgreSQL source
//!
//! A throwaway Postgres is started in Docker through testcontainers, seeded with a small
//! shop schema, and driven through the engine end to end.
//!
//! Run with: `cargo test -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use dataiq::crypto::seal_secrets;
use dataiq::engine::{CatalogEngine, ConnectionRegistry, EngineOptions};
use dataiq::lineage::TransformationType;
use dataiq::quality::{IssueType, ReportStatus};
use dataiq::store::{CatalogStore, catalog_table_uuid};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::NoTls;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const KEY: [u8; 32] = [3u8; 32];

const SEED: &str = "
    CREATE TABLE customers (customer_id int PRIMARY KEY, email text NOT NULL);
    CREATE TABLE orders (
        order_id int PRIMARY KEY,
        customer_id int REFERENCES customers (customer_id),
        status text,
        updated_at timestamptz NOT NULL DEFAULT now()
    );
    CREATE TABLE raw_orders (id int);
    CREATE TABLE orders_summary (day date, total int);
    INSERT INTO customers SELECT i, 'c' || i || '@example.com' FROM generate_series(1, 10) i;
    INSERT INTO orders (order_id, customer_id, status)
        SELECT i, (i % 10) + 1, CASE WHEN i % 4 = 0 THEN 'N/A' ELSE 'shipped' END
        FROM generate_series(1, 40) i;
";

async fn start_source() -> (ContainerAsync<Postgres>, String, u16) {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");
    let host = container.get_host().await.unwrap().to_string();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let (client, connection) = tokio_postgres::connect(
        &format!("host={host} port={port} user=postgres password=postgres dbname=postgres"),
        NoTls,
    )
    .await
    .expect("Failed to connect to source");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Connection error: {}", e);
        }
    });
    client.batch_execute(SEED).await.expect("Failed to seed source");

    (container, host, port)
}

async fn engine_for(host: &str, port: u16) -> (CatalogEngine, Uuid) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let store = CatalogStore::new(db);

    let config = serde_json::json!({
        "host": host,
        "port": port,
        "database": "postgres",
        "username": "postgres",
        "sslmode": "disable",
    });
    let sealed = seal_secrets(&serde_json::json!({"password": "postgres"}), &KEY).unwrap();
    let conn = store
        .create_connection("shop", "postgres", &config, sealed)
        .await
        .unwrap();

    let connector = Arc::new(ConnectionRegistry::new(KEY, Duration::from_secs(30)));
    let engine = CatalogEngine::new(store, connector, EngineOptions::default());
    (engine, conn.id)
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_refresh_discovers_lineage() {
    let (_container, host, port) = start_source().await;
    let (engine, conn_id) = engine_for(&host, port).await;

    let outcome = engine
        .refresh_connection(conn_id, CancellationToken::new())
        .await
        .expect("refresh failed");
    assert_eq!(outcome.sync.tables, 4);

    let discovery = outcome.discovery.expect("discovery should succeed");
    let orders = catalog_table_uuid(conn_id, "public", "orders");
    let customers = catalog_table_uuid(conn_id, "public", "customers");
    let raw_orders = catalog_table_uuid(conn_id, "public", "raw_orders");
    let summary = catalog_table_uuid(conn_id, "public", "orders_summary");

    assert!(discovery.edges.iter().any(|e| e.source_table_id == orders
        && e.target_table_id == customers
        && e.transformation_type == TransformationType::ForeignKey));
    assert!(discovery.edges.iter().any(|e| e.source_table_id == raw_orders
        && e.target_table_id == summary
        && e.transformation_type == TransformationType::Transformation));

    let impact = engine.impact(orders).await.unwrap();
    assert_eq!(impact.total_impacted, 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_assess_against_postgres() {
    let (_container, host, port) = start_source().await;
    let (engine, conn_id) = engine_for(&host, port).await;
    engine
        .sync_catalog(conn_id, CancellationToken::new())
        .await
        .expect("sync failed");

    let orders = catalog_table_uuid(conn_id, "public", "orders");
    let assessment = engine
        .assess(orders, CancellationToken::new())
        .await
        .expect("assess failed");

    assert_eq!(assessment.report.status, ReportStatus::Complete);
    assert_eq!(assessment.report.record_count, 40);
    // updated_at defaults to now()
    assert_eq!(assessment.report.dimension_scores.freshness, 100.0);
    // 10 of 40 'N/A' placeholders in status
    assert!(assessment.report.dimension_scores.validity < 100.0);
    assert!(assessment.issues.iter().any(|i| i.issue_type == IssueType::DuplicateIds
        && i.column_name.as_deref() == Some("customer_id")));

    let empty = catalog_table_uuid(conn_id, "public", "raw_orders");
    let assessment = engine.assess(empty, CancellationToken::new()).await.unwrap();
    assert_eq!(assessment.report.status, ReportStatus::EmptyTable);
    assert_eq!(assessment.issues[0].issue_type, IssueType::EmptyTable);
}
