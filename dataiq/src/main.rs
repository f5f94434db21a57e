use std::sync::Arc;

use clap::{Parser, Subcommand};
use dataiq::api::{AppState, api_router};
use dataiq::config::{Settings, redact_db_url};
use dataiq::crypto::{seal_secrets, split_secrets};
use dataiq::engine::{CatalogEngine, ConnectionRegistry};
use dataiq::jobs::JobDispatcher;
use dataiq::store::CatalogStore;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dataiq", about = "DataIQ: catalog quality scoring and lineage discovery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the admin API server (default)
    Serve,
    /// Manage source connections
    Connection {
        #[command(subcommand)]
        action: ConnectionAction,
    },
    /// Sync the catalog of a connection from its source
    Sync { connection_id: Uuid },
    /// Score a table and detect its issues
    Assess {
        table_id: Uuid,
        /// Treat the id as a connection and assess all of its tables
        #[arg(long, action = clap::ArgAction::SetTrue)]
        connection: bool,
    },
    /// Discover lineage edges for a connection (all connected ones when omitted)
    Discover { connection_id: Option<Uuid> },
    /// Print the lineage neighborhood of a table
    Lineage {
        table_id: Uuid,
        #[arg(long)]
        depth: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConnectionAction {
    /// Register a new connection; the password is stored encrypted
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "postgres")]
        conn_type: String,
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
        #[arg(long)]
        database: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value = "prefer")]
        sslmode: String,
    },
    /// Reconnect, sync the catalog and rediscover lineage
    Refresh { connection_id: Uuid },
    /// Check that the source can be reached, without changing anything
    Test { connection_id: Uuid },
    /// Mark a connection disconnected; its tables leave the global lineage graph
    Disconnect { connection_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    if settings.ephemeral_key {
        tracing::warn!(
            "DIQ_ENCRYPTION_KEY not set, using a random key. \
             Stored connection secrets will be unreadable after restart. \
             Set DIQ_ENCRYPTION_KEY to a 64-char hex string (32 bytes) in production."
        );
    }

    // Connect to the catalog store and run migrations
    tracing::info!(database = %redact_db_url(&settings.database_url), "connecting to database");
    let db = Database::connect(&settings.database_url).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("database initialized");

    let store = CatalogStore::new(db);
    let connector = Arc::new(ConnectionRegistry::new(
        settings.master_key,
        settings.statement_timeout,
    ));
    let engine = CatalogEngine::new(store, connector, settings.engine_options());

    match cli.command {
        None | Some(Commands::Serve) => serve(engine, &settings).await?,
        Some(Commands::Connection { action }) => {
            handle_connection_action(&engine, &settings, action).await?
        }
        Some(Commands::Sync { connection_id }) => {
            let summary = engine.sync_catalog(connection_id, CancellationToken::new()).await?;
            print_json(&summary)?;
        }
        Some(Commands::Assess {
            table_id,
            connection,
        }) => {
            if connection {
                let lines = engine.assess_connection(table_id, CancellationToken::new()).await?;
                print_json(&lines)?;
            } else {
                let assessment = engine.assess(table_id, CancellationToken::new()).await?;
                print_json(&assessment)?;
            }
        }
        Some(Commands::Discover { connection_id }) => {
            let ids = match connection_id {
                Some(id) => vec![id],
                None => engine.store().connected_connection_ids().await?,
            };
            for (id, result) in engine.discover_all(&ids, CancellationToken::new()).await {
                match result {
                    Ok(outcome) => print_json(&outcome)?,
                    Err(e) => tracing::error!(connection_id = %id, error = %e, "Discovery failed"),
                }
            }
        }
        Some(Commands::Lineage { table_id, depth }) => {
            let graph = engine.neighborhood(table_id, depth).await?;
            print_json(&graph)?;
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(engine: CatalogEngine, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(JobDispatcher::new(engine));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "Admin API online");

    axum::serve(listener, api_router(state, &settings.cors_allowed_origins)).await?;
    Ok(())
}

async fn handle_connection_action(
    engine: &CatalogEngine,
    settings: &Settings,
    action: ConnectionAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConnectionAction::Add {
            name,
            conn_type,
            host,
            port,
            database,
            username,
            password,
            sslmode,
        } => {
            let config = serde_json::json!({
                "host": host,
                "port": port,
                "database": database,
                "username": username,
                "password": password,
                "sslmode": sslmode,
            });
            let (public, secrets) = split_secrets(config);
            let secure_config = seal_secrets(&secrets, &settings.master_key)?;
            let conn = engine
                .store()
                .create_connection(&name, &conn_type, &public, secure_config)
                .await?;
            tracing::info!(connection_id = %conn.id, name = %conn.name, "Created connection");
            println!("{}", conn.id);
        }
        ConnectionAction::Refresh { connection_id } => {
            let outcome = engine
                .refresh_connection(connection_id, CancellationToken::new())
                .await?;
            print_json(&outcome)?;
        }
        ConnectionAction::Test { connection_id } => {
            let check = engine
                .test_connection(connection_id, CancellationToken::new())
                .await?;
            print_json(&check)?;
        }
        ConnectionAction::Disconnect { connection_id } => {
            engine.disconnect(connection_id).await?;
            tracing::info!(connection_id = %connection_id, "Disconnected connection");
        }
    }
    Ok(())
}
