use std::{net::SocketAddr, time::Duration};

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tower_sessions::ExpiredDeletion;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ticketdesk::{
    auth::AuthService, create_router, prepare_database, AppState, Config, SeaOrmStore,
};

#[derive(Debug, Parser)]
#[command(name = "ticketdesk", version, about = "Helpdesk ticket API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create a login account if the username is free.
    SeedUser {
        #[arg(long, env = "SEED_USERNAME")]
        username: String,
        #[arg(long, env = "SEED_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let db = connect(&config).await?;
    let store = SeaOrmStore::new(db.clone()).with_table_name(config.session.table_name.clone());
    prepare_database(&db, &store).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db, store).await,
        Command::SeedUser { username, password } => {
            AuthService::new(db).seed_user(&username, &password).await?;
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!(url = %config.database_url, "connecting to database");

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(opt).await
}

async fn serve(
    config: Config,
    db: DatabaseConnection,
    store: SeaOrmStore,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let sweeper = tokio::spawn(sweep_expired_sessions(
        store.clone(),
        Duration::from_secs(60 * 60),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    if !config.secure_cookies() {
        warn!("cookies are sent without the Secure flag");
    }

    let app = create_router(AppState::new(config, db), store)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

/// Deletes expired session rows every `period`. Failures are logged and the
/// next tick retries.
async fn sweep_expired_sessions(store: SeaOrmStore, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = store.delete_expired().await {
            warn!(error = %e, "expired session sweep failed");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
