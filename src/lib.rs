//! # ticketdesk
//!
//! Backend for a small helpdesk: a single team logs in with a username and
//! password, then files and edits service tickets with attached photos.
//!
//! Built on [axum](https://crates.io/crates/axum) for HTTP,
//! [Sea-ORM](https://crates.io/crates/sea-orm) for storage and
//! [`tower-sessions`](https://crates.io/crates/tower-sessions) for cookie
//! sessions, which are persisted in the same database by [`SeaOrmStore`].
//!
//! ## Features
//!
//! - Session login with bcrypt passwords, id rotation on login and a fixed
//!   session lifetime
//! - Login rate limiting per client address
//! - Declarative request validation with per-field error reporting
//! - Paged ticket listing, partial updates with image-set replacement
//! - Image uploads to a local directory, served back under `/uploads`
//! - A typed [`ApiClient`](client::ApiClient) for the HTTP API
//!
//! ## Quick Start
//!
//! ```no_run
//! use sea_orm::Database;
//! use ticketdesk::{create_router, prepare_database, AppState, Config, SeaOrmStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let db = Database::connect(config.database_url.as_str()).await?;
//!
//! let store = SeaOrmStore::new(db.clone()).with_table_name(config.session.table_name.clone());
//! prepare_database(&db, &store).await?;
//!
//! let app = create_router(AppState::new(config, db), store)?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Database Support
//!
//! SQLite and PostgreSQL are enabled by default through the `sqlite` and
//! `postgres` features. Schema changes live in [`migration`].

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

pub mod auth;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod password;
pub mod routes;
pub mod session;
pub mod session_store;
pub mod state;
pub mod tickets;
pub mod uploads;
pub mod validation;

pub use config::{Config, ConfigError};
pub use error::{AppError, AppResult};
pub use routes::create_router;
pub use session_store::SeaOrmStore;
pub use state::AppState;

/// Brings the ticket schema up to date and creates the session table.
pub async fn prepare_database(db: &DatabaseConnection, store: &SeaOrmStore) -> Result<(), DbErr> {
    migration::Migrator::up(db, None).await?;
    store.migrate().await
}
