//! Schema migrations for the ticket store.
//!
//! The session table is created separately by
//! [`SeaOrmStore::migrate`](crate::session_store::SeaOrmStore::migrate) because
//! its name comes from configuration.

pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_users_table;
mod m20251001_000002_create_tickets_table;
mod m20251001_000003_create_ticket_images_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("ticketdesk_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_users_table::Migration),
            Box::new(m20251001_000002_create_tickets_table::Migration),
            Box::new(m20251001_000003_create_ticket_images_table::Migration),
        ]
    }
}
