use std::fmt::Debug;

use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, ColumnDef, Expr, Index, OnConflict, Query, SelectStatement, Table,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, DeriveIden, TransactionTrait,
};
use time::OffsetDateTime;
use tower_sessions::{session::Id, session::Record, session_store, ExpiredDeletion, SessionStore};

/// Default name of the session table.
pub const DEFAULT_TABLE_NAME: &str = "session";

#[derive(DeriveIden)]
enum SessionColumn {
    Id,
    Data,
    ExpiryDate,
}

/// A Sea-ORM backed session store for tower-sessions.
///
/// `SeaOrmStore` persists session records in a relational table so that
/// logins survive process restarts. It works with any backend the crate is
/// built for (SQLite and PostgreSQL by default) because every statement is
/// built with Sea-Query against the configured table name.
///
/// Session data is serialized using MessagePack for compact storage.
///
/// # Usage
///
/// ```no_run
/// use sea_orm::Database;
/// use tower_sessions::Expiry;
/// use ticketdesk::session_store::SeaOrmStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Database::connect("sqlite://data.sqlite?mode=rwc").await?;
///
/// let store = SeaOrmStore::new(conn).with_table_name("session");
/// store.migrate().await?;
///
/// let session_layer = tower_sessions::SessionManagerLayer::new(store)
///     .with_expiry(Expiry::OnInactivity(time::Duration::hours(4)));
/// # Ok(())
/// # }
/// ```
///
/// # Database Schema
///
/// | Column      | Type               | Description                         |
/// |-------------|--------------------|-------------------------------------|
/// | id          | TEXT (Primary Key) | Session ID                          |
/// | data        | BLOB / BYTEA       | MessagePack serialized session data |
/// | expiry_date | BIGINT             | Expiration as unix seconds          |
///
/// # Error Handling
///
/// - Database errors → `session_store::Error::Backend`
/// - Serialization errors → `session_store::Error::Encode`
/// - Deserialization errors → `session_store::Error::Decode`
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    conn: DatabaseConnection,
    table_name: String,
}

impl SeaOrmStore {
    /// Creates a store using the table named [`DEFAULT_TABLE_NAME`].
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    /// Sets a custom table name for this store.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn table(&self) -> Alias {
        Alias::new(self.table_name.as_str())
    }

    /// Creates the session table and its expiry index when they are missing.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        let backend = self.conn.get_database_backend();

        let create_table = Table::create()
            .table(self.table())
            .if_not_exists()
            .col(
                ColumnDef::new(SessionColumn::Id)
                    .text()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(SessionColumn::Data).blob().not_null())
            .col(ColumnDef::new(SessionColumn::ExpiryDate).big_integer().not_null())
            .to_owned();
        self.conn.execute(backend.build(&create_table)).await?;

        let create_index = Index::create()
            .name(format!("idx_{}_expiry_date", self.table_name))
            .table(self.table())
            .col(SessionColumn::ExpiryDate)
            .if_not_exists()
            .to_owned();
        self.conn.execute(backend.build(&create_index)).await?;

        Ok(())
    }

    fn select_by_id(&self, session_id: &Id) -> SelectStatement {
        Query::select()
            .column(SessionColumn::Id)
            .from(self.table())
            .and_where(Expr::col(SessionColumn::Id).eq(session_id.to_string()))
            .to_owned()
    }

    async fn exists<C: ConnectionTrait>(&self, conn: &C, session_id: &Id) -> Result<bool, DbErr> {
        let stmt = self.select_by_id(session_id);
        let row = conn.query_one(conn.get_database_backend().build(&stmt)).await?;
        Ok(row.is_some())
    }

    async fn upsert<C: ConnectionTrait>(&self, conn: &C, record: &Record) -> session_store::Result<()> {
        let data = rmp_serde::to_vec(record).map_err(|e| session_store::Error::Encode(e.to_string()))?;

        let stmt = Query::insert()
            .into_table(self.table())
            .columns([
                SessionColumn::Id,
                SessionColumn::Data,
                SessionColumn::ExpiryDate,
            ])
            .values([
                record.id.to_string().into(),
                data.into(),
                record.expiry_date.unix_timestamp().into(),
            ])
            .map_err(|e| session_store::Error::Encode(e.to_string()))?
            .on_conflict(
                OnConflict::column(SessionColumn::Id)
                    .update_columns([SessionColumn::Data, SessionColumn::ExpiryDate])
                    .to_owned(),
            )
            .to_owned();

        conn.execute(conn.get_database_backend().build(&stmt))
            .await
            .map_err(backend_error)?;

        Ok(())
    }
}

fn backend_error(e: impl Debug + ToString) -> session_store::Error {
    session_store::Error::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for SeaOrmStore {
    /// Inserts a new record, picking a fresh id if the generated one is
    /// already taken.
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let txn = self.conn.begin().await.map_err(backend_error)?;

        while self
            .exists(&txn, &record.id)
            .await
            .map_err(backend_error)?
        {
            record.id = Id::default();
        }

        self.upsert(&txn, record).await?;

        txn.commit().await.map_err(backend_error)?;

        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.upsert(&self.conn, record).await
    }

    /// Loads a record, treating expired rows as absent.
    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let stmt = Query::select()
            .column(SessionColumn::Data)
            .from(self.table())
            .and_where(Expr::col(SessionColumn::Id).eq(session_id.to_string()))
            .and_where(Expr::col(SessionColumn::ExpiryDate).gt(now))
            .to_owned();

        let row = self
            .conn
            .query_one(self.conn.get_database_backend().build(&stmt))
            .await
            .map_err(backend_error)?;

        match row {
            Some(row) => {
                let data: Vec<u8> = row.try_get("", "data").map_err(backend_error)?;
                let record = rmp_serde::from_slice(&data)
                    .map_err(|e| session_store::Error::Decode(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let stmt = Query::delete()
            .from_table(self.table())
            .and_where(Expr::col(SessionColumn::Id).eq(session_id.to_string()))
            .to_owned();

        self.conn
            .execute(self.conn.get_database_backend().build(&stmt))
            .await
            .map_err(backend_error)?;

        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SeaOrmStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let stmt = Query::delete()
            .from_table(self.table())
            .and_where(Expr::col(SessionColumn::ExpiryDate).lt(now))
            .to_owned();

        let result = self
            .conn
            .execute(self.conn.get_database_backend().build(&stmt))
            .await
            .map_err(backend_error)?;

        tracing::debug!(removed = result.rows_affected(), "deleted expired sessions");

        Ok(())
    }
}
