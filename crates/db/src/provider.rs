//! The data-access and query-validation layer.
//!
//! A provider owns one logical SQLite connection, opened lazily on the first
//! `fetch_data`/`validate_query` call and closed exactly once by `close`. The
//! read-check-create-assign sequence on the connection slot is serialized by
//! an async mutex, so concurrent callers can never race a second connection
//! into existence.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use macroquery_core::schema::{schema_text, ColumnSpec, DataSource, Row, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, Connection, Row as _, SqliteConnection, TypeInfo, ValueRef};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::loader;

#[derive(Debug, Error)]
pub enum DataError {
    /// Source file missing, malformed, or the bulk load itself failed.
    /// Surfaced at construction; fatal, never retried.
    #[error("failed to load source data from `{path}`: {reason}")]
    Load { path: PathBuf, reason: String },
    /// The backing-store handle could not be opened or shut down.
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),
    /// The store rejected a query at execution time. Propagated verbatim,
    /// never silently swallowed.
    #[error("query execution failed: {0}")]
    QueryExecution(#[source] sqlx::Error),
    /// The provider was shut down; it does not reopen.
    #[error("data provider is closed")]
    ProviderClosed,
}

/// Read-only bridge between an arbitrary query string and either a validity
/// verdict or a materialized result set.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// The query-language variant the backing store accepts. Callers use it
    /// to phrase queries; the provider does not enforce conformance.
    fn dialect(&self) -> &'static str;

    /// The immutable set of queryable tables this provider exposes.
    fn data_sources(&self) -> &[DataSource];

    /// Human/LLM-readable serialization of every data source.
    fn schema_text(&self) -> String {
        schema_text(self.data_sources())
    }

    /// Executes `query` and returns the result rows. No implicit validation
    /// happens here; call [`DataProvider::validate_query`] first for a safety
    /// net. Engine rejections surface as [`DataError::QueryExecution`].
    async fn fetch_data(&self, query: &str) -> Result<Vec<Row>, DataError>;

    /// Plan-only check: asks the engine to parse and plan `query` without
    /// executing it. `Ok(false)` is the expected outcome for a malformed or
    /// unresolvable query; infrastructure failures propagate as errors
    /// instead of being coerced to `false`.
    async fn validate_query(&self, query: &str) -> Result<bool, DataError>;

    /// Closes the connection if one is open. Idempotent, and terminal:
    /// subsequent fetch/validate calls fail with
    /// [`DataError::ProviderClosed`].
    async fn close(&self) -> Result<(), DataError>;
}

/// Where the backing SQLite store lives.
#[derive(Clone, Debug)]
pub enum StoreLocation {
    /// A process-private, uniquely named shared-cache in-memory database.
    InMemory,
    /// A database file on disk, created if missing.
    File(PathBuf),
}

#[derive(Default)]
struct ConnectionSlot {
    conn: Option<SqliteConnection>,
    /// Pins a shared-cache in-memory database alive between the bulk load
    /// and `close`; SQLite drops the database when its last connection goes.
    keepalive: Option<SqliteConnection>,
    closed: bool,
}

/// [`DataProvider`] backed by a single SQLite database preloaded from a CSV
/// file. The table is named after the CSV file's stem.
pub struct SqliteDataProvider {
    connect_options: SqliteConnectOptions,
    sources: Vec<DataSource>,
    slot: Mutex<ConnectionSlot>,
    connections_opened: AtomicU64,
}

impl SqliteDataProvider {
    /// Bulk-loads `csv_path` into `store` and returns a provider whose query
    /// connection opens lazily on first use. `column_descriptions` annotate
    /// the inferred schema for [`DataProvider::schema_text`]; columns without
    /// an entry keep an empty description.
    pub async fn connect(
        csv_path: impl AsRef<Path>,
        store: StoreLocation,
        column_descriptions: &[(&str, &str)],
    ) -> Result<Self, DataError> {
        let csv_path = csv_path.as_ref();
        let connect_options = store.connect_options()?;

        let mut load_conn = SqliteConnection::connect_with(&connect_options)
            .await
            .map_err(DataError::Connection)?;
        let source = loader::load_csv(&mut load_conn, csv_path).await?;
        let source = describe_columns(source, column_descriptions);

        tracing::info!(
            event_name = "data.provider.ready",
            table = source.table_name(),
            columns = source.column_count(),
            "data provider loaded source data"
        );

        let keepalive = match store {
            StoreLocation::InMemory => Some(load_conn),
            StoreLocation::File(_) => {
                load_conn.close().await.map_err(DataError::Connection)?;
                None
            }
        };

        Ok(Self {
            connect_options,
            sources: vec![source],
            slot: Mutex::new(ConnectionSlot { keepalive, ..ConnectionSlot::default() }),
            connections_opened: AtomicU64::new(0),
        })
    }

    /// Number of lazy query connections opened so far. At most 1 for a
    /// provider that has not been closed, however many callers raced.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Lazily opens the shared connection. Must be called with the slot lock
    /// held; the lock guard keeps the read-check-create-assign sequence
    /// atomic across concurrent callers.
    async fn connection<'a>(
        &self,
        slot: &'a mut ConnectionSlot,
    ) -> Result<&'a mut SqliteConnection, DataError> {
        if slot.closed {
            return Err(DataError::ProviderClosed);
        }
        if slot.conn.is_none() {
            let conn = SqliteConnection::connect_with(&self.connect_options)
                .await
                .map_err(DataError::Connection)?;
            self.connections_opened.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                event_name = "data.provider.connection_opened",
                "opened lazy query connection"
            );
            slot.conn = Some(conn);
        }
        slot.conn.as_mut().ok_or(DataError::ProviderClosed)
    }
}

impl StoreLocation {
    fn connect_options(&self) -> Result<SqliteConnectOptions, DataError> {
        match self {
            // A unique name per provider keeps independent in-memory stores
            // (e.g. parallel tests) from sharing one database.
            Self::InMemory => SqliteConnectOptions::from_str(&format!(
                "sqlite:file:macroquery-{}?mode=memory&cache=shared",
                Uuid::new_v4()
            ))
            .map_err(DataError::Connection),
            Self::File(path) => {
                Ok(SqliteConnectOptions::new().filename(path).create_if_missing(true))
            }
        }
    }
}

#[async_trait]
impl DataProvider for SqliteDataProvider {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn data_sources(&self) -> &[DataSource] {
        &self.sources
    }

    async fn fetch_data(&self, query: &str) -> Result<Vec<Row>, DataError> {
        let mut slot = self.slot.lock().await;
        let conn = self.connection(&mut slot).await?;

        let rows = sqlx::query(query)
            .fetch_all(&mut *conn)
            .await
            .map_err(DataError::QueryExecution)?;
        rows.iter().map(decode_row).collect()
    }

    async fn validate_query(&self, query: &str) -> Result<bool, DataError> {
        let mut slot = self.slot.lock().await;
        let conn = self.connection(&mut slot).await?;

        // EXPLAIN makes SQLite parse and plan the statement without running
        // it, so a planning failure is the expected negative verdict.
        let explain = format!("EXPLAIN {query}");
        match sqlx::query(&explain).fetch_all(&mut *conn).await {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(error)) => {
                tracing::debug!(
                    event_name = "data.provider.query_rejected",
                    reason = %error,
                    "planner rejected candidate query"
                );
                Ok(false)
            }
            Err(error) => Err(DataError::QueryExecution(error)),
        }
    }

    async fn close(&self) -> Result<(), DataError> {
        let mut slot = self.slot.lock().await;
        slot.closed = true;
        if let Some(conn) = slot.conn.take() {
            conn.close().await.map_err(DataError::Connection)?;
        }
        if let Some(keepalive) = slot.keepalive.take() {
            keepalive.close().await.map_err(DataError::Connection)?;
        }
        tracing::debug!(event_name = "data.provider.closed", "data provider shut down");
        Ok(())
    }
}

fn describe_columns(source: DataSource, descriptions: &[(&str, &str)]) -> DataSource {
    let columns = source
        .columns()
        .iter()
        .map(|(name, spec)| {
            let description = descriptions
                .iter()
                .find(|(column, _)| column == name)
                .map(|(_, description)| *description)
                .unwrap_or("");
            (name.clone(), ColumnSpec::new(description, spec.column_type))
        })
        .collect();
    DataSource::new(source.table_name(), columns)
}

/// Decodes one SQLite result row into the ordered column -> value mapping,
/// preserving per-cell dynamic types.
fn decode_row(row: &SqliteRow) -> Result<Row, DataError> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(DataError::QueryExecution)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => {
                    Value::Integer(row.try_get(index).map_err(DataError::QueryExecution)?)
                }
                "REAL" => Value::Real(row.try_get(index).map_err(DataError::QueryExecution)?),
                _ => Value::Text(row.try_get(index).map_err(DataError::QueryExecution)?),
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}
