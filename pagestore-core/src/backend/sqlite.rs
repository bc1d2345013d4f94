//! SQLite pool via sqlx.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row as _, TypeInfo, ValueRef};

use crate::catalog::{BoundStatement, Dialect};
use crate::config::StoreConfig;
use crate::error::{OperationResult, StoreError};
use crate::lease::{BoxConnection, Connection, ConnectionPool};
use crate::row::{Param, RowSet, Value};

use super::column_names;

/// SQLite-backed pool.
#[derive(Debug, Clone)]
pub struct SqlitePagePool {
    pool: SqlitePool,
}

impl SqlitePagePool {
    /// Open a pool for `config.database_url`.
    ///
    /// WAL with a busy timeout so concurrent writers queue instead of failing with SQLITE_BUSY.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a malformed URL and `ConnectionUnavailable` if the
    /// database cannot be opened.
    pub async fn connect(config: &StoreConfig) -> OperationResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Config(e.to_string()))?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(StoreError::from_acquire)?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionPool for SqlitePagePool {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn acquire(&self) -> OperationResult<BoxConnection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(StoreError::from_acquire)?;
        Ok(Box::new(SqliteLeased(conn)))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A leased SQLite connection; goes back to the pool when dropped.
struct SqliteLeased(PoolConnection<Sqlite>);

#[async_trait]
impl Connection for SqliteLeased {
    async fn query(&mut self, stmt: &BoundStatement) -> OperationResult<RowSet> {
        let rows = bind(sqlx::query(stmt.sql()), stmt.params())
            .fetch_all(&mut *self.0)
            .await?;
        to_rowset(&rows)
    }

    async fn update(&mut self, stmt: &BoundStatement) -> OperationResult<u64> {
        let done = bind(sqlx::query(stmt.sql()), stmt.params())
            .execute(&mut *self.0)
            .await?;
        Ok(done.rows_affected())
    }
}

fn bind<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn to_rowset(rows: &[SqliteRow]) -> OperationResult<RowSet> {
    let columns = column_names(rows);
    let values = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|idx| decode(row, idx))
                .collect::<OperationResult<Vec<Value>>>()
        })
        .collect::<OperationResult<Vec<_>>>()?;
    Ok(RowSet::new(columns, values))
}

fn decode(row: &SqliteRow, idx: usize) -> OperationResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Ok(Value::Int(row.try_get::<i64, _>(idx)?)),
        "REAL" | "NUMERIC" => Ok(Value::Real(row.try_get::<f64, _>(idx)?)),
        "TEXT" => Ok(Value::Text(row.try_get::<String, _>(idx)?)),
        other => Err(StoreError::Execution(format!(
            "unsupported sqlite column type {other} at {idx}"
        ))),
    }
}
