//! PostgreSQL pool via sqlx.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Row as _, TypeInfo, ValueRef};

use crate::catalog::{BoundStatement, Dialect};
use crate::config::StoreConfig;
use crate::error::{OperationResult, StoreError};
use crate::lease::{BoxConnection, Connection, ConnectionPool};
use crate::row::{Param, RowSet, Value};

use super::column_names;

/// PostgreSQL-backed pool.
#[derive(Debug, Clone)]
pub struct PgPagePool {
    pool: PgPool,
}

impl PgPagePool {
    /// Open a PostgreSQL pool for `config.database_url`.
    ///
    /// # Arguments
    ///
    /// * `config` - URL, `max_connections` and `acquire_timeout_secs` are used
    ///
    /// # Errors
    ///
    /// Returns `ConnectionUnavailable` if the server cannot be reached.
    pub async fn connect(config: &StoreConfig) -> OperationResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.database_url)
            .await
            .map_err(StoreError::from_acquire)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionPool for PgPagePool {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn acquire(&self) -> OperationResult<BoxConnection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(StoreError::from_acquire)?;
        Ok(Box::new(PgLeased(conn)))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct PgLeased(PoolConnection<Postgres>);

#[async_trait]
impl Connection for PgLeased {
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
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Param],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn to_rowset(rows: &[PgRow]) -> OperationResult<RowSet> {
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

fn decode(row: &PgRow, idx: usize) -> OperationResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    match type_name.as_str() {
        "INT8" => Ok(Value::Int(row.try_get::<i64, _>(idx)?)),
        "INT4" => Ok(Value::Int(row.try_get::<i32, _>(idx)?.into())),
        "INT2" => Ok(Value::Int(row.try_get::<i16, _>(idx)?.into())),
        "FLOAT8" => Ok(Value::Real(row.try_get::<f64, _>(idx)?)),
        "FLOAT4" => Ok(Value::Real(row.try_get::<f32, _>(idx)?.into())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Ok(Value::Text(row.try_get::<String, _>(idx)?)),
        other => Err(StoreError::Execution(format!(
            "unsupported postgres column type {other} at {idx}"
        ))),
    }
}
