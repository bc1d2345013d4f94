//! sqlx-backed implementations of the pool contract.

pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use sqlx::Column;

use crate::catalog::Dialect;
use crate::config::StoreConfig;
use crate::error::OperationResult;
use crate::lease::ConnectionPool;

pub use postgres::PgPagePool;
pub use sqlite::SqlitePagePool;

/// Open the physical pool matching the configured dialect.
///
/// # Errors
///
/// Returns `Config` if no dialect can be resolved, otherwise whatever the
/// dialect's pool constructor reports.
pub async fn connect(config: &StoreConfig) -> OperationResult<Arc<dyn ConnectionPool>> {
    let pool: Arc<dyn ConnectionPool> = match config.resolved_dialect()? {
        Dialect::Sqlite => Arc::new(SqlitePagePool::connect(config).await?),
        Dialect::Postgres => Arc::new(PgPagePool::connect(config).await?),
    };
    Ok(pool)
}

/// Column names as reported by the first row; empty for an empty result.
pub(crate) fn column_names<R: sqlx::Row>(rows: &[R]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().iter().map(|c| c.name().to_owned()).collect())
        .unwrap_or_default()
}
