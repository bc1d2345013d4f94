//! Scoped connection acquisition.
//!
//! The physical pool is an external collaborator seen through [`ConnectionPool`].
//! [`ScopedPool::with_connection`] leases one connection, runs one body against it
//! and releases the lease on every exit path. Release lives in `Drop`, so a task
//! aborted mid-statement still hands its connection back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::catalog::{BoundStatement, Dialect};
use crate::error::OperationResult;
use crate::row::RowSet;

/// One physical connection, exclusively owned while leased.
#[async_trait]
pub trait Connection: Send {
    /// Run a read and return its rows.
    async fn query(&mut self, stmt: &BoundStatement) -> OperationResult<RowSet>;

    /// Run a write and return the affected-row count.
    async fn update(&mut self, stmt: &BoundStatement) -> OperationResult<u64>;

    /// Hand the connection back. Called exactly once per lease, before the connection is dropped.
    fn release(&mut self) {}
}

pub type BoxConnection = Box<dyn Connection>;

/// Contract the store consumes from a connection pool.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Fails with `ConnectionUnavailable` when no connection can be supplied.
    async fn acquire(&self) -> OperationResult<BoxConnection>;

    async fn close(&self);
}

/// Lease accounting, updated atomically by every lease.
#[derive(Debug, Default)]
pub struct LeaseStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl LeaseStats {
    pub fn snapshot(&self) -> LeaseSnapshot {
        // released first: a concurrent lease can never make released exceed acquired
        let released = self.released.load(Ordering::SeqCst);
        let acquired = self.acquired.load(Ordering::SeqCst);
        LeaseSnapshot { acquired, released }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaseSnapshot {
    pub acquired: u64,
    pub released: u64,
}

impl LeaseSnapshot {
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Exclusive ownership of one pooled connection. Released exactly once, on drop.
pub struct Lease {
    conn: BoxConnection,
    stats: Arc<LeaseStats>,
}

impl Lease {
    fn new(conn: BoxConnection, stats: Arc<LeaseStats>) -> Self {
        stats.acquired.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("connection lease acquired");
        Self { conn, stats }
    }

    pub fn connection(&mut self) -> &mut BoxConnection {
        &mut self.conn
    }

    /// Release now rather than at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.conn.release();
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("connection lease released");
    }
}

/// A pool handle that only hands out connections inside a release-guaranteed scope.
#[derive(Clone)]
pub struct ScopedPool {
    pool: Arc<dyn ConnectionPool>,
    stats: Arc<LeaseStats>,
}

impl ScopedPool {
    pub fn new(pool: Arc<dyn ConnectionPool>) -> Self {
        Self {
            pool,
            stats: Arc::new(LeaseStats::default()),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    pub fn stats(&self) -> LeaseSnapshot {
        self.stats.snapshot()
    }

    pub async fn acquire(&self) -> OperationResult<Lease> {
        let conn = self.pool.acquire().await?;
        Ok(Lease::new(conn, Arc::clone(&self.stats)))
    }

    /// Acquire, run `body` once, release. `body` is not invoked if acquisition fails.
    ///
    /// No retries happen here; a failed acquisition or statement is returned as is.
    pub async fn with_connection<T, F>(&self, body: F) -> OperationResult<T>
    where
        F: for<'c> FnOnce(&'c mut BoxConnection) -> BoxFuture<'c, OperationResult<T>>,
    {
        let mut lease = self.acquire().await?;
        let result = body(lease.connection()).await;
        lease.release();
        result
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
