//! In-memory pool double for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::{BoundStatement, Dialect};
use crate::error::{OperationResult, StoreError};
use crate::lease::{BoxConnection, Connection, ConnectionPool};
use crate::row::{Param, RowSet};

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Rows(RowSet),
    Affected(u64),
    Fail(String),
    /// Never completes; used to observe cancellation.
    Hang,
}

#[derive(Clone)]
pub(crate) struct FakePool {
    inner: Arc<Inner>,
}

struct Inner {
    behavior: Behavior,
    available: bool,
    releases: AtomicUsize,
    executed: Mutex<Vec<(String, Vec<Param>)>>,
}

impl FakePool {
    pub(crate) fn new(behavior: Behavior) -> Self {
        Self {
            inner: Arc::new(Inner {
                behavior,
                available: true,
                releases: AtomicUsize::new(0),
                executed: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn exhausted(self) -> Self {
        Self {
            inner: Arc::new(Inner {
                behavior: self.inner.behavior.clone(),
                available: false,
                releases: AtomicUsize::new(0),
                executed: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn into_pool(self) -> Arc<dyn ConnectionPool> {
        Arc::new(self)
    }

    pub(crate) fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn executed(&self) -> Vec<(String, Vec<Param>)> {
        self.inner.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn acquire(&self) -> OperationResult<BoxConnection> {
        if !self.inner.available {
            return Err(StoreError::ConnectionUnavailable("pool exhausted".into()));
        }
        Ok(Box::new(FakeConnection {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn close(&self) {}
}

struct FakeConnection {
    inner: Arc<Inner>,
}

impl FakeConnection {
    async fn run(&self, stmt: &BoundStatement) -> OperationResult<&Behavior> {
        self.inner
            .executed
            .lock()
            .unwrap()
            .push((stmt.sql().to_owned(), stmt.params().to_vec()));
        match &self.inner.behavior {
            Behavior::Fail(msg) => Err(StoreError::Execution(msg.clone())),
            Behavior::Hang => std::future::pending().await,
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn query(&mut self, stmt: &BoundStatement) -> OperationResult<RowSet> {
        match self.run(stmt).await? {
            Behavior::Rows(rows) => Ok(rows.clone()),
            _ => Ok(RowSet::default()),
        }
    }

    async fn update(&mut self, stmt: &BoundStatement) -> OperationResult<u64> {
        match self.run(stmt).await? {
            Behavior::Affected(n) => Ok(*n),
            _ => Ok(0),
        }
    }

    fn release(&mut self) {
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
    }
}
