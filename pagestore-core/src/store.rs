//! The public page store facade.
//!
//! Every operation is spawned onto the Tokio runtime and returns a [`Pending`]
//! handle immediately. The handle resolves to exactly one [`OperationResult`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn, Instrument};

use crate::backend;
use crate::catalog::{Dialect, Operation, QueryCatalog};
use crate::config::StoreConfig;
use crate::error::{OperationResult, StoreError};
use crate::executor::Executor;
use crate::lease::{ConnectionPool, LeaseSnapshot, ScopedPool};
use crate::models::{Page, PageContent};

/// Async facade over the page table.
///
/// Cheap to clone; clones share the pool, catalog and lease counters.
/// Methods must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct PageStore {
    executor: Executor,
}

impl PageStore {
    /// Build a store and create the pages table.
    ///
    /// The store is only returned once table creation has succeeded.
    ///
    /// # Arguments
    ///
    /// * `pool` - Connection source; every operation leases from it
    /// * `catalog` - Statements for the pool's dialect
    ///
    /// # Errors
    ///
    /// Returns `Config` if the catalog and pool dialects differ, or the
    /// table-creation failure (`ConnectionUnavailable`, `Execution`, ...).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pool = Arc::new(SqlitePagePool::connect(&config).await?);
    /// let store = PageStore::open(pool, QueryCatalog::for_dialect(Dialect::Sqlite)).await?;
    /// ```
    pub async fn open(pool: Arc<dyn ConnectionPool>, catalog: QueryCatalog) -> OperationResult<Self> {
        if pool.dialect() != catalog.dialect() {
            return Err(StoreError::Config(format!(
                "catalog dialect {} does not match pool dialect {}",
                catalog.dialect(),
                pool.dialect()
            )));
        }

        let store = Self {
            executor: Executor::new(Arc::new(catalog), ScopedPool::new(pool)),
        };
        store.create_table().await?;

        info!(dialect = %store.dialect(), "page store ready");
        Ok(store)
    }

    /// Open the configured pool, then [`PageStore::open`] it.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unusable config (unknown dialect, bad override),
    /// `ConnectionUnavailable` if the database cannot be reached, or any
    /// [`PageStore::open`] failure.
    pub async fn connect(config: &StoreConfig) -> OperationResult<Self> {
        let catalog = config.catalog()?;
        let pool = backend::connect(config).await?;
        Self::open(pool, catalog).await
    }

    pub fn dialect(&self) -> Dialect {
        self.executor.catalog().dialect()
    }

    pub fn lease_stats(&self) -> LeaseSnapshot {
        self.executor.lease_stats()
    }

    /// Close the underlying pool. Later operations fail with `ConnectionUnavailable`.
    pub async fn close(&self) {
        self.executor.close().await;
    }

    /// Idempotent.
    pub fn create_table(&self) -> Pending<()> {
        self.dispatch(Operation::CreatePagesTable, |exec| async move {
            exec.create_table().await
        })
    }

    /// All page names, ascending.
    pub fn list_page_names(&self) -> Pending<Vec<String>> {
        self.dispatch(Operation::AllPages, |exec| async move {
            exec.list_page_names().await
        })
    }

    pub fn fetch_page(&self, name: impl Into<String>) -> Pending<Option<PageContent>> {
        let name = name.into();
        self.dispatch(Operation::GetPage, |exec| async move {
            exec.fetch_page(name).await
        })
    }

    pub fn fetch_page_by_id(&self, id: i64) -> Pending<Option<Page>> {
        self.dispatch(Operation::GetPageById, move |exec| async move {
            exec.fetch_page_by_id(id).await
        })
    }

    pub fn create_page(&self, name: impl Into<String>, markdown: impl Into<String>) -> Pending<()> {
        let (name, markdown) = (name.into(), markdown.into());
        self.dispatch(Operation::CreatePage, |exec| async move {
            exec.create_page(name, markdown).await
        })
    }

    pub fn save_page(&self, id: i64, markdown: impl Into<String>) -> Pending<()> {
        let markdown = markdown.into();
        self.dispatch(Operation::SavePage, move |exec| async move {
            exec.save_page(id, markdown).await
        })
    }

    pub fn delete_page(&self, id: i64) -> Pending<()> {
        self.dispatch(Operation::DeletePage, move |exec| async move {
            exec.delete_page(id).await
        })
    }

    /// Every page, in storage order.
    pub fn fetch_all_pages_data(&self) -> Pending<Vec<Page>> {
        self.dispatch(Operation::AllPagesData, |exec| async move {
            exec.fetch_all_pages_data().await
        })
    }

    fn dispatch<T, F, Fut>(&self, op: Operation, run: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Executor) -> Fut,
        Fut: Future<Output = OperationResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let work = run(self.executor.clone());
        let span = tracing::debug_span!("page_store_op", op = %op);

        let task = tokio::spawn(
            async move {
                debug!("operation started");
                let result = work.await;
                match &result {
                    Ok(_) => debug!("operation completed"),
                    Err(err) => warn!(error = %err, "operation failed"),
                }
                // a dropped receiver means the caller stopped waiting
                let _ = tx.send(result);
            }
            .instrument(span),
        );

        Pending {
            op,
            rx,
            abort: task.abort_handle(),
        }
    }
}

/// Handle to one in-flight operation.
///
/// Resolves exactly once. Dropping it does not stop the operation; use
/// [`Pending::cancel`] for that.
#[must_use = "an operation's outcome is only observable through its Pending handle"]
pub struct Pending<T> {
    op: Operation,
    rx: oneshot::Receiver<OperationResult<T>>,
    abort: AbortHandle,
}

impl<T> Pending<T> {
    pub fn operation(&self) -> Operation {
        self.op
    }

    /// Abort the operation. Its lease, if any, is released; the handle then
    /// resolves to `Cancelled` unless the result was already delivered.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Deliver the outcome to `callback` instead of awaiting it.
    pub fn on_complete<F>(self, callback: F)
    where
        T: Send + 'static,
        F: FnOnce(OperationResult<T>) + Send + 'static,
    {
        tokio::spawn(async move { callback(self.await) });
    }
}

impl<T> Future for Pending<T> {
    type Output = OperationResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let op = self.op;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StoreError::Cancelled(op))))
    }
}
