//! Operation executor: lookup -> bind -> execute on a lease -> map.
//!
//! Each operation is one linear pipeline over [`ScopedPool::with_connection`].
//! Lookup and binding happen before a lease is taken, so a catalog miss or an
//! arity mismatch never touches the pool.

use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::catalog::{Operation, QueryCatalog};
use crate::composer::sorted_names;
use crate::error::OperationResult;
use crate::lease::{LeaseSnapshot, ScopedPool};
use crate::models::{Page, PageContent};
use crate::row::{Param, RowSet};

#[derive(Clone)]
pub struct Executor {
    catalog: Arc<QueryCatalog>,
    pool: ScopedPool,
}

impl Executor {
    pub fn new(catalog: Arc<QueryCatalog>, pool: ScopedPool) -> Self {
        Self { catalog, pool }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    pub fn lease_stats(&self) -> LeaseSnapshot {
        self.pool.stats()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run a read and shape its rows while the lease is still held.
    async fn read<T, F>(&self, op: Operation, params: Vec<Param>, map: F) -> OperationResult<T>
    where
        T: Send + 'static,
        F: FnOnce(RowSet) -> OperationResult<T> + Send + 'static,
    {
        let stmt = self.catalog.prepare(op, params)?;
        self.pool
            .with_connection(|conn| {
                async move {
                    let rows = conn.query(&stmt).await?;
                    debug!(op = %op, rows = rows.num_rows(), "read completed");
                    map(rows)
                }
                .boxed()
            })
            .await
    }

    /// Run a write. The affected-row count is logged, never checked.
    async fn write(&self, op: Operation, params: Vec<Param>) -> OperationResult<()> {
        let stmt = self.catalog.prepare(op, params)?;
        let affected = self
            .pool
            .with_connection(|conn| async move { conn.update(&stmt).await }.boxed())
            .await?;
        debug!(op = %op, affected, "write completed");
        Ok(())
    }

    pub async fn create_table(&self) -> OperationResult<()> {
        self.write(Operation::CreatePagesTable, vec![]).await
    }

    pub async fn list_page_names(&self) -> OperationResult<Vec<String>> {
        self.read(Operation::AllPages, vec![], |rows| {
            sorted_names(rows.into_rows())
        })
        .await
    }

    pub async fn fetch_page(&self, name: String) -> OperationResult<Option<PageContent>> {
        self.read(Operation::GetPage, vec![name.into()], |rows| {
            rows.first().map(PageContent::from_row).transpose()
        })
        .await
    }

    pub async fn fetch_page_by_id(&self, id: i64) -> OperationResult<Option<Page>> {
        self.read(Operation::GetPageById, vec![id.into()], |rows| {
            rows.first().map(Page::from_row).transpose()
        })
        .await
    }

    pub async fn create_page(&self, name: String, markdown: String) -> OperationResult<()> {
        self.write(Operation::CreatePage, vec![name.into(), markdown.into()])
            .await
    }

    /// Zero rows affected (unknown id) is still a success.
    pub async fn save_page(&self, id: i64, markdown: String) -> OperationResult<()> {
        self.write(Operation::SavePage, vec![markdown.into(), id.into()])
            .await
    }

    /// Zero rows affected (unknown id) is still a success.
    pub async fn delete_page(&self, id: i64) -> OperationResult<()> {
        self.write(Operation::DeletePage, vec![id.into()]).await
    }

    pub async fn fetch_all_pages_data(&self) -> OperationResult<Vec<Page>> {
        self.read(Operation::AllPagesData, vec![], |rows| {
            rows.rows().map(Page::from_row).collect()
        })
        .await
    }
}
