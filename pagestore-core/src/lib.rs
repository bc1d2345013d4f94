//! pagestore-core: async page storage over pooled SQL connections.
//!
//! Each operation leases one pooled connection, runs one parameterized
//! statement, shapes the rows, releases the lease and reports exactly one
//! outcome through a [`Pending`] handle.
//!
//! ```ignore
//! let store = PageStore::connect(&StoreConfig::with_url("sqlite://wiki.db")).await?;
//! store.create_page("Home", "# Welcome").await?;
//! let names = store.list_page_names().await?;
//! ```

pub mod backend;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod error;
pub mod executor;
pub mod lease;
pub mod models;
pub mod row;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{BoundStatement, Dialect, Operation, QueryCatalog, StatementTemplate};
pub use config::StoreConfig;
pub use error::{OperationResult, StoreError};
pub use lease::{BoxConnection, Connection, ConnectionPool, Lease, LeaseSnapshot, ScopedPool};
pub use models::{Page, PageContent};
pub use row::{Param, Row, RowSet, Value};
pub use store::{PageStore, Pending};
