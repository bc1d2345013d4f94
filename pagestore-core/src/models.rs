//! Domain records produced from result rows.

use serde::Serialize;

use crate::error::OperationResult;
use crate::row::Row;

/// A stored wiki page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub content: String,
}

impl Page {
    /// Read `id`, `name`, `content` by column name, positionally when names are absent.
    pub fn from_row(row: &Row) -> OperationResult<Self> {
        Ok(Self {
            id: row.int(row.index_of("id", 0))?,
            name: row.text(row.index_of("name", 1))?,
            content: row.text_or_empty(row.index_of("content", 2))?,
        })
    }
}

/// Result of looking a page up by name: its id and raw markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub id: i64,
    pub raw_content: String,
}

impl PageContent {
    /// Positional: column 0 is the id, column 1 the content.
    pub fn from_row(row: &Row) -> OperationResult<Self> {
        Ok(Self {
            id: row.int(0)?,
            raw_content: row.text_or_empty(1)?,
        })
    }
}
