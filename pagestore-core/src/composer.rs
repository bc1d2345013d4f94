//! Row-stream shaping for the page-name listing.

use crate::error::OperationResult;
use crate::row::Row;

/// Project column 0 of every row, then sort ascending.
///
/// The projection is lazy; the first failing row short-circuits before anything is sorted.
pub fn sorted_names<I>(rows: I) -> OperationResult<Vec<String>>
where
    I: IntoIterator<Item = Row>,
{
    let mut names = rows
        .into_iter()
        .map(|row| row.text(0))
        .collect::<OperationResult<Vec<_>>>()?;
    names.sort_unstable();
    Ok(names)
}
