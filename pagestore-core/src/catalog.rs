//! Query catalog: logical operation -> parameterized statement, per dialect.
//!
//! The built-in statements are static and keyed by `(Operation, Dialect)`.
//! A catalog is assembled once at startup (optionally with overrides from
//! configuration) and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OperationResult, StoreError};
use crate::row::Param;

/// One named unit of work against the page store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    CreatePagesTable,
    AllPages,
    GetPage,
    GetPageById,
    CreatePage,
    SavePage,
    DeletePage,
    AllPagesData,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::CreatePagesTable,
        Operation::AllPages,
        Operation::GetPage,
        Operation::GetPageById,
        Operation::CreatePage,
        Operation::SavePage,
        Operation::DeletePage,
        Operation::AllPagesData,
    ];

    /// Stable key used in config files and log fields.
    pub fn key(self) -> &'static str {
        match self {
            Operation::CreatePagesTable => "create_pages_table",
            Operation::AllPages => "all_pages",
            Operation::GetPage => "get_page",
            Operation::GetPageById => "get_page_by_id",
            Operation::CreatePage => "create_page",
            Operation::SavePage => "save_page",
            Operation::DeletePage => "delete_page",
            Operation::AllPagesData => "all_pages_data",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Operation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.key() == s)
            .ok_or_else(|| StoreError::Config(format!("unknown operation key '{s}'")))
    }
}

/// SQL dialect of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Infer the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Some(Dialect::Sqlite),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            _ => None,
        }
    }

    /// Count positional parameters in `sql`.
    ///
    /// Quoted literals, quoted identifiers and comments are skipped. Numbered
    /// placeholders (`?NNN` on SQLite, `$n` on PostgreSQL) count as the highest
    /// number used; a bare SQLite `?` takes the next number after the highest so far.
    pub fn placeholder_count(self, sql: &str) -> usize {
        let mut count = 0usize;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match (self, c) {
                (_, '\'') | (_, '"') => {
                    for inner in chars.by_ref() {
                        if inner == c {
                            break;
                        }
                    }
                }
                (_, '-') if chars.peek() == Some(&'-') => {
                    for inner in chars.by_ref() {
                        if inner == '\n' {
                            break;
                        }
                    }
                }
                (_, '/') if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    for inner in chars.by_ref() {
                        if prev == '*' && inner == '/' {
                            break;
                        }
                        prev = inner;
                    }
                }
                (Dialect::Sqlite, '?') => match take_number(&mut chars) {
                    Some(n) => count = count.max(n),
                    None => count += 1,
                },
                (Dialect::Postgres, '$') => {
                    if let Some(n) = take_number(&mut chars) {
                        count = count.max(n);
                    }
                }
                _ => {}
            }
        }
        count
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(d);
        chars.next();
    }
    digits.parse().ok()
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => f.write_str("sqlite"),
            Dialect::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for Dialect {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(StoreError::Config(format!("unsupported dialect '{other}'"))),
        }
    }
}

fn builtin(op: Operation, dialect: Dialect) -> (&'static str, usize) {
    use Dialect::*;
    use Operation::*;

    match (op, dialect) {
        (CreatePagesTable, Sqlite) => (
            "CREATE TABLE IF NOT EXISTS pages (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name VARCHAR(255) NOT NULL UNIQUE, \
             content TEXT)",
            0,
        ),
        (CreatePagesTable, Postgres) => (
            "CREATE TABLE IF NOT EXISTS pages (\
             id BIGSERIAL PRIMARY KEY, \
             name VARCHAR(255) NOT NULL UNIQUE, \
             content TEXT)",
            0,
        ),
        (AllPages, _) => ("SELECT name FROM pages", 0),
        (GetPage, Sqlite) => ("SELECT id, content FROM pages WHERE name = ?", 1),
        (GetPage, Postgres) => ("SELECT id, content FROM pages WHERE name = $1", 1),
        (GetPageById, Sqlite) => ("SELECT id, name, content FROM pages WHERE id = ?", 1),
        (GetPageById, Postgres) => ("SELECT id, name, content FROM pages WHERE id = $1", 1),
        (CreatePage, Sqlite) => ("INSERT INTO pages (name, content) VALUES (?, ?)", 2),
        (CreatePage, Postgres) => ("INSERT INTO pages (name, content) VALUES ($1, $2)", 2),
        (SavePage, Sqlite) => ("UPDATE pages SET content = ? WHERE id = ?", 2),
        (SavePage, Postgres) => ("UPDATE pages SET content = $1 WHERE id = $2", 2),
        (DeletePage, Sqlite) => ("DELETE FROM pages WHERE id = ?", 1),
        (DeletePage, Postgres) => ("DELETE FROM pages WHERE id = $1", 1),
        (AllPagesData, _) => ("SELECT id, name, content FROM pages ORDER BY id", 0),
    }
}

/// Parameterized SQL text plus the number of positional parameters it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementTemplate {
    sql: Arc<str>,
    arity: usize,
}

impl StatementTemplate {
    pub fn new(sql: impl Into<Arc<str>>, arity: usize) -> Self {
        Self {
            sql: sql.into(),
            arity,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Bind parameters positionally. Count must match the template exactly.
    pub fn bind(&self, operation: Operation, params: Vec<Param>) -> OperationResult<BoundStatement> {
        if params.len() != self.arity {
            return Err(StoreError::ParameterBinding {
                operation,
                expected: self.arity,
                actual: params.len(),
            });
        }
        Ok(BoundStatement {
            operation,
            sql: Arc::clone(&self.sql),
            params,
        })
    }
}

/// A template with its parameters attached, ready to run on a leased connection.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    operation: Operation,
    sql: Arc<str>,
    params: Vec<Param>,
}

impl BoundStatement {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

/// Immutable `Operation -> StatementTemplate` mapping for one dialect.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    dialect: Dialect,
    statements: HashMap<Operation, StatementTemplate>,
}

impl QueryCatalog {
    /// Built-in statements for `dialect`.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let statements = Operation::ALL
            .into_iter()
            .map(|op| {
                let (sql, arity) = builtin(op, dialect);
                (op, StatementTemplate::new(sql, arity))
            })
            .collect();
        Self {
            dialect,
            statements,
        }
    }

    /// A catalog holding only the given statements. Missing operations fail on lookup.
    pub fn from_statements<I, S>(dialect: Dialect, statements: I) -> Self
    where
        I: IntoIterator<Item = (Operation, S)>,
        S: Into<Arc<str>>,
    {
        let mut catalog = Self {
            dialect,
            statements: HashMap::new(),
        };
        catalog.extend(statements);
        catalog
    }

    /// Built-in statements with config-provided overrides keyed by operation key.
    pub fn with_overrides(
        dialect: Dialect,
        overrides: &HashMap<String, String>,
    ) -> OperationResult<Self> {
        let parsed = overrides
            .iter()
            .map(|(key, sql)| -> OperationResult<(Operation, String)> {
                Ok((key.parse()?, sql.clone()))
            })
            .collect::<OperationResult<Vec<_>>>()?;

        let mut catalog = Self::for_dialect(dialect);
        catalog.extend(parsed);
        Ok(catalog)
    }

    fn extend<I, S>(&mut self, statements: I)
    where
        I: IntoIterator<Item = (Operation, S)>,
        S: Into<Arc<str>>,
    {
        for (op, sql) in statements {
            let sql: Arc<str> = sql.into();
            let arity = self.dialect.placeholder_count(&sql);
            self.statements.insert(op, StatementTemplate::new(sql, arity));
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn lookup(&self, op: Operation) -> OperationResult<&StatementTemplate> {
        self.statements
            .get(&op)
            .ok_or(StoreError::UnknownOperation(op))
    }

    /// Lookup and bind in one step.
    pub fn prepare(&self, op: Operation, params: Vec<Param>) -> OperationResult<BoundStatement> {
        self.lookup(op)?.bind(op, params)
    }
}
