//! Backend-neutral request types understood by every [`Backend`](super::backend::Backend).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Filter {
    /// Exact match of `column` against `value`.
    Eq {
        column: String,
        value: String,
    },
    /// Case-insensitive LIKE match; `%` matches any run of characters and `_`
    /// matches exactly one.
    ILike {
        column: String,
        pattern: String,
    },
    /// Rows matching at least one of the inner filters.
    Or {
        filters: Vec<Filter>,
    },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike(column: &str, pattern: impl Into<String>) -> Self {
        Self::ILike {
            column: column.to_string(),
            pattern: pattern.into(),
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or { filters }
    }
}

/// Sort key of a select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A read over one table. `filters` are AND'd together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    /// `None` leaves the row cap to the backend.
    pub limit: Option<u32>,
}

/// One request to a backend.
///
/// Every operation targets a single table and is executed atomically;
/// there are no multi-operation transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Insert one row; the backend assigns `id` and `created_at`.
    Insert {
        table: String,
        row: Map<String, Value>,
    },
    /// Read rows.
    Select {
        table: String,
        query: Query,
    },
    /// Overwrite `values` on every row matching `key`.
    Update {
        table: String,
        key: Filter,
        values: Map<String, Value>,
    },
    /// Remove every row matching `key`.
    Delete {
        table: String,
        key: Filter,
    },
}

impl Operation {
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. }
            | Self::Select { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Select { .. } => "select",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// What a backend returns for an executed operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Rows returned (selected, inserted, updated or deleted).
    pub data: Vec<Value>,
    /// Number of affected rows when the backend reports it separately.
    pub count: Option<usize>,
}

impl Response {
    /// Rows affected by the operation: the reported count, else the number of returned rows.
    pub fn affected(&self) -> usize {
        self.count.unwrap_or(self.data.len())
    }
}
