//! SQLite-backed [`Backend`] that mirrors the hosted table's row semantics.
//!
//! Rows get a UUID `id` and a strictly increasing `created_at` on insert,
//! every mutation answers with the affected rows (`RETURNING *`), and
//! [`Filter::ILike`] is evaluated by a Unicode-aware `ilike()` SQL function.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};
use std::cell::Cell;
use std::path::Path;
use uuid::Uuid;

use crate::core::backend::Backend;
use crate::core::operation::{Filter, Operation, Query, Response};
use crate::{PodupuError, Result};

/// Columns the store fills in itself.
const ASSIGNED_COLUMNS: [&str; 2] = ["id", "created_at"];

pub struct SqliteBackend {
    conn: Connection,
    last_created_at: Cell<Option<DateTime<Utc>>>,
}

impl SqliteBackend {
    /// Opens (creating if needed) a database file and ensures the riddle table exists.
    ///
    /// # Errors
    ///
    /// Returns [`PodupuError::Database`] for any SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// # Errors
    ///
    /// Returns [`PodupuError::Database`] for any SQLite failure.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        register_ilike(&conn)?;

        let latest: Option<String> =
            conn.query_row("SELECT MAX(created_at) FROM podupu_kathalu", [], |row| row.get(0))?;
        let last_created_at = latest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc));

        Ok(Self {
            conn,
            last_created_at: Cell::new(last_created_at),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Current time at the stored (microsecond) resolution, bumped past the
    /// previous insert so insertion order and `created_at` order agree.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let next = match self.last_created_at.get() {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at.set(Some(next));
        next
    }

    fn insert(&self, table: &str, row: &Map<String, Value>) -> Result<Vec<Value>> {
        reject_assigned_columns(row)?;

        let created_at = self.next_created_at().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut columns = vec![identifier("id")?, identifier("created_at")?];
        let mut params = vec![
            SqlValue::Text(Uuid::new_v4().to_string()),
            SqlValue::Text(created_at),
        ];
        for (column, value) in row {
            columns.push(identifier(column)?);
            params.push(to_sql_value(value));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING *",
            columns.join(", ")
        );
        self.fetch(&sql, &params)
    }

    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM {table}");

        if !query.filters.is_empty() {
            let mut clauses = Vec::with_capacity(query.filters.len());
            for filter in &query.filters {
                clauses.push(where_clause(filter, &mut params)?);
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if let Some(order) = &query.order {
            let direction = if order.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(" ORDER BY {} {direction}", identifier(&order.column)?));
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(i64::from(limit)));
        }

        self.fetch(&sql, &params)
    }

    fn update(&self, table: &str, key: &Filter, values: &Map<String, Value>) -> Result<Vec<Value>> {
        reject_assigned_columns(values)?;
        if values.is_empty() {
            return Err(PodupuError::Backend("Update carries no values".to_string()));
        }

        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (column, value) in values {
            assignments.push(format!("{} = ?", identifier(column)?));
            params.push(to_sql_value(value));
        }
        let clause = where_clause(key, &mut params)?;

        let sql = format!(
            "UPDATE {table} SET {} WHERE {clause} RETURNING *",
            assignments.join(", ")
        );
        self.fetch(&sql, &params)
    }

    fn delete(&self, table: &str, key: &Filter) -> Result<Vec<Value>> {
        let mut params = Vec::new();
        let clause = where_clause(key, &mut params)?;
        self.fetch(&format!("DELETE FROM {table} WHERE {clause} RETURNING *"), &params)
    }

    /// Runs `sql` and maps every result row to a JSON object keyed by column name.
    fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            let mut object = Map::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                object.insert(name.clone(), from_sql_value(row.get_ref(i)?));
            }
            Ok(Value::Object(object))
        })?;
        let values = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }
}

impl Backend for SqliteBackend {
    fn execute(&self, op: &Operation) -> Result<Response> {
        let table = identifier(op.table())?;
        let rows = match op {
            Operation::Insert { row, .. } => self.insert(&table, row)?,
            Operation::Select { query, .. } => self.select(&table, query)?,
            Operation::Update { key, values, .. } => self.update(&table, key, values)?,
            Operation::Delete { key, .. } => self.delete(&table, key)?,
        };
        let count = rows.len();
        Ok(Response {
            data: rows,
            count: Some(count),
        })
    }
}

/// Renders `filter` as SQL, appending its bound values to `params` in order.
fn where_clause(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    match filter {
        Filter::Eq { column, value } => {
            params.push(SqlValue::Text(value.clone()));
            Ok(format!("{} = ?", identifier(column)?))
        }
        Filter::ILike { column, pattern } => {
            params.push(SqlValue::Text(pattern.clone()));
            Ok(format!("ilike({}, ?)", identifier(column)?))
        }
        Filter::Or { filters } if filters.is_empty() => Ok("0".to_string()),
        Filter::Or { filters } => {
            let mut parts = Vec::with_capacity(filters.len());
            for inner in filters {
                parts.push(where_clause(inner, params)?);
            }
            Ok(format!("({})", parts.join(" OR ")))
        }
    }
}

/// Quotes a table or column name, accepting only `[A-Za-z_][A-Za-z0-9_]*`.
fn identifier(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PodupuError::Backend(format!("Invalid identifier: {name:?}")));
    }
    Ok(format!("\"{name}\""))
}

fn reject_assigned_columns(values: &Map<String, Value>) -> Result<()> {
    match ASSIGNED_COLUMNS.iter().find(|c| values.contains_key(**c)) {
        Some(column) => Err(PodupuError::Backend(format!(
            "Column {column} is assigned by the backend and cannot be written"
        ))),
        None => Ok(()),
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn register_ilike(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "ilike",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            let pattern = ctx.get::<Option<String>>(1)?;
            Ok(match (text, pattern) {
                (Some(text), Some(pattern)) => like_matches(&pattern, &text),
                _ => false,
            })
        },
    )
}

/// Case-insensitive SQL LIKE: `%` matches any run of characters, `_` exactly one.
pub(crate) fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `%` seen and the text index it is currently covering up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, covered)) => {
                    backtrack = Some((star, covered + 1));
                    p = star + 1;
                    t = covered + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}
