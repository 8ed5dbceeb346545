//! [`Backend`] implementation for the hosted PostgREST table interface.
//!
//! Translates an [`Operation`] into one HTTP request against
//! `{url}/rest/v1/{table}` and decodes the JSON rows that come back.

use reqwest::blocking::RequestBuilder;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::Method;
use serde_json::Value;

use crate::core::backend::Backend;
use crate::core::client::{describe_failure, Client};
use crate::core::operation::{Filter, Operation, Query, Response};
use crate::{PodupuError, Result};

const PREFER: &str = "Prefer";
const RETURN_ROWS: &str = "return=representation";
const RETURN_ROWS_AND_COUNT: &str = "return=representation,count=exact";

impl Client {
    /// The HTTP request that carries `op`, ready to send.
    pub(crate) fn build_request(&self, op: &Operation) -> Result<RequestBuilder> {
        let url = self.endpoint(&format!("rest/v1/{}", op.table()))?;
        let request = match op {
            Operation::Insert { row, .. } => self
                .request(Method::POST, url)
                .header(PREFER, RETURN_ROWS)
                .json(row),
            Operation::Select { query, .. } => {
                self.request(Method::GET, url).query(&select_params(query))
            }
            Operation::Update { key, values, .. } => self
                .request(Method::PATCH, url)
                .header(PREFER, RETURN_ROWS_AND_COUNT)
                .query(&[filter_param(key)])
                .json(values),
            Operation::Delete { key, .. } => self
                .request(Method::DELETE, url)
                .header(PREFER, RETURN_ROWS_AND_COUNT)
                .query(&[filter_param(key)]),
        };
        Ok(request)
    }
}

impl Backend for Client {
    fn execute(&self, op: &Operation) -> Result<Response> {
        let response = self
            .build_request(op)?
            .send()
            .map_err(|e| PodupuError::Backend(format!("{} {} failed: {e}", op.kind(), op.table())))?;
        let status = response.status();
        let count = reported_count(response.headers());
        let body = response
            .bytes()
            .map_err(|e| PodupuError::Backend(format!("Could not read response: {e}")))?;

        if !status.is_success() {
            return Err(PodupuError::Backend(describe_failure(status, &body)));
        }

        Ok(Response {
            data: parse_rows(&body)?,
            count,
        })
    }
}

/// Query-string parameters of a select: columns, filters, order and limit.
pub(crate) fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(query.filters.iter().map(filter_param));
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// A top-level filter as a `column=op.value` pair; value taken literally.
pub(crate) fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } => (column.clone(), format!("eq.{value}")),
        Filter::ILike { column, pattern } => (column.clone(), format!("ilike.{pattern}")),
        Filter::Or { filters } => ("or".to_string(), format!("({})", logic_tree(filters))),
    }
}

/// Members of an `or=(...)` tree, e.g. `question.ilike."%x%",answer.ilike."%x%"`.
fn logic_tree(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value } => format!("{column}.eq.{}", quote(value)),
            Filter::ILike { column, pattern } => format!("{column}.ilike.{}", quote(pattern)),
            Filter::Or { filters } => format!("or({})", logic_tree(filters)),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Double-quotes a value inside a logic tree so `,` `.` `:` `(` `)` stay literal.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Total from a `Content-Range: 0-1/2` header; `*/*` or a missing header gives `None`.
fn reported_count(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
}

pub(crate) fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Decodes a response body into rows. An empty body means no rows.
pub(crate) fn parse_rows(body: &[u8]) -> Result<Vec<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PodupuError::Backend(format!("Response is not JSON: {e}")))?;
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(_) => Ok(vec![value]),
        other => Err(PodupuError::Backend(format!("Unexpected response payload: {other}"))),
    }
}
