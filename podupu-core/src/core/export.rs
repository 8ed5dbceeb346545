//! CSV and JSON serialization of record lists for download.
//!
//! Encoding is pure and deterministic: the same records always produce the
//! same bytes. Column order follows the serialized field order of the
//! records, which for [`Riddle`](crate::Riddle) is its struct field order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{PodupuError, Result};

/// Download formats offered for a list result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Csv, ExportFormat::Json];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Suggested file name for the download.
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "podupu_kathalu.csv",
            ExportFormat::Json => "podupu_kathalu.json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    /// Encodes `records` in this format.
    ///
    /// # Errors
    ///
    /// See [`to_csv_bytes`] and [`to_json_bytes`].
    pub fn encode<T: Serialize>(self, records: &[T]) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => to_csv_bytes(records),
            ExportFormat::Json => to_json_bytes(records),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = PodupuError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(PodupuError::Validation(format!("Unknown export format: {s}"))),
        }
    }
}

/// Encodes records as UTF-8 CSV with a single header row.
///
/// Every line, the last included, ends in `\n`. An empty slice encodes to an
/// empty byte vector.
///
/// # Errors
///
/// Returns [`PodupuError::Json`] if a record fails to serialize, and
/// [`PodupuError::Validation`] if a record does not serialize to an object.
pub fn to_csv_bytes<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let rows = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(PodupuError::Validation(format!(
                "CSV rows must be objects, got {other}"
            ))),
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut columns: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key.as_str());
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, columns.iter().map(|c| csv_escape(c)));
    for row in &rows {
        push_line(
            &mut out,
            columns
                .iter()
                .map(|c| csv_escape(&cell_text(row.get(*c).unwrap_or(&Value::Null)))),
        );
    }
    Ok(out.into_bytes())
}

/// Encodes records as a pretty-printed JSON array (2-space indent).
///
/// # Errors
///
/// Returns [`PodupuError::Json`] if a record fails to serialize.
pub fn to_json_bytes<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

/// Encodes `records` and writes them to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns the encoding error, or [`PodupuError::Io`] if the file cannot be written.
pub fn write_export<T: Serialize, P: AsRef<Path>>(
    path: P,
    format: ExportFormat,
    records: &[T],
) -> Result<()> {
    let bytes = format.encode(records)?;
    std::fs::write(path.as_ref(), &bytes)?;
    log::info!(
        "Exported {} records as {format} to {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Reads CSV text into rows of cells, header row included.
///
/// Quoted cells may contain `,`, `""` and line breaks. Both `\n` and
/// `\r\n` end a record.
///
/// # Errors
///
/// Returns [`PodupuError::Validation`] for invalid UTF-8 or an unterminated
/// quoted cell.
pub fn parse_csv(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| PodupuError::Validation(format!("Invalid UTF-8: {e}")))?;

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut current)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut record));
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(PodupuError::Validation("Unterminated quoted CSV cell".to_string()));
    }
    if !current.is_empty() || !record.is_empty() {
        record.push(current);
        records.push(record);
    }
    Ok(records)
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>) {
    let cells: Vec<String> = cells.collect();
    out.push_str(&cells.join(","));
    out.push('\n');
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Compact JSON keeps nested values on one logical cell.
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Difficulty, Riddle, RiddleId};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn riddle(id: &str, question: &str, answer: &str) -> Riddle {
        Riddle {
            id: RiddleId::from(id),
            question: question.to_string(),
            answer: answer.to_string(),
            category: Category::Traditional,
            difficulty: Difficulty::Medium,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_csv_is_empty_bytes() {
        let records: Vec<Riddle> = Vec::new();
        assert!(to_csv_bytes(&records).unwrap().is_empty());
    }

    #[test]
    fn test_csv_header_follows_field_order() {
        let bytes = to_csv_bytes(&[riddle("1", "q", "a")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "id,question,answer,category,difficulty,created_at\n\
             1,q,a,traditional,medium,2024-01-15T09:30:00Z\n"
        );
    }

    #[test]
    fn test_csv_preserves_record_order() {
        let records = vec![riddle("3", "c", "c"), riddle("1", "a", "a"), riddle("2", "b", "b")];
        let rows = parse_csv(&to_csv_bytes(&records).unwrap()).unwrap();

        let ids: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_csv_quotes_only_when_needed() {
        let records = vec![riddle("1", "నల్లని, తెల్లని?", "he said \"hi\"\nthen left")];
        let text = String::from_utf8(to_csv_bytes(&records).unwrap()).unwrap();

        assert!(text.contains("1,\"నల్లని, తెల్లని?\",\"he said \"\"hi\"\"\nthen left\",traditional"));

        let rows = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "నల్లని, తెల్లని?");
        assert_eq!(rows[1][2], "he said \"hi\"\nthen left");
    }

    #[test]
    fn test_csv_union_of_keys_with_empty_cells() {
        let records = vec![
            json!({ "a": 1, "b": null }),
            json!({ "c": true, "a": [1, 2] }),
        ];
        let text = String::from_utf8(to_csv_bytes(&records).unwrap()).unwrap();
        assert_eq!(text, "a,b,c\n1,,\n\"[1,2]\",,true\n");
    }

    #[test]
    fn test_csv_rejects_non_object_records() {
        let result = to_csv_bytes(&[1, 2, 3]);
        assert!(matches!(result, Err(PodupuError::Validation(_))));
    }

    #[test]
    fn test_csv_is_deterministic() {
        let records = vec![riddle("1", "q", "a"), riddle("2", "q2", "a2")];
        assert_eq!(to_csv_bytes(&records).unwrap(), to_csv_bytes(&records).unwrap());
    }

    #[test]
    fn test_json_round_trips_telugu() {
        let records = vec![riddle("1", "ఏనుగు ఎంత పెద్దది?", "చాలా పెద్దది")];
        let bytes = to_json_bytes(&records).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();

        assert!(text.contains("ఏనుగు ఎంత పెద్దది?"), "non-ASCII is not escaped");
        assert!(text.starts_with("[\n  {\n    \"id\": \"1\""));

        let back: Vec<Riddle> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_json_is_empty_array() {
        let records: Vec<Riddle> = Vec::new();
        assert_eq!(to_json_bytes(&records).unwrap(), b"[]");
    }

    #[test]
    fn test_parse_csv_handles_crlf_and_unterminated_quotes() {
        let rows = parse_csv(b"a,b\r\n1,2\r\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);

        assert_eq!(parse_csv(b"x,y").unwrap(), vec![vec!["x", "y"]]);
        assert!(parse_csv(b"").unwrap().is_empty());
        assert!(matches!(parse_csv(b"\"open"), Err(PodupuError::Validation(_))));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Csv.file_name(), "podupu_kathalu.csv");
        assert_eq!(ExportFormat::Json.mime_type(), "application/json");
        assert_eq!(" JSON ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!("xml".parse::<ExportFormat>(), Err(PodupuError::Validation(_))));
    }

    #[test]
    fn test_write_export() {
        let temp = NamedTempFile::new().unwrap();
        let records = vec![riddle("1", "q", "a")];
        write_export(temp.path(), ExportFormat::Csv, &records).unwrap();

        let written = std::fs::read(temp.path()).unwrap();
        assert_eq!(written, to_csv_bytes(&records).unwrap());
    }
}
