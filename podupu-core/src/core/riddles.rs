//! Riddle CRUD over any [`Backend`].
//!
//! Each function issues exactly one backend operation against
//! [`TABLE_NAME`] and propagates backend failures unchanged. Nothing is
//! cached and nothing is retried.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::backend::Backend;
use crate::core::operation::{Filter, Operation, Order, Query, Response};
use crate::{Category, Difficulty, NewRiddle, PodupuError, Result, Riddle, RiddleId, RiddlePatch};

/// The backend table holding riddle records.
pub const TABLE_NAME: &str = "podupu_kathalu";

/// Row cap used when the caller does not choose one.
pub const DEFAULT_LIMIT: u32 = 500;

/// Criteria for [`list_riddles`].
///
/// Filter kinds are AND'd together; the search itself matches rows whose
/// question *or* answer contains the text, ignoring case.
#[derive(Debug, Clone, PartialEq)]
pub struct RiddleFilter {
    /// Substring to look for; `None` or `""` disables the search.
    pub search: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    /// Maximum number of rows; `0` leaves the cap to the backend.
    pub limit: u32,
}

impl Default for RiddleFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            difficulty: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RiddleFilter {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Builds the backend query: newest first, then the filters, then the cap.
    pub fn to_query(&self) -> Query {
        let mut filters = Vec::new();

        if let Some(text) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{text}%");
            filters.push(Filter::or(vec![
                Filter::ilike("question", pattern.clone()),
                Filter::ilike("answer", pattern),
            ]));
        }
        if let Some(category) = self.category {
            filters.push(Filter::eq("category", category.as_str()));
        }
        if let Some(difficulty) = self.difficulty {
            filters.push(Filter::eq("difficulty", difficulty.as_str()));
        }

        Query {
            filters,
            order: Some(Order {
                column: "created_at".to_string(),
                descending: true,
            }),
            limit: (self.limit > 0).then_some(self.limit),
        }
    }
}

/// Result of [`update_riddle`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Rows changed; `0` when no riddle has the given id.
    pub count: usize,
    /// The riddle as stored after the update, if the backend returned it.
    pub riddle: Option<Riddle>,
}

/// Stores a new riddle and returns it with its backend-assigned id and timestamp.
///
/// # Errors
///
/// Returns [`PodupuError::Backend`] (or [`PodupuError::Database`]) if the
/// backend rejects the write or does not echo the stored row.
pub fn insert_riddle<B: Backend + ?Sized>(backend: &B, riddle: &NewRiddle) -> Result<Riddle> {
    let op = Operation::Insert {
        table: TABLE_NAME.to_string(),
        row: to_row(riddle)?,
    };
    let response = run(backend, &op)?;
    let row = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| PodupuError::Backend("Insert returned no row".to_string()))?;
    decode(row)
}

/// Returns the riddles matching `filter`, newest first.
///
/// An empty result is `Ok(vec![])`. Rows written by other clients that do
/// not decode as a [`Riddle`] (for example an unknown category) are skipped
/// with a warning.
///
/// # Errors
///
/// Returns [`PodupuError::Backend`] (or [`PodupuError::Database`]) if the
/// read fails.
pub fn list_riddles<B: Backend + ?Sized>(backend: &B, filter: &RiddleFilter) -> Result<Vec<Riddle>> {
    let op = Operation::Select {
        table: TABLE_NAME.to_string(),
        query: filter.to_query(),
    };
    let response = run(backend, &op)?;
    let riddles = response
        .data
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match decode(row) {
                Ok(riddle) => Some(riddle),
                Err(e) => {
                    log::warn!("Skipping riddle row {id}: {e}");
                    None
                }
            }
        })
        .collect();
    Ok(riddles)
}

/// Applies `patch` to the riddle with `id`.
///
/// A missing id is not an error: the outcome reports `count == 0`.
///
/// # Errors
///
/// Returns [`PodupuError::Validation`] if the patch is empty or would blank
/// the question or answer, and [`PodupuError::Backend`] (or
/// [`PodupuError::Database`]) if the backend rejects the write.
pub fn update_riddle<B: Backend + ?Sized>(
    backend: &B,
    id: &RiddleId,
    patch: &RiddlePatch,
) -> Result<UpdateOutcome> {
    patch.validate()?;
    let op = Operation::Update {
        table: TABLE_NAME.to_string(),
        key: Filter::eq("id", id.as_str()),
        values: to_row(patch)?,
    };
    let response = run(backend, &op)?;
    let count = response.affected();
    let riddle = response.data.into_iter().next().map(decode).transpose()?;
    Ok(UpdateOutcome { count, riddle })
}

/// Deletes the riddle with `id` and returns how many rows were removed.
///
/// Deleting an id that does not exist returns `Ok(0)`.
///
/// # Errors
///
/// Returns [`PodupuError::Backend`] (or [`PodupuError::Database`]) if the
/// backend rejects the delete.
pub fn delete_riddle<B: Backend + ?Sized>(backend: &B, id: &RiddleId) -> Result<usize> {
    let op = Operation::Delete {
        table: TABLE_NAME.to_string(),
        key: Filter::eq("id", id.as_str()),
    };
    Ok(run(backend, &op)?.affected())
}

fn run<B: Backend + ?Sized>(backend: &B, op: &Operation) -> Result<Response> {
    log::debug!("{} on {}", op.kind(), op.table());
    backend.execute(op).map_err(|e| {
        log::warn!("{} on {} failed: {e}", op.kind(), op.table());
        e
    })
}

fn to_row<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(PodupuError::Validation(format!("Expected a row object, got {other}"))),
    }
}

fn decode(row: Value) -> Result<Riddle> {
    serde_json::from_value(row).map_err(|e| PodupuError::Backend(format!("Unexpected riddle row: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExportFormat, SqliteBackend};
    use std::cell::RefCell;

    fn add(backend: &SqliteBackend, q: &str, a: &str, c: Category, d: Difficulty) -> Riddle {
        insert_riddle(backend, &NewRiddle::new(q, a, c, d).unwrap()).unwrap()
    }

    fn seeded() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory().unwrap();
        add(&backend, "ఏనుగు ఎంత పెద్దది?", "చాలా పెద్దది", Category::Funny, Difficulty::Easy);
        add(&backend, "తోక ఉన్న పిట్ట?", "సూది దారం", Category::Traditional, Difficulty::Medium);
        add(&backend, "What has keys but no locks?", "A piano", Category::Modern, Difficulty::Easy);
        add(&backend, "నల్లని ఆకాశం?", "ఏనుగు చర్మం", Category::Funny, Difficulty::Hard);
        add(&backend, "Who laughs last?", "The slow one", Category::Funny, Difficulty::Easy);
        backend
    }

    #[derive(Default)]
    struct RecordingBackend {
        ops: RefCell<Vec<Operation>>,
        response: Response,
    }

    impl Backend for RecordingBackend {
        fn execute(&self, op: &Operation) -> Result<Response> {
            self.ops.borrow_mut().push(op.clone());
            Ok(self.response.clone())
        }
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn execute(&self, _op: &Operation) -> Result<Response> {
            Err(PodupuError::Backend("HTTP 401: permission denied".to_string()))
        }
    }

    #[test]
    fn test_insert_stores_trimmed_text() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let riddle = add(
            &backend,
            " ఏనుగు ఎంత పెద్దది? ",
            " చాలా పెద్దది ",
            Category::Funny,
            Difficulty::Easy,
        );
        assert_eq!(riddle.question, "ఏనుగు ఎంత పెద్దది?");
        assert_eq!(riddle.answer, "చాలా పెద్దది");
        assert_eq!(riddle.category, Category::Funny);
        assert_eq!(riddle.difficulty, Difficulty::Easy);

        let stored = list_riddles(&backend, &RiddleFilter::default()).unwrap();
        assert_eq!(stored, vec![riddle]);
    }

    #[test]
    fn test_insert_sends_exactly_four_fields() {
        let backend = RecordingBackend::default();
        let riddle = NewRiddle::new("q", "a", Category::Modern, Difficulty::Hard).unwrap();
        let result = insert_riddle(&backend, &riddle);
        assert!(matches!(result, Err(PodupuError::Backend(_))), "empty echo is an error");

        let ops = backend.ops.borrow();
        match &ops[0] {
            Operation::Insert { table, row } => {
                assert_eq!(table, TABLE_NAME);
                let keys: Vec<&str> = row.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["question", "answer", "category", "difficulty"]);
                assert_eq!(row["category"], "modern");
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn test_list_without_filters_is_newest_first() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let t1 = add(&backend, "one", "1", Category::Modern, Difficulty::Easy);
        let t2 = add(&backend, "two", "2", Category::Modern, Difficulty::Easy);
        let t3 = add(&backend, "three", "3", Category::Modern, Difficulty::Easy);

        let ids: Vec<RiddleId> = list_riddles(&backend, &RiddleFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![t3.id, t2.id, t1.id]);
    }

    #[test]
    fn test_search_matches_question_or_answer() {
        let backend = seeded();
        let found = list_riddles(&backend, &RiddleFilter::default().search("ఏనుగు")).unwrap();

        let mut questions: Vec<&str> = found.iter().map(|r| r.question.as_str()).collect();
        questions.sort();
        assert_eq!(questions, vec!["ఏనుగు ఎంత పెద్దది?", "నల్లని ఆకాశం?"]);
        assert!(found
            .iter()
            .all(|r| r.question.contains("ఏనుగు") || r.answer.contains("ఏనుగు")));
    }

    #[test]
    fn test_search_ignores_case() {
        let backend = seeded();
        let found = list_riddles(&backend, &RiddleFilter::default().search("PIANO")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].answer, "A piano");
    }

    #[test]
    fn test_empty_search_is_no_filter() {
        let backend = seeded();
        let found = list_riddles(&backend, &RiddleFilter::default().search("")).unwrap();
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_category_and_difficulty_are_conjunctive() {
        let backend = seeded();
        let filter = RiddleFilter::default()
            .category(Category::Funny)
            .difficulty(Difficulty::Easy);
        let found = list_riddles(&backend, &filter).unwrap();

        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|r| r.category == Category::Funny && r.difficulty == Difficulty::Easy));
    }

    #[test]
    fn test_search_combines_with_difficulty() {
        let backend = seeded();
        let filter = RiddleFilter::default()
            .search("ఏనుగు")
            .difficulty(Difficulty::Hard);
        let found = list_riddles(&backend, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].answer, "ఏనుగు చర్మం");
    }

    #[test]
    fn test_search_combines_with_category() {
        let backend = seeded();
        let filter = RiddleFilter::default().search("the").category(Category::Funny);
        let found = list_riddles(&backend, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question, "Who laughs last?");

        let none = RiddleFilter::default().search("piano").category(Category::Funny);
        assert!(list_riddles(&backend, &none).unwrap().is_empty());
    }

    #[test]
    fn test_limit_caps_newest_rows() {
        let backend = seeded();
        let found = list_riddles(&backend, &RiddleFilter::default().limit(2)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].question, "Who laughs last?");

        let all = list_riddles(&backend, &RiddleFilter::default().limit(0)).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let backend = seeded();
        let found = list_riddles(&backend, &RiddleFilter::default().search("zebra")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_query_shape() {
        let query = RiddleFilter::default()
            .search("x")
            .category(Category::Traditional)
            .to_query();

        assert_eq!(
            query.filters,
            vec![
                Filter::or(vec![Filter::ilike("question", "%x%"), Filter::ilike("answer", "%x%")]),
                Filter::eq("category", "traditional"),
            ]
        );
        assert_eq!(
            query.order,
            Some(Order {
                column: "created_at".to_string(),
                descending: true
            })
        );
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
        assert_eq!(RiddleFilter::default().limit(0).to_query().limit, None);
    }

    #[test]
    fn test_update_changes_only_patched_field() {
        let backend = seeded();
        let before = list_riddles(&backend, &RiddleFilter::default().search("piano")).unwrap()[0].clone();

        let outcome = update_riddle(&backend, &before.id, &RiddlePatch::new().question(" new ")).unwrap();
        assert_eq!(outcome.count, 1);

        let after = outcome.riddle.unwrap();
        assert_eq!(after.question, "new");
        assert_eq!(after.id, before.id);
        assert_eq!(after.answer, before.answer);
        assert_eq!(after.category, before.category);
        assert_eq!(after.difficulty, before.difficulty);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_update_missing_id_reports_zero() {
        let backend = seeded();
        let outcome = update_riddle(
            &backend,
            &RiddleId::from("no-such-id"),
            &RiddlePatch::new().category(Category::Modern),
        )
        .unwrap();
        assert_eq!(outcome, UpdateOutcome { count: 0, riddle: None });
    }

    #[test]
    fn test_update_rejects_empty_patch_before_backend() {
        let backend = RecordingBackend::default();
        let result = update_riddle(&backend, &RiddleId::from("1"), &RiddlePatch::new());
        assert!(matches!(result, Err(PodupuError::Validation(_))));
        assert!(backend.ops.borrow().is_empty());
    }

    #[test]
    fn test_delete_returns_count() {
        let backend = seeded();
        let target = list_riddles(&backend, &RiddleFilter::default().limit(1)).unwrap()[0].clone();

        assert_eq!(delete_riddle(&backend, &target.id).unwrap(), 1);
        assert_eq!(delete_riddle(&backend, &target.id).unwrap(), 0);
        assert_eq!(list_riddles(&backend, &RiddleFilter::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_delete_nonexistent_id_is_zero() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(delete_riddle(&backend, &RiddleId::from("ghost")).unwrap(), 0);
    }

    #[test]
    fn test_backend_errors_propagate_unchanged() {
        let result = list_riddles(&FailingBackend, &RiddleFilter::default());
        match result {
            Err(PodupuError::Backend(msg)) => assert_eq!(msg, "HTTP 401: permission denied"),
            other => panic!("expected backend error, got {other:?}"),
        }
        assert!(delete_riddle(&FailingBackend, &RiddleId::from("1")).unwrap_err().is_backend());
    }

    #[test]
    fn test_undecodable_insert_echo_is_backend_error() {
        let backend = RecordingBackend {
            response: Response {
                data: vec![serde_json::json!({ "id": 1, "question": "q" })],
                count: None,
            },
            ..RecordingBackend::default()
        };
        let riddle = NewRiddle::new("q", "a", Category::Modern, Difficulty::Easy).unwrap();
        let result = insert_riddle(&backend, &riddle);
        assert!(matches!(result, Err(PodupuError::Backend(_))));
    }

    #[test]
    fn test_list_skips_rows_with_unknown_enum_values() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let good = add(&backend, "తోక ఉన్న పిట్ట?", "సూది దారం", Category::Traditional, Difficulty::Easy);
        backend
            .connection()
            .execute(
                "INSERT INTO podupu_kathalu (id, question, answer, category, difficulty, created_at)
                 VALUES ('raw-1', 'q', 'a', 'Funny', 'easy', '2030-01-01T00:00:00.000000Z')",
                [],
            )
            .unwrap();

        let found = list_riddles(&backend, &RiddleFilter::default()).unwrap();
        assert_eq!(found, vec![good]);
        assert!(ExportFormat::Csv.encode(&found).is_ok());
    }

    #[test]
    fn test_works_through_trait_object() {
        let backend: Box<dyn Backend> = Box::new(seeded());
        let found = list_riddles(backend.as_ref(), &RiddleFilter::default()).unwrap();
        assert_eq!(found.len(), 5);
    }
}
