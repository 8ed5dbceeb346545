//! The riddle record and the typed values that cross the UI / query boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{PodupuError, Result};

/// Opaque backend-assigned identifier of a riddle.
///
/// The hosted table may use text or integer keys; both deserialize into the
/// same string form so callers never depend on the backend's key type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RiddleId(String);

impl RiddleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiddleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RiddleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RiddleId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Integer(n) => Self(n.to_string()),
        })
    }
}

/// The kind of riddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Traditional,
    Modern,
    Funny,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Self::Traditional, Self::Modern, Self::Funny];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Traditional => "traditional",
            Self::Modern => "modern",
            Self::Funny => "funny",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PodupuError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PodupuError::Validation(format!("Unknown category: {s}")))
    }
}

/// How hard a riddle is to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All difficulties, easiest first.
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = PodupuError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| PodupuError::Validation(format!("Unknown difficulty: {s}")))
    }
}

/// A stored riddle, as returned by the backend.
///
/// Field order here is the column order of CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Riddle {
    pub id: RiddleId,
    pub question: String,
    pub answer: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

/// A riddle that has not been stored yet.
///
/// Construction trims the question and answer and rejects either being empty,
/// so every `NewRiddle` already satisfies the stored-record invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRiddle {
    question: String,
    answer: String,
    category: Category,
    difficulty: Difficulty,
}

impl NewRiddle {
    /// # Errors
    ///
    /// Returns [`PodupuError::Validation`] if `question` or `answer` is empty
    /// after trimming.
    pub fn new(
        question: &str,
        answer: &str,
        category: Category,
        difficulty: Difficulty,
    ) -> Result<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return Err(PodupuError::Validation(
                "Question and Answer are required.".to_string(),
            ));
        }
        Ok(Self {
            question: question.to_string(),
            answer: answer.to_string(),
            category,
            difficulty,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// A partial update of the mutable riddle fields.
///
/// Only fields that were set are sent to the backend. `id` and `created_at`
/// have no setter and therefore can never be overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiddlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    difficulty: Option<Difficulty>,
}

impl RiddlePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the question, trimmed.
    pub fn question(mut self, question: &str) -> Self {
        self.question = Some(question.trim().to_string());
        self
    }

    /// Sets the answer, trimmed.
    pub fn answer(mut self, answer: &str) -> Self {
        self.answer = Some(answer.trim().to_string());
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

    pub fn is_empty(&self) -> bool {
        self.question.is_none()
            && self.answer.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
    }

    /// Checks that the patch changes something and keeps question/answer non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`PodupuError::Validation`] for an empty patch, or for a
    /// question or answer that is empty after trimming.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(PodupuError::Validation("Nothing to update".to_string()));
        }
        if self.question.as_deref() == Some("") || self.answer.as_deref() == Some("") {
            return Err(PodupuError::Validation(
                "Question and Answer are required.".to_string(),
            ));
        }
        Ok(())
    }
}
