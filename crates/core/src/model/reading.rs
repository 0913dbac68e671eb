use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{QuestionId, ReadingTestId};

/// Question formats supported by the reading section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalseNotGiven,
    MatchingHeadings,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::TrueFalseNotGiven => "TRUE_FALSE_NOT_GIVEN",
            QuestionType::MatchingHeadings => "MATCHING_HEADINGS",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid question type: {raw}")]
pub struct QuestionTypeParseError {
    pub raw: String,
}

impl FromStr for QuestionType {
    type Err = QuestionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MULTIPLE_CHOICE" => Ok(QuestionType::MultipleChoice),
            "TRUE_FALSE_NOT_GIVEN" => Ok(QuestionType::TrueFalseNotGiven),
            "MATCHING_HEADINGS" => Ok(QuestionType::MatchingHeadings),
            _ => Err(QuestionTypeParseError { raw: s.to_owned() }),
        }
    }
}

/// A labelled answer choice for a multiple-choice or matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    pub text: String,
}

/// One question in a reading test, with its options and (server-side only)
/// answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingQuestion {
    pub id: QuestionId,
    /// 1-based position within the test.
    pub position: u32,
    pub question_type: QuestionType,
    pub question_text: String,
    pub paragraph_ref: String,
    pub options: Vec<AnswerOption>,
    /// Absent keys are legal: such questions still count toward the total
    /// but can never be scored as correct.
    pub answer_key: Option<String>,
}

/// A full reading test with its ordered questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingTest {
    pub id: ReadingTestId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<ReadingQuestion>,
}

/// Listing view of a reading test, without questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingTestSummary {
    pub id: ReadingTestId,
    pub title: String,
    pub description: String,
}
