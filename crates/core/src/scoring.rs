//! Band scoring: rubric extraction from examiner text, IELTS half-band
//! rounding, and reading-test raw/band conversion.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{QuestionId, ReadingTest};

/// The four IELTS writing rubrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rubric {
    TaskResponse,
    CoherenceCohesion,
    LexicalResource,
    Grammar,
}

impl Rubric {
    pub const ALL: [Rubric; 4] = [
        Rubric::TaskResponse,
        Rubric::CoherenceCohesion,
        Rubric::LexicalResource,
        Rubric::Grammar,
    ];

    /// The label the examiner is instructed to emit for this rubric.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Rubric::TaskResponse => "Task Response",
            Rubric::CoherenceCohesion => "Coherence and Cohesion",
            Rubric::LexicalResource => "Lexical Resource",
            Rubric::Grammar => "Grammatical Range and Accuracy",
        }
    }

    fn index(self) -> usize {
        match self {
            Rubric::TaskResponse => 0,
            Rubric::CoherenceCohesion => 1,
            Rubric::LexicalResource => 2,
            Rubric::Grammar => 3,
        }
    }
}

fn rubric_regex(rubric: Rubric) -> &'static Regex {
    // `<label><optional colon><ws><number>`, case-insensitive. Accepts the
    // full-width colon some models emit, and matches anywhere in the line so
    // leading bullets or markdown emphasis do not matter.
    static PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
        Rubric::ALL.map(|rubric| {
            let pattern = format!(
                r"(?i){}[:：]?\s*([0-9]+(?:\.[0-9]+)?)",
                regex::escape(rubric.label())
            );
            Regex::new(&pattern).expect("rubric pattern is valid")
        })
    });
    &PATTERNS[rubric.index()]
}

/// Extract one rubric score from free-form examiner text.
///
/// Returns the first match, or `None` when the label cannot be found. Callers
/// that need the original platform behavior substitute `0.0` for `None`; the
/// distinction is preserved here so that grader-format drift stays observable.
#[must_use]
pub fn parse_rubric_score(text: &str, rubric: Rubric) -> Option<f64> {
    rubric_regex(rubric)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Round a raw average to the nearest IELTS half band.
///
/// Fractions below .25 round down, below .75 round to the half, and
/// otherwise up to the next whole band.
#[must_use]
pub fn round_band(score: f64) -> f64 {
    let whole = score.floor();
    let frac = score - whole;
    if frac < 0.25 {
        whole
    } else if frac < 0.75 {
        whole + 0.5
    } else {
        whole + 1.0
    }
}

/// Convert a 0-40 raw reading score to a band using the fixed step table.
#[must_use]
pub fn raw_score_to_band(raw_score: u32) -> f64 {
    match raw_score {
        39.. => 9.0,
        37..=38 => 8.5,
        35..=36 => 8.0,
        33..=34 => 7.5,
        30..=32 => 7.0,
        27..=29 => 6.5,
        23..=26 => 6.0,
        19..=22 => 5.5,
        15..=18 => 5.0,
        12..=14 => 4.5,
        _ => 4.0,
    }
}

/// Outcome of scoring a reading-test submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingScore {
    pub total: u32,
    pub correct: u32,
    pub raw_score: u32,
    pub band_score: f64,
}

/// Score submitted reading answers against a test's answer keys.
///
/// Every question counts toward `total`; a missing answer is treated as the
/// empty string; answers and keys are compared trimmed and uppercased.
/// Questions without an answer key stay in the denominator but cannot score.
#[must_use]
pub fn score_reading(test: &ReadingTest, answers: &HashMap<QuestionId, String>) -> ReadingScore {
    let mut total = 0u32;
    let mut correct = 0u32;

    for question in &test.questions {
        total += 1;
        let Some(key) = question.answer_key.as_deref() else {
            continue;
        };
        let given = answers
            .get(&question.id)
            .map(|answer| answer.trim().to_uppercase())
            .unwrap_or_default();
        if given == key.trim().to_uppercase() {
            correct += 1;
        }
    }

    let raw_score = if total == 0 {
        0
    } else {
        // Bounded by 40, so the cast is lossless.
        (f64::from(correct) / f64::from(total) * 40.0).round() as u32
    };

    ReadingScore {
        total,
        correct,
        raw_score,
        band_score: raw_score_to_band(raw_score),
    }
}
