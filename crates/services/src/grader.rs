use std::sync::Arc;

use tracing::warn;

use ielts_core::model::{Assessment, RubricScores};
use ielts_core::scoring::{Rubric, parse_rubric_score};

use crate::completion::CompletionService;
use crate::error::GradingError;

const SYSTEM_PROMPT: &str = "You are an IELTS writing examiner.";

/// Grades one essay through the completion service.
///
/// Pure orchestration: no persistence. Callers decide what to do with the
/// returned assessment.
#[derive(Clone)]
pub struct EssayGrader {
    completion: Arc<dyn CompletionService>,
}

impl EssayGrader {
    #[must_use]
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Grade an essay and return the assessment.
    ///
    /// Rubric labels the examiner response omits are scored 0.0; each
    /// substitution is logged so grader-format drift stays visible.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` when the completion request fails.
    pub async fn grade(
        &self,
        question_text: &str,
        submitted_text: &str,
    ) -> Result<Assessment, GradingError> {
        let prompt = grading_prompt(question_text, submitted_text);
        let response = self.completion.complete(SYSTEM_PROMPT, &prompt).await?;

        let mut scores = [0.0f64; 4];
        for (slot, rubric) in scores.iter_mut().zip(Rubric::ALL) {
            match parse_rubric_score(&response, rubric) {
                Some(score) => *slot = score,
                None => {
                    warn!(rubric = rubric.label(), "rubric score missing from examiner response");
                }
            }
        }

        let feedback = extract_feedback(&response);
        Ok(Assessment::new(
            RubricScores {
                task_response: scores[0],
                coherence_cohesion: scores[1],
                lexical_resource: scores[2],
                grammar: scores[3],
            },
            feedback,
        ))
    }
}

fn grading_prompt(question_text: &str, submitted_text: &str) -> String {
    format!(
        "Evaluate the following IELTS writing response.\n\
         \n\
         Question:\n{question_text}\n\
         \n\
         Essay:\n{submitted_text}\n\
         \n\
         Score each criterion from 0 to 9 and reply in exactly this format:\n\
         Task Response: <score>\n\
         Coherence and Cohesion: <score>\n\
         Lexical Resource: <score>\n\
         Grammatical Range and Accuracy: <score>\n\
         Feedback: <two or three sentences of feedback>"
    )
}

/// Everything after the `Feedback:` marker, or the full response when the
/// examiner ignored the layout.
fn extract_feedback(response: &str) -> String {
    let lower = response.to_ascii_lowercase();
    match lower.find("feedback:") {
        Some(index) => response[index + "feedback:".len()..].trim().to_string(),
        None => response.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_extracted_after_marker() {
        let response = "Task Response: 7\nFeedback: Good structure overall.";
        assert_eq!(extract_feedback(response), "Good structure overall.");
    }

    #[test]
    fn feedback_falls_back_to_full_response() {
        let response = "  The essay is coherent.  ";
        assert_eq!(extract_feedback(response), "The essay is coherent.");
    }

    #[test]
    fn prompt_embeds_question_and_essay() {
        let prompt = grading_prompt("Describe the chart.", "The chart shows...");
        assert!(prompt.contains("Describe the chart."));
        assert!(prompt.contains("The chart shows..."));
        assert!(prompt.contains("Grammatical Range and Accuracy:"));
    }
}
