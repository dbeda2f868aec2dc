use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::QuestionKind;

/// One entry of an attempt's `answers` document, matched to the snapshot by
/// `question_id`. MCQ entries are graded automatically at submission;
/// descriptive entries keep `marks_awarded` at its default until an evaluator
/// sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub selected_option_index: Option<i32>,
    pub answer_text: Option<String>,
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub marks_awarded: i32,
    pub feedback: Option<String>,
}
