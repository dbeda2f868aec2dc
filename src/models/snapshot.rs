use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::QuestionKind;

/// One frozen question inside an attempt's `question_snapshots` document.
/// Ordering, option ordering and `correct_option_index` are fixed when the
/// attempt is created and never re-derived from the question bank, so grading
/// stays reproducible after bank edits or deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<String>,
    pub marks: i32,
    /// Index of the correct option after any shuffling. `None` for
    /// descriptive questions. Server-only; stripped from client views.
    pub correct_option_index: Option<i32>,
}

impl QuestionSnapshot {
    pub fn client_view(&self) -> SnapshotQuestionView {
        SnapshotQuestionView {
            question_id: self.question_id,
            kind: self.kind,
            text: self.text.clone(),
            options: self.options.clone(),
            marks: self.marks,
        }
    }
}

/// What the attempt owner sees: the snapshot minus the answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuestionView {
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<String>,
    pub marks: i32,
}
