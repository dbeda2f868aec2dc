use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::AttemptAnswer;
use crate::models::question::QuestionKind;
use crate::models::snapshot::QuestionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub score: i32,
    pub max_score: i32,
}

/// Marks for one descriptive answer, as supplied by an evaluator.
#[derive(Debug, Clone)]
pub struct ManualMark {
    pub question_id: Uuid,
    pub marks_awarded: i32,
    pub feedback: Option<String>,
}

pub struct GradingService;

impl GradingService {
    /// Score `answers` in place against the frozen snapshot. MCQ entries are
    /// graded by comparing the selected index to the snapshot's correct
    /// index; descriptive entries keep whatever `marks_awarded` they carry
    /// (zero until an evaluator sets it). The pass is idempotent: the same
    /// `(answers, snapshots)` pair always yields the same summary.
    pub fn score_attempt(
        snapshots: &[QuestionSnapshot],
        answers: &mut [AttemptAnswer],
    ) -> ScoreSummary {
        let by_id: HashMap<Uuid, &QuestionSnapshot> =
            snapshots.iter().map(|s| (s.question_id, s)).collect();

        let mut score = 0;
        for answer in answers.iter_mut() {
            let Some(snapshot) = by_id.get(&answer.question_id) else {
                continue;
            };
            match snapshot.kind {
                QuestionKind::Mcq => {
                    let correct = snapshot.correct_option_index.is_some()
                        && answer.selected_option_index == snapshot.correct_option_index;
                    answer.is_correct = Some(correct);
                    answer.marks_awarded = if correct { snapshot.marks } else { 0 };
                }
                QuestionKind::Descriptive => {}
            }
            score += answer.marks_awarded;
        }

        ScoreSummary {
            score,
            max_score: snapshots.iter().map(|s| s.marks).sum(),
        }
    }

    /// Apply evaluator marks to the descriptive entries named by
    /// `marks`. Targeting an MCQ entry is permitted but changes nothing;
    /// unknown question ids are rejected. Caller re-runs `score_attempt`
    /// afterwards.
    pub fn apply_manual_marks(
        snapshots: &[QuestionSnapshot],
        answers: &mut [AttemptAnswer],
        marks: &[ManualMark],
    ) -> Result<usize> {
        let by_id: HashMap<Uuid, &QuestionSnapshot> =
            snapshots.iter().map(|s| (s.question_id, s)).collect();

        let mut updated = 0;
        for mark in marks {
            let snapshot = by_id.get(&mark.question_id).ok_or_else(|| {
                Error::NotFound(format!(
                    "Question {} is not part of this attempt",
                    mark.question_id
                ))
            })?;

            if mark.marks_awarded < 0 || mark.marks_awarded > snapshot.marks {
                return Err(Error::BadRequest(format!(
                    "Marks for question {} must be between 0 and {}",
                    mark.question_id, snapshot.marks
                )));
            }

            if snapshot.kind != QuestionKind::Descriptive {
                continue;
            }

            let Some(answer) = answers
                .iter_mut()
                .find(|a| a.question_id == mark.question_id)
            else {
                continue;
            };
            answer.marks_awarded = mark.marks_awarded;
            answer.feedback = mark.feedback.clone();
            updated += 1;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: Uuid, kind: QuestionKind, marks: i32, correct: Option<i32>) -> QuestionSnapshot {
        QuestionSnapshot {
            question_id: id,
            kind,
            text: "q".into(),
            options: match kind {
                QuestionKind::Mcq => vec!["a".into(), "b".into(), "c".into()],
                QuestionKind::Descriptive => vec![],
            },
            marks,
            correct_option_index: correct,
        }
    }

    fn mcq_answer(id: Uuid, selected: Option<i32>) -> AttemptAnswer {
        AttemptAnswer {
            question_id: id,
            kind: QuestionKind::Mcq,
            selected_option_index: selected,
            answer_text: None,
            is_correct: None,
            marks_awarded: 0,
            feedback: None,
        }
    }

    fn text_answer(id: Uuid, text: &str) -> AttemptAnswer {
        AttemptAnswer {
            question_id: id,
            kind: QuestionKind::Descriptive,
            selected_option_index: None,
            answer_text: Some(text.into()),
            is_correct: None,
            marks_awarded: 0,
            feedback: None,
        }
    }

    #[test]
    fn mcq_grading_awards_full_or_zero() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let snaps = vec![
            snapshot(q1, QuestionKind::Mcq, 1, Some(0)),
            snapshot(q2, QuestionKind::Mcq, 2, Some(2)),
        ];
        let mut answers = vec![mcq_answer(q1, Some(0)), mcq_answer(q2, Some(1))];

        let summary = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(summary, ScoreSummary { score: 1, max_score: 3 });
        assert_eq!(answers[0].is_correct, Some(true));
        assert_eq!(answers[1].is_correct, Some(false));
        assert_eq!(answers[1].marks_awarded, 0);
    }

    #[test]
    fn scoring_is_idempotent() {
        let q = Uuid::new_v4();
        let snaps = vec![snapshot(q, QuestionKind::Mcq, 3, Some(1))];
        let mut answers = vec![mcq_answer(q, Some(1))];

        let first = GradingService::score_attempt(&snaps, &mut answers);
        let second = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(first, second);
        assert_eq!(first.score, 3);
    }

    #[test]
    fn descriptive_marks_survive_rescoring() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let snaps = vec![
            snapshot(q1, QuestionKind::Mcq, 1, Some(0)),
            snapshot(q2, QuestionKind::Descriptive, 10, None),
        ];
        let mut answers = vec![mcq_answer(q1, Some(0)), text_answer(q2, "borrow checker")];

        let before = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(before.score, 1);

        let applied = GradingService::apply_manual_marks(
            &snaps,
            &mut answers,
            &[ManualMark {
                question_id: q2,
                marks_awarded: 7,
                feedback: Some("solid".into()),
            }],
        )
        .unwrap();
        assert_eq!(applied, 1);

        let after = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(after, ScoreSummary { score: 8, max_score: 11 });
        assert_eq!(answers[1].feedback.as_deref(), Some("solid"));
    }

    #[test]
    fn manual_mark_on_mcq_is_a_no_op() {
        let q = Uuid::new_v4();
        let snaps = vec![snapshot(q, QuestionKind::Mcq, 2, Some(0))];
        let mut answers = vec![mcq_answer(q, Some(0))];
        GradingService::score_attempt(&snaps, &mut answers);

        let applied = GradingService::apply_manual_marks(
            &snaps,
            &mut answers,
            &[ManualMark { question_id: q, marks_awarded: 0, feedback: None }],
        )
        .unwrap();
        assert_eq!(applied, 0);

        let summary = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(summary.score, 2);
    }

    #[test]
    fn manual_marks_outside_range_are_rejected() {
        let q = Uuid::new_v4();
        let snaps = vec![snapshot(q, QuestionKind::Descriptive, 5, None)];
        let mut answers = vec![text_answer(q, "…")];

        let over = GradingService::apply_manual_marks(
            &snaps,
            &mut answers,
            &[ManualMark { question_id: q, marks_awarded: 6, feedback: None }],
        );
        assert!(matches!(over, Err(Error::BadRequest(_))));

        let unknown = GradingService::apply_manual_marks(
            &snaps,
            &mut answers,
            &[ManualMark { question_id: Uuid::new_v4(), marks_awarded: 1, feedback: None }],
        );
        assert!(matches!(unknown, Err(Error::NotFound(_))));
    }

    #[test]
    fn mcq_without_key_never_awards_marks() {
        let q = Uuid::new_v4();
        let snaps = vec![snapshot(q, QuestionKind::Mcq, 4, None)];
        let mut answers = vec![mcq_answer(q, Some(0))];

        let summary = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(summary.score, 0);
        assert_eq!(answers[0].is_correct, Some(false));
    }

    #[test]
    fn answers_missing_from_snapshot_are_ignored() {
        let q = Uuid::new_v4();
        let snaps = vec![snapshot(q, QuestionKind::Mcq, 1, Some(0))];
        let mut answers = vec![mcq_answer(Uuid::new_v4(), Some(0))];

        let summary = GradingService::score_attempt(&snaps, &mut answers);
        assert_eq!(summary.score, 0);
        assert_eq!(answers[0].is_correct, None);
    }
}
