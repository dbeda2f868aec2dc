//! Snapshot construction: executed once when an attempt is created, never
//! repeated. The resulting entries are the attempt's private, frozen copy of
//! the selected questions; grading and review read only this copy.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::question::{Question, QuestionKind};
use crate::models::snapshot::QuestionSnapshot;

/// Freeze `questions` into per-attempt snapshot entries. `questions` arrives
/// in the test's defined order; shuffling (unbiased, Fisher-Yates via
/// `SliceRandom`) applies on top of that. For MCQ entries the correct-option
/// index is recomputed against the post-shuffle option order and the
/// `is_correct` flags are dropped from the stored option list.
pub fn build_snapshots<R: Rng>(
    questions: &[Question],
    shuffle_questions: bool,
    shuffle_options: bool,
    rng: &mut R,
) -> Vec<QuestionSnapshot> {
    let mut order: Vec<usize> = (0..questions.len()).collect();
    if shuffle_questions {
        order.shuffle(rng);
    }

    order
        .into_iter()
        .map(|idx| snapshot_question(&questions[idx], shuffle_options, rng))
        .collect()
}

fn snapshot_question<R: Rng>(
    question: &Question,
    shuffle_options: bool,
    rng: &mut R,
) -> QuestionSnapshot {
    match question.kind {
        QuestionKind::Descriptive => QuestionSnapshot {
            question_id: question.id,
            kind: question.kind,
            text: question.text.clone(),
            options: vec![],
            marks: question.marks,
            correct_option_index: None,
        },
        QuestionKind::Mcq => {
            let mut options = question.option_list();
            if shuffle_options {
                options.shuffle(rng);
            }
            let correct_option_index = options
                .iter()
                .position(|opt| opt.is_correct)
                .map(|idx| idx as i32);

            QuestionSnapshot {
                question_id: question.id,
                kind: question.kind,
                text: question.text.clone(),
                options: options.into_iter().map(|opt| opt.text).collect(),
                marks: question.marks,
                correct_option_index,
            }
        }
    }
}

pub fn max_score(snapshots: &[QuestionSnapshot]) -> i32 {
    snapshots.iter().map(|s| s.marks).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionOption};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn mcq(text: &str, options: &[(&str, bool)], marks: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            kind: QuestionKind::Mcq,
            text: text.into(),
            options: serde_json::to_value(
                options
                    .iter()
                    .map(|(t, correct)| QuestionOption {
                        text: (*t).into(),
                        is_correct: *correct,
                    })
                    .collect::<Vec<_>>(),
            )
            .unwrap(),
            marks,
            difficulty: Difficulty::Medium,
            tags: vec![],
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn descriptive(text: &str, marks: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            kind: QuestionKind::Descriptive,
            text: text.into(),
            options: serde_json::json!([]),
            marks,
            difficulty: Difficulty::Hard,
            tags: vec![],
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unshuffled_snapshot_keeps_order_and_flagged_position() {
        let questions = vec![
            mcq("q1", &[("a", false), ("b", true), ("c", false)], 1),
            mcq("q2", &[("x", true), ("y", false)], 2),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let snaps = build_snapshots(&questions, false, false, &mut rng);

        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].question_id, questions[0].id);
        assert_eq!(snaps[0].options, vec!["a", "b", "c"]);
        assert_eq!(snaps[0].correct_option_index, Some(1));
        assert_eq!(snaps[1].correct_option_index, Some(0));
        assert_eq!(max_score(&snaps), 3);
    }

    #[test]
    fn option_shuffle_remaps_correct_index() {
        let questions = vec![mcq(
            "pick",
            &[("alpha", false), ("beta", false), ("gamma", true), ("delta", false)],
            5,
        )];
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let snaps = build_snapshots(&questions, false, true, &mut rng);
            let snap = &snaps[0];

            let idx = snap.correct_option_index.expect("mcq keeps a key") as usize;
            assert_eq!(snap.options[idx], "gamma");

            let mut sorted = snap.options.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["alpha", "beta", "delta", "gamma"]);
        }
    }

    #[test]
    fn question_shuffle_is_a_permutation() {
        let questions = vec![
            mcq("q1", &[("a", true)], 1),
            mcq("q2", &[("b", true)], 1),
            descriptive("q3", 4),
            mcq("q4", &[("c", true)], 1),
        ];
        let mut rng = StdRng::seed_from_u64(99);
        let snaps = build_snapshots(&questions, true, false, &mut rng);

        let mut got: Vec<Uuid> = snaps.iter().map(|s| s.question_id).collect();
        let mut want: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
        assert_eq!(max_score(&snaps), 7);
    }

    #[test]
    fn descriptive_snapshot_has_no_key() {
        let questions = vec![descriptive("explain ownership", 10)];
        let mut rng = StdRng::seed_from_u64(0);
        let snaps = build_snapshots(&questions, true, true, &mut rng);
        assert!(snaps[0].options.is_empty());
        assert_eq!(snaps[0].correct_option_index, None);
    }

    #[test]
    fn mcq_without_flagged_option_gets_no_key() {
        let questions = vec![mcq("broken", &[("a", false), ("b", false)], 1)];
        let mut rng = StdRng::seed_from_u64(0);
        let snaps = build_snapshots(&questions, false, false, &mut rng);
        assert_eq!(snaps[0].correct_option_index, None);
    }

    #[test]
    fn client_view_never_carries_the_answer_key() {
        let questions = vec![mcq("q", &[("a", true), ("b", false)], 1)];
        let mut rng = StdRng::seed_from_u64(3);
        let snaps = build_snapshots(&questions, false, false, &mut rng);

        let rendered = serde_json::to_value(snaps[0].client_view()).unwrap();
        assert!(rendered.get("correct_option_index").is_none());
        assert!(rendered.get("is_correct").is_none());
        assert_eq!(rendered["options"], serde_json::json!(["a", "b"]));
    }
}
