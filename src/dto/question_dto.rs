use serde::Deserialize;
use validator::Validate;

use crate::models::question::{Difficulty, QuestionKind, QuestionOption};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    pub kind: QuestionKind,
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub text: String,
    pub options: Option<Vec<QuestionOption>>,
    #[validate(range(min = 0, message = "Marks cannot be negative"))]
    pub marks: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    pub kind: Option<QuestionKind>,
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub text: Option<String>,
    pub options: Option<Vec<QuestionOption>>,
    #[validate(range(min = 0, message = "Marks cannot be negative"))]
    pub marks: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub kind: Option<QuestionKind>,
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
    pub search: Option<String>,
}
