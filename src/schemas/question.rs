use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Choice, Question, QuestionWithChoices};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default)]
    #[serde(alias = "markWeight")]
    #[validate(range(exclusive_min = 0.0, message = "mark_weight must be positive"))]
    pub(crate) mark_weight: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    #[serde(alias = "markWeight")]
    #[validate(range(exclusive_min = 0.0, message = "mark_weight must be positive"))]
    pub(crate) mark_weight: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChoiceCreate {
    #[serde(alias = "choiceText")]
    #[validate(length(min = 1, message = "choice_text must not be empty"))]
    pub(crate) choice_text: String,
    #[serde(default)]
    #[serde(alias = "isAnswer")]
    pub(crate) is_answer: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChoiceResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) choice_text: String,
    pub(crate) is_answer: bool,
}

impl ChoiceResponse {
    pub(crate) fn from_db(choice: Choice) -> Self {
        Self {
            id: choice.id,
            question_id: choice.question_id,
            choice_text: choice.choice_text,
            is_answer: choice.is_answer,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_text: String,
    pub(crate) mark_weight: f64,
    pub(crate) image_path: Option<String>,
    pub(crate) created_at: String,
    pub(crate) choices: Vec<ChoiceResponse>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_text: question.question_text,
            mark_weight: question.mark_weight,
            image_path: question.image_path,
            created_at: format_primitive(question.created_at),
            choices: choices.into_iter().map(ChoiceResponse::from_db).collect(),
        }
    }

    pub(crate) fn from_aggregate(entry: QuestionWithChoices) -> Self {
        Self::from_db(entry.question, entry.choices)
    }
}
