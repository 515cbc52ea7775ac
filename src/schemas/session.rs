use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::services::exam_session::{ExamResult, QuestionView, SessionStep, SubmitOutcome};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnterExamRequest {
    #[serde(alias = "accessCode")]
    #[validate(length(min = 1, max = 32, message = "access_code must be 1-32 characters"))]
    pub(crate) access_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "choiceId")]
    pub(crate) choice_id: Option<String>,
    #[serde(default)]
    pub(crate) flagged: bool,
    #[serde(alias = "nextIndex")]
    pub(crate) next_index: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) saved: bool,
    pub(crate) next_index: i64,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self { saved: true, next_index: outcome.next_index }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionChoice {
    pub(crate) id: String,
    pub(crate) text: String,
}

/// Question as shown to a student: choices without the answer key.
#[derive(Debug, Serialize)]
pub(crate) struct SessionQuestionResponse {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) image_path: Option<String>,
    pub(crate) mark_weight: f64,
    pub(crate) choices: Vec<SessionChoice>,
    pub(crate) selected_choice_id: Option<String>,
    pub(crate) flagged: bool,
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) answered_indices: Vec<usize>,
    pub(crate) flagged_indices: Vec<usize>,
    pub(crate) duration_minutes: i32,
}

impl From<QuestionView> for SessionQuestionResponse {
    fn from(view: QuestionView) -> Self {
        Self {
            exam_id: view.exam_id,
            exam_title: view.exam_title,
            question_id: view.question_id,
            question_text: view.question_text,
            image_path: view.image_path,
            mark_weight: view.mark_weight,
            choices: view
                .choices
                .into_iter()
                .map(|choice| SessionChoice { id: choice.id, text: choice.text })
                .collect(),
            selected_choice_id: view.selected_choice_id,
            flagged: view.flagged,
            index: view.index,
            total: view.total,
            answered_indices: view.answered_indices,
            flagged_indices: view.flagged_indices,
            duration_minutes: view.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResultResponse {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) score: f64,
    pub(crate) total_questions: i64,
    pub(crate) taken_exam: bool,
    pub(crate) start_time: String,
    pub(crate) end_time: Option<String>,
}

impl From<ExamResult> for ExamResultResponse {
    fn from(result: ExamResult) -> Self {
        Self {
            exam_id: result.exam_id,
            exam_title: result.exam_title,
            score: result.score,
            total_questions: result.total_questions,
            taken_exam: result.taken_exam,
            start_time: format_primitive(result.start_time),
            end_time: format_optional(result.end_time),
        }
    }
}

/// Either the next question or, once the exam is complete, its result.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum SessionStepResponse {
    Question(SessionQuestionResponse),
    Result(ExamResultResponse),
}

impl From<SessionStep> for SessionStepResponse {
    fn from(step: SessionStep) -> Self {
        match step {
            SessionStep::Question(view) => Self::Question(view.into()),
            SessionStep::Result(result) => Self::Result(result.into()),
        }
    }
}
