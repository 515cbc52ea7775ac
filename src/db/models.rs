use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ExamStatus, UserRole};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) must_change_password: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) gender: Option<String>,
    pub(crate) id_number: String,
    pub(crate) academic_year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) default_mark: f64,
    pub(crate) status: ExamStatus,
    pub(crate) access_code: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) published_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_text: String,
    pub(crate) mark_weight: f64,
    pub(crate) image_path: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) seq: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Choice {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) choice_text: String,
    pub(crate) is_answer: bool,
    pub(crate) seq: i64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) question_id: String,
    pub(crate) choice_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) is_flagged: bool,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct StudentExam {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) taken_exam: bool,
    pub(crate) score: f64,
}

/// A question with its choices in display order.
#[derive(Debug, Clone)]
pub(crate) struct QuestionWithChoices {
    pub(crate) question: Question,
    pub(crate) choices: Vec<Choice>,
}

/// Exam loaded eagerly with every question and choice.
#[derive(Debug, Clone)]
pub(crate) struct ExamAggregate {
    pub(crate) exam: Exam,
    pub(crate) questions: Vec<QuestionWithChoices>,
}
