use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Choice, Exam, ExamAggregate, Question};
use crate::repositories;
use crate::services::access_codes;

const MAX_PUBLISH_ATTEMPTS: u32 = 5;
const MIN_ACADEMIC_YEAR: i32 = 2018;
const MAX_ACADEMIC_YEAR: i32 = 2100;

#[derive(Debug, Error)]
pub(crate) enum AuthoringError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("exam not found")]
    ExamNotFound,
    #[error("question not found")]
    QuestionNotFound,
    #[error("choice not found")]
    ChoiceNotFound,
    #[error("a question with this text already exists in the exam")]
    DuplicateQuestion,
    #[error("a choice with this text already exists for the question")]
    DuplicateChoice,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct ExamDraft {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) default_mark: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ExamChanges {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: Option<i32>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) default_mark: Option<f64>,
}

fn exam_problems(
    title: Option<&str>,
    academic_year: Option<i32>,
    duration_minutes: Option<i32>,
    default_mark: Option<f64>,
) -> Vec<String> {
    let mut problems = Vec::new();
    if title.is_some_and(|title| title.trim().is_empty()) {
        problems.push("Title is required".to_string());
    }
    if academic_year.is_some_and(|year| !(MIN_ACADEMIC_YEAR..=MAX_ACADEMIC_YEAR).contains(&year)) {
        problems.push(format!(
            "Academic year must be between {MIN_ACADEMIC_YEAR} and {MAX_ACADEMIC_YEAR}"
        ));
    }
    if duration_minutes.is_some_and(|minutes| minutes <= 0) {
        problems.push("Duration must be a positive number of minutes".to_string());
    }
    if default_mark.is_some_and(|mark| !mark.is_finite() || mark <= 0.0) {
        problems.push("Default mark must be positive".to_string());
    }
    problems
}

pub(crate) async fn create_exam(
    pool: &PgPool,
    created_by: &str,
    draft: ExamDraft,
) -> Result<Exam, AuthoringError> {
    let problems = exam_problems(
        Some(&draft.title),
        Some(draft.academic_year),
        Some(draft.duration_minutes),
        Some(draft.default_mark),
    );
    if !problems.is_empty() {
        return Err(AuthoringError::Validation(problems));
    }

    let exam = repositories::exams::create(
        pool,
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: draft.title.trim(),
            description: draft.description.as_deref(),
            academic_year: draft.academic_year,
            duration_minutes: draft.duration_minutes,
            default_mark: draft.default_mark,
            created_by,
            now: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(exam_id = %exam.id, created_by = %created_by, action = "exam_created", "Exam created");
    Ok(exam)
}

pub(crate) async fn list_exams(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, AuthoringError> {
    Ok(repositories::exams::list(pool, skip, limit).await?)
}

pub(crate) async fn get_exam(pool: &PgPool, exam_id: &str) -> Result<ExamAggregate, AuthoringError> {
    repositories::exams::load_aggregate(pool, exam_id).await?.ok_or(AuthoringError::ExamNotFound)
}

pub(crate) async fn update_exam(
    pool: &PgPool,
    exam_id: &str,
    changes: ExamChanges,
) -> Result<Exam, AuthoringError> {
    let problems = exam_problems(
        changes.title.as_deref(),
        changes.academic_year,
        changes.duration_minutes,
        changes.default_mark,
    );
    if !problems.is_empty() {
        return Err(AuthoringError::Validation(problems));
    }

    repositories::exams::update(
        pool,
        exam_id,
        repositories::exams::UpdateExam {
            title: changes.title.map(|title| title.trim().to_string()),
            description: changes.description,
            academic_year: changes.academic_year,
            duration_minutes: changes.duration_minutes,
            default_mark: changes.default_mark,
            updated_at: primitive_now_utc(),
        },
    )
    .await?
    .ok_or(AuthoringError::ExamNotFound)
}

pub(crate) async fn delete_exam(pool: &PgPool, exam_id: &str) -> Result<(), AuthoringError> {
    if repositories::exams::delete_by_id(pool, exam_id).await? == 0 {
        return Err(AuthoringError::ExamNotFound);
    }
    tracing::info!(exam_id = %exam_id, action = "exam_deleted", "Exam deleted");
    Ok(())
}

/// Publishes the exam. The access code is generated on first publish and kept
/// on every later call.
pub(crate) async fn publish_exam(pool: &PgPool, exam_id: &str) -> Result<Exam, AuthoringError> {
    publish_with_codes(pool, exam_id, access_codes::generate_access_code).await
}

/// Draws a fresh candidate whenever the previous one collides with another
/// exam's code.
async fn publish_with_codes(
    pool: &PgPool,
    exam_id: &str,
    mut next_code: impl FnMut() -> String,
) -> Result<Exam, AuthoringError> {
    let mut attempt = 1;
    let exam = loop {
        let candidate = next_code();
        match repositories::exams::publish(pool, exam_id, &candidate, primitive_now_utc()).await {
            Ok(exam) => break exam.ok_or(AuthoringError::ExamNotFound)?,
            Err(err)
                if repositories::is_unique_violation(&err) && attempt < MAX_PUBLISH_ATTEMPTS =>
            {
                tracing::warn!(exam_id = %exam_id, attempt, "Access code collision, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    };

    tracing::info!(exam_id = %exam.id, action = "exam_published", "Exam published");
    Ok(exam)
}

pub(crate) async fn create_question(
    pool: &PgPool,
    exam_id: &str,
    question_text: &str,
    mark_weight: Option<f64>,
) -> Result<Question, AuthoringError> {
    let text = question_text.trim();
    if text.is_empty() {
        return Err(AuthoringError::Validation(vec!["Question text is required".to_string()]));
    }
    if mark_weight.is_some_and(|mark| !mark.is_finite() || mark <= 0.0) {
        return Err(AuthoringError::Validation(vec!["Mark weight must be positive".to_string()]));
    }

    let exam = repositories::exams::find_by_id(pool, exam_id)
        .await?
        .ok_or(AuthoringError::ExamNotFound)?;
    if repositories::questions::text_exists(pool, exam_id, text, None).await? {
        return Err(AuthoringError::DuplicateQuestion);
    }

    repositories::questions::create(
        pool,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            question_text: text,
            mark_weight: mark_weight.unwrap_or(exam.default_mark),
            image_path: None,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|err| {
        if repositories::is_unique_violation(&err) {
            AuthoringError::DuplicateQuestion
        } else {
            AuthoringError::Database(err)
        }
    })
}

/// A question deleted between lookup and save surfaces as `QuestionNotFound`.
pub(crate) async fn update_question(
    pool: &PgPool,
    question_id: &str,
    question_text: Option<&str>,
    mark_weight: Option<f64>,
) -> Result<Question, AuthoringError> {
    let text = question_text.map(str::trim);
    if text.is_some_and(str::is_empty) {
        return Err(AuthoringError::Validation(vec!["Question text is required".to_string()]));
    }
    if mark_weight.is_some_and(|mark| !mark.is_finite() || mark <= 0.0) {
        return Err(AuthoringError::Validation(vec!["Mark weight must be positive".to_string()]));
    }

    let existing = repositories::questions::find_by_id(pool, question_id)
        .await?
        .ok_or(AuthoringError::QuestionNotFound)?;
    if let Some(text) = text {
        if repositories::questions::text_exists(pool, &existing.exam_id, text, Some(question_id))
            .await?
        {
            return Err(AuthoringError::DuplicateQuestion);
        }
    }

    repositories::questions::update(pool, question_id, text, mark_weight)
        .await
        .map_err(|err| {
            if repositories::is_unique_violation(&err) {
                AuthoringError::DuplicateQuestion
            } else {
                AuthoringError::Database(err)
            }
        })?
        .ok_or(AuthoringError::QuestionNotFound)
}

pub(crate) async fn delete_question(pool: &PgPool, question_id: &str) -> Result<(), AuthoringError> {
    if repositories::questions::delete_by_id(pool, question_id).await? == 0 {
        return Err(AuthoringError::QuestionNotFound);
    }
    Ok(())
}

pub(crate) async fn list_choices(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<Choice>, AuthoringError> {
    repositories::questions::find_by_id(pool, question_id)
        .await?
        .ok_or(AuthoringError::QuestionNotFound)?;
    Ok(repositories::choices::list_by_question(pool, question_id).await?)
}

pub(crate) async fn add_choice(
    pool: &PgPool,
    question_id: &str,
    choice_text: &str,
    is_answer: bool,
) -> Result<Choice, AuthoringError> {
    let text = choice_text.trim();
    if text.is_empty() {
        return Err(AuthoringError::Validation(vec!["Choice text is required".to_string()]));
    }

    repositories::questions::find_by_id(pool, question_id)
        .await?
        .ok_or(AuthoringError::QuestionNotFound)?;
    if repositories::choices::text_exists(pool, question_id, text).await? {
        return Err(AuthoringError::DuplicateChoice);
    }

    Ok(repositories::choices::create(pool, &Uuid::new_v4().to_string(), question_id, text, is_answer)
        .await?)
}

pub(crate) async fn delete_choice(pool: &PgPool, choice_id: &str) -> Result<(), AuthoringError> {
    if repositories::choices::delete_by_id(pool, choice_id).await? == 0 {
        return Err(AuthoringError::ChoiceNotFound);
    }
    Ok(())
}
