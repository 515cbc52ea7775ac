use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Exam, ExamAggregate, QuestionWithChoices};
use crate::db::types::ExamStatus;
use crate::repositories::{choices, questions};

pub(crate) const COLUMNS: &str = "\
    id, title, description, academic_year, duration_minutes, default_mark, status, \
    access_code, created_by, created_at, updated_at, published_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Newest academic year first.
pub(crate) async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         ORDER BY academic_year DESC, created_at DESC, id
         OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Published exams without a completed result for the student.
pub(crate) async fn list_available_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams e
         WHERE e.status = $1
           AND NOT EXISTS (
               SELECT 1 FROM student_exams se
               WHERE se.exam_id = e.id AND se.student_id = $2 AND se.taken_exam
           )
         ORDER BY e.academic_year DESC, e.published_at DESC NULLS LAST, e.id"
    ))
    .bind(ExamStatus::Published)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) academic_year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) default_mark: f64,
    pub(crate) created_by: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, academic_year, duration_minutes, default_mark,
            status, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.academic_year)
    .bind(params.duration_minutes)
    .bind(params.default_mark)
    .bind(ExamStatus::Draft)
    .bind(params.created_by)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateExam {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: Option<i32>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) default_mark: Option<f64>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateExam,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            academic_year = COALESCE($3, academic_year),
            duration_minutes = COALESCE($4, duration_minutes),
            default_mark = COALESCE($5, default_mark),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.academic_year)
    .bind(params.duration_minutes)
    .bind(params.default_mark)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Marks the exam published. An existing access code is never replaced.
pub(crate) async fn publish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    candidate_code: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            status = $1,
            access_code = COALESCE(access_code, $2),
            published_at = COALESCE(published_at, $3),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(ExamStatus::Published)
    .bind(candidate_code)
    .bind(now)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Exam with every question and choice, questions in `(seq, id)` order.
pub(crate) async fn load_aggregate(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamAggregate>, sqlx::Error> {
    let Some(exam) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    let questions = questions::list_by_exam(pool, id).await?;
    let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    let mut choices_by_question: HashMap<String, Vec<_>> = HashMap::new();
    for choice in choices::list_by_questions(pool, &question_ids).await? {
        choices_by_question.entry(choice.question_id.clone()).or_default().push(choice);
    }

    let questions = questions
        .into_iter()
        .map(|question| {
            let choices = choices_by_question.remove(&question.id).unwrap_or_default();
            QuestionWithChoices { question, choices }
        })
        .collect();

    Ok(Some(ExamAggregate { exam, questions }))
}
