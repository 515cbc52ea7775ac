use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;

const COLUMNS: &str = "\
    id, student_id, exam_id, question_id, choice_id, is_correct, is_flagged, \
    started_at, updated_at";

pub(crate) struct UpsertAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) choice_id: Option<&'a str>,
    pub(crate) is_correct: bool,
    pub(crate) is_flagged: bool,
    pub(crate) now: PrimitiveDateTime,
}

/// One row per (student, exam, question); a resubmission overwrites it.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAttempt<'_>,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (
            id, student_id, exam_id, question_id, choice_id, is_correct, is_flagged,
            started_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        ON CONFLICT (student_id, exam_id, question_id) DO UPDATE SET
            choice_id = EXCLUDED.choice_id,
            is_correct = EXCLUDED.is_correct,
            is_flagged = EXCLUDED.is_flagged,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.exam_id)
    .bind(params.question_id)
    .bind(params.choice_id)
    .bind(params.is_correct)
    .bind(params.is_flagged)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_student_exam(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE student_id = $1 AND exam_id = $2"
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_correct(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_attempts
         WHERE student_id = $1 AND exam_id = $2 AND is_correct",
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

/// Exam of the student's most recently touched attempt.
pub(crate) async fn latest_exam_id(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT exam_id FROM exam_attempts
         WHERE student_id = $1
         ORDER BY updated_at DESC, id DESC
         LIMIT 1",
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
}
