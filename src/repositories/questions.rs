use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Question;

const COLUMNS: &str = "id, exam_id, question_text, mark_weight, image_path, created_at, seq";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY seq, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Case- and whitespace-insensitive duplicate check within one exam.
pub(crate) async fn text_exists(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    text: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM questions
            WHERE exam_id = $1
              AND lower(btrim(question_text)) = lower(btrim($2))
              AND ($3::text IS NULL OR id <> $3)
        )",
    )
    .bind(exam_id)
    .bind(text)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) mark_weight: f64,
    pub(crate) image_path: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, exam_id, question_text, mark_weight, image_path, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_text)
    .bind(params.mark_weight)
    .bind(params.image_path)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_text: Option<&str>,
    mark_weight: Option<f64>,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            question_text = COALESCE($1, question_text),
            mark_weight = COALESCE($2, mark_weight)
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(question_text)
    .bind(mark_weight)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}
