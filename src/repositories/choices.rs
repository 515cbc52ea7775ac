use sqlx::PgPool;

use crate::db::models::Choice;

const COLUMNS: &str = "id, question_id, choice_text, is_answer, seq";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!("SELECT {COLUMNS} FROM choices WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_question(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "SELECT {COLUMNS} FROM choices WHERE question_id = $1 ORDER BY seq, id"
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_questions(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<Vec<Choice>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Choice>(&format!(
        "SELECT {COLUMNS} FROM choices WHERE question_id = ANY($1) ORDER BY seq, id"
    ))
    .bind(question_ids)
    .fetch_all(pool)
    .await
}

/// `None` when the choice does not exist.
pub(crate) async fn is_answer(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar("SELECT is_answer FROM choices WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn text_exists(
    pool: &PgPool,
    question_id: &str,
    text: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM choices
            WHERE question_id = $1 AND lower(btrim(choice_text)) = lower(btrim($2))
        )",
    )
    .bind(question_id)
    .bind(text)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_id: &str,
    choice_text: &str,
    is_answer: bool,
) -> Result<Choice, sqlx::Error> {
    sqlx::query_as::<_, Choice>(&format!(
        "INSERT INTO choices (id, question_id, choice_text, is_answer)
         VALUES ($1,$2,$3,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(question_id)
    .bind(choice_text)
    .bind(is_answer)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM choices WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}
