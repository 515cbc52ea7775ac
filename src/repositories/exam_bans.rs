use sqlx::PgPool;
use time::PrimitiveDateTime;

pub(crate) async fn is_banned(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM exam_bans WHERE student_id = $1 AND exam_id = $2)",
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

/// Keeps the original `banned_at` when the ban already exists.
pub(crate) async fn insert(
    pool: &PgPool,
    student_id: &str,
    exam_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_bans (student_id, exam_id, banned_at) VALUES ($1, $2, $3)
         ON CONFLICT (student_id, exam_id) DO NOTHING",
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, student_id: &str, exam_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_bans WHERE student_id = $1 AND exam_id = $2")
        .bind(student_id)
        .bind(exam_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
