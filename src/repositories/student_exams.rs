use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::StudentExam;

const COLUMNS: &str = "id, student_id, exam_id, start_time, end_time, taken_exam, score";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) score: f64,
    pub(crate) total_questions: i64,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: Option<PrimitiveDateTime>,
}

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    exam_id: &str,
) -> Result<Option<StudentExam>, sqlx::Error> {
    sqlx::query_as::<_, StudentExam>(&format!(
        "SELECT {COLUMNS} FROM student_exams WHERE student_id = $1 AND exam_id = $2"
    ))
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(executor)
    .await
}

/// Creates the row as taken, or updates score/end/taken in place.
/// `start_time` is only ever written on insert.
pub(crate) async fn upsert_finalized(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    exam_id: &str,
    score: f64,
    now: PrimitiveDateTime,
) -> Result<StudentExam, sqlx::Error> {
    sqlx::query_as::<_, StudentExam>(&format!(
        "INSERT INTO student_exams (
            id, student_id, exam_id, start_time, end_time, taken_exam, score
        ) VALUES ($1,$2,$3,$4,$4,TRUE,$5)
        ON CONFLICT (student_id, exam_id) DO UPDATE SET
            score = EXCLUDED.score,
            end_time = EXCLUDED.end_time,
            taken_exam = TRUE
        RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(student_id)
    .bind(exam_id)
    .bind(now)
    .bind(score)
    .fetch_one(executor)
    .await
}

/// Completed results, most recent end time first.
pub(crate) async fn history(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        "SELECT se.exam_id,
                e.title AS exam_title,
                se.score,
                (SELECT COUNT(*) FROM questions q WHERE q.exam_id = se.exam_id) AS total_questions,
                se.start_time,
                se.end_time
         FROM student_exams se
         JOIN exams e ON e.id = se.exam_id
         WHERE se.student_id = $1 AND se.taken_exam
         ORDER BY se.end_time DESC NULLS LAST, se.id",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Newest result by start time, skipping exams the student is banned from.
pub(crate) async fn latest_by_start(
    pool: &PgPool,
    student_id: &str,
) -> Result<Option<StudentExam>, sqlx::Error> {
    sqlx::query_as::<_, StudentExam>(&format!(
        "SELECT {COLUMNS} FROM student_exams se
         WHERE se.student_id = $1
           AND NOT EXISTS (
               SELECT 1 FROM exam_bans b
               WHERE b.student_id = se.student_id AND b.exam_id = se.exam_id
           )
         ORDER BY se.start_time DESC, se.id DESC
         LIMIT 1"
    ))
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
