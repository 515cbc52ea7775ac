use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Student;

const COLUMNS: &str = "\
    id, user_id, full_name, gender, id_number, academic_year, department, \
    created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students ORDER BY full_name, id OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) gender: Option<&'a str>,
    pub(crate) id_number: &'a str,
    pub(crate) academic_year: Option<i32>,
    pub(crate) department: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, user_id, full_name, gender, id_number, academic_year, department,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.full_name)
    .bind(params.gender)
    .bind(params.id_number)
    .bind(params.academic_year)
    .bind(params.department)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateStudent {
    pub(crate) full_name: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) id_number: Option<String>,
    pub(crate) academic_year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateStudent,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            full_name = COALESCE($1, full_name),
            gender = COALESCE($2, gender),
            id_number = COALESCE($3, id_number),
            academic_year = COALESCE($4, academic_year),
            department = COALESCE($5, department),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.full_name)
    .bind(params.gender)
    .bind(params.id_number)
    .bind(params.academic_year)
    .bind(params.department)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// True when the student has any attempt or result row.
pub(crate) async fn has_exam_activity(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM exam_attempts WHERE student_id = $1)
             OR EXISTS(SELECT 1 FROM student_exams WHERE student_id = $1)",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected())
}
