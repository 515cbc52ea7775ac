use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, username, hashed_password, full_name, role, is_active, must_change_password, \
    created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    executor: impl sqlx::PgExecutor<'_>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn username_exists(
    executor: impl sqlx::PgExecutor<'_>,
    username: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(executor)
        .await
}

pub(crate) async fn role_of(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<UserRole>, sqlx::Error> {
    sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) full_name: &'a str,
    pub(crate) role: UserRole,
    pub(crate) must_change_password: bool,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, hashed_password, full_name, role, is_active,
            must_change_password, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,TRUE,$6,$7,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.must_change_password)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_password(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    hashed_password: &str,
    must_change_password: bool,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET hashed_password = $1, must_change_password = $2, updated_at = $3
         WHERE id = $4",
    )
    .bind(hashed_password)
    .bind(must_change_password)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_must_change_password(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    value: bool,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET must_change_password = $1, updated_at = $2 WHERE id = $3")
            .bind(value)
            .bind(now)
            .bind(id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_full_name(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    full_name: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET full_name = $1, updated_at = $2 WHERE id = $3")
        .bind(full_name)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Restores a configured account to an active coordinator with the given hash.
pub(crate) async fn reconcile_coordinator(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    hashed_password: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET hashed_password = $1, role = $2, is_active = TRUE, updated_at = $3
         WHERE id = $4",
    )
    .bind(hashed_password)
    .bind(UserRole::Coordinator)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}
