use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::core::security::{self, SecurityError};
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub(crate) enum AccountError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("account not found")]
    NotFound,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account is disabled")]
    Inactive,
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub(crate) struct NewAccount<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) role: UserRole,
    pub(crate) must_change_password: bool,
}

/// Policy problems with a username/password pair, empty when acceptable.
pub(crate) fn credential_problems(username: &str, password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if username.trim().is_empty() {
        problems.push("Username is required".to_string());
    } else if username.chars().count() > MAX_USERNAME_LEN {
        problems.push(format!("Username must be at most {MAX_USERNAME_LEN} characters"));
    }
    if username.chars().any(char::is_whitespace) {
        problems.push("Username must not contain whitespace".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    problems
}

/// Creates an identity account on the given connection so callers can place
/// it inside their own transaction.
pub(crate) async fn create_account(
    conn: &mut PgConnection,
    account: NewAccount<'_>,
) -> Result<User, AccountError> {
    let mut problems = credential_problems(account.username, account.password);
    if problems.is_empty() && repositories::users::username_exists(&mut *conn, account.username).await?
    {
        problems.push(format!("Username '{}' is already taken", account.username));
    }
    if !problems.is_empty() {
        return Err(AccountError::Validation(problems));
    }

    let hashed_password = security::hash_password(account.password)?;
    let user = repositories::users::create(
        &mut *conn,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: account.username,
            hashed_password,
            full_name: account.full_name,
            role: account.role,
            must_change_password: account.must_change_password,
            now: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), action = "account_created", "Account created");
    Ok(user)
}

pub(crate) async fn authenticate(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> Result<User, AccountError> {
    let user = repositories::users::find_by_username(pool, username.trim())
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| AccountError::InvalidCredentials)?;
    if !verified {
        return Err(AccountError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AccountError::Inactive);
    }

    Ok(user)
}

pub(crate) async fn is_in_role(
    pool: &PgPool,
    user_id: &str,
    role: UserRole,
) -> Result<bool, AccountError> {
    let current = repositories::users::role_of(pool, user_id).await?;
    Ok(current == Some(role))
}

pub(crate) async fn set_must_change_password(
    pool: &PgPool,
    user_id: &str,
    value: bool,
) -> Result<(), AccountError> {
    let updated =
        repositories::users::set_must_change_password(pool, user_id, value, primitive_now_utc())
            .await?;
    if !updated {
        return Err(AccountError::NotFound);
    }
    Ok(())
}

/// Verifies the current password, stores the new one and clears the
/// must-change flag.
pub(crate) async fn change_password(
    pool: &PgPool,
    user_id: &str,
    current_password: &str,
    new_password: &str,
) -> Result<(), AccountError> {
    let user =
        repositories::users::find_by_id(pool, user_id).await?.ok_or(AccountError::NotFound)?;

    if !security::verify_password(current_password, &user.hashed_password)? {
        return Err(AccountError::InvalidCredentials);
    }

    let mut problems = credential_problems(&user.username, new_password);
    if current_password == new_password {
        problems.push("New password must differ from the current one".to_string());
    }
    if !problems.is_empty() {
        return Err(AccountError::Validation(problems));
    }

    let hashed = security::hash_password(new_password)?;
    repositories::users::set_password(pool, user_id, &hashed, false, primitive_now_utc()).await?;
    tracing::info!(user_id = %user_id, action = "password_changed", "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn policy_collects_every_problem() {
        let problems = credential_problems("", "123");
        assert_eq!(problems.len(), 2);

        let long_name = "x".repeat(65);
        assert_eq!(credential_problems(&long_name, "secret1").len(), 1);
        assert!(credential_problems("AbebeKebede1234", "secret").is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_validation_error() {
        let ctx = test_support::setup_test_context().await;
        let mut conn = ctx.state.db().acquire().await.expect("conn");

        let account = || NewAccount {
            username: "coord",
            password: "secret1",
            full_name: "Coordinator",
            role: UserRole::Coordinator,
            must_change_password: false,
        };
        create_account(&mut *conn, account()).await.expect("first");
        let err = create_account(&mut *conn, account()).await.expect_err("duplicate");

        match err {
            AccountError::Validation(problems) => {
                assert!(problems[0].contains("already taken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn change_password_clears_flag_and_checks_current() {
        let ctx = test_support::setup_test_context().await;
        let student = test_support::insert_student(ctx.state.db(), "Abebe Kebede", "UGR/1234/15").await;

        assert!(is_in_role(ctx.state.db(), &student.user_id, UserRole::Student).await.expect("role"));
        assert!(!is_in_role(ctx.state.db(), &student.user_id, UserRole::Coordinator)
            .await
            .expect("role"));

        let err = change_password(ctx.state.db(), &student.user_id, "wrong-one", "newpass1")
            .await
            .expect_err("wrong current");
        assert!(matches!(err, AccountError::InvalidCredentials));

        change_password(ctx.state.db(), &student.user_id, test_support::STUDENT_PASSWORD, "newpass1")
            .await
            .expect("changed");

        let user = repositories::users::find_by_id(ctx.state.db(), &student.user_id)
            .await
            .expect("query")
            .expect("user");
        assert!(!user.must_change_password);
        assert!(authenticate(ctx.state.db(), &user.username, "newpass1").await.is_ok());
    }
}
