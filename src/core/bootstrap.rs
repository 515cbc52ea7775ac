use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::accounts::{self, NewAccount};

/// Creates the configured coordinator, or repairs its password, role and
/// active flag when the account already exists. Safe to run on every start.
pub(crate) async fn ensure_coordinator(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_coordinator_password.is_empty() {
        tracing::warn!("FIRST_COORDINATOR_PASSWORD not configured; skipping coordinator creation");
        return Ok(());
    }

    let username = admin.first_coordinator_username.trim();
    let existing = repositories::users::find_by_username(state.db(), username).await?;

    if let Some(user) = existing {
        let password_ok =
            security::verify_password(&admin.first_coordinator_password, &user.hashed_password)
                .unwrap_or(false);
        if password_ok && user.role == UserRole::Coordinator && user.is_active {
            tracing::info!(username = %username, "Default coordinator already up to date");
            return Ok(());
        }

        let hashed = if password_ok {
            user.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_coordinator_password)?
        };
        repositories::users::reconcile_coordinator(state.db(), &user.id, &hashed, primitive_now_utc())
            .await?;
        tracing::info!(username = %username, action = "coordinator_reconciled", "Updated default coordinator");
        return Ok(());
    }

    let mut conn = state.db().acquire().await?;
    accounts::create_account(
        &mut *conn,
        NewAccount {
            username,
            password: &admin.first_coordinator_password,
            full_name: "Exam Coordinator",
            role: UserRole::Coordinator,
            must_change_password: false,
        },
    )
    .await?;

    tracing::info!(username = %username, action = "coordinator_created", "Created default coordinator");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn coordinator_is_created_then_repaired() {
        let ctx = test_support::setup_test_context().await;
        let username = ctx.state.settings().admin().first_coordinator_username.clone();

        ensure_coordinator(&ctx.state).await.expect("create");
        let user = repositories::users::find_by_username(ctx.state.db(), &username)
            .await
            .expect("query")
            .expect("coordinator");
        assert_eq!(user.role, UserRole::Coordinator);

        sqlx::query("UPDATE users SET is_active = FALSE, hashed_password = 'stale' WHERE id = $1")
            .bind(&user.id)
            .execute(ctx.state.db())
            .await
            .expect("break account");

        ensure_coordinator(&ctx.state).await.expect("repair");
        let repaired = repositories::users::find_by_id(ctx.state.db(), &user.id)
            .await
            .expect("query")
            .expect("coordinator");
        assert!(repaired.is_active);
        assert!(security::verify_password(
            &ctx.state.settings().admin().first_coordinator_password,
            &repaired.hashed_password
        )
        .expect("verify"));
    }
}
