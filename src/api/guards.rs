use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Student, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::accounts;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentCoordinator(pub(crate) User);

/// A student-role user together with their student record.
pub(crate) struct CurrentStudent {
    pub(crate) user: User,
    pub(crate) student: Student,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        // Role changes invalidate older tokens.
        if !user.is_active || user.role != claims.role {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

async fn has_role(state: &AppState, user: &User, role: UserRole) -> Result<bool, ApiError> {
    accounts::is_in_role(state.db(), &user.id, role)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check user role"))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentCoordinator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if has_role(state, &user, UserRole::Coordinator).await? {
            Ok(CurrentCoordinator(user))
        } else {
            Err(ApiError::Forbidden("Coordinator access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !has_role(state, &user, UserRole::Student).await? {
            return Err(ApiError::Forbidden("Student access required"));
        }

        let student = repositories::students::find_by_user_id(state.db(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student"))?
            .ok_or(ApiError::Forbidden("No student record for this account"))?;

        Ok(CurrentStudent { user, student })
    }
}
