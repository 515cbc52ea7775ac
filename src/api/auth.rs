use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{PasswordChange, UserLogin, UserResponse};
use crate::services::accounts::{self, AccountError};

/// Max login attempts per username and window.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let username = payload.username.trim();

    let rate_key = format!("rl:login:{}", username.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = accounts::authenticate(state.db(), username, &payload.password)
        .await
        .map_err(|err| match err {
            AccountError::Inactive => ApiError::BadRequest("Inactive user".to_string()),
            other => other.into(),
        })?;

    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), action = "login", "User logged in");
    let expire_minutes = state.settings().security().access_token_expire_minutes;
    Ok(Json(TokenResponse::bearer(token, expire_minutes, user)))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PasswordChange>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    accounts::change_password(state.db(), &user.id, &payload.current_password, &payload.new_password)
        .await
        .map_err(|err| match err {
            AccountError::InvalidCredentials => {
                ApiError::BadRequest("Current password is incorrect".to_string())
            }
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
