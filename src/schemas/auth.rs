use serde::Serialize;

use crate::db::models::User;
use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
    /// Token lifetime in seconds.
    pub(crate) expires_in: u64,
    /// Set for freshly provisioned students until they pick their own password.
    pub(crate) must_change_password: bool,
    pub(crate) user: UserResponse,
}

impl TokenResponse {
    pub(crate) fn bearer(access_token: String, expire_minutes: u64, user: User) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_in: expire_minutes.saturating_mul(60),
            must_change_password: user.must_change_password,
            user: UserResponse::from_db(user),
        }
    }
}
