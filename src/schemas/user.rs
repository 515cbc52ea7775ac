use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserLogin {
    #[validate(length(min = 1, max = 64, message = "username must be 1-64 characters"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PasswordChange {
    #[serde(alias = "currentPassword")]
    pub(crate) current_password: String,
    #[serde(alias = "newPassword")]
    #[validate(length(min = 6, message = "new_password must be at least 6 characters"))]
    pub(crate) new_password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) must_change_password: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            must_change_password: user.must_change_password,
            created_at: format_primitive(user.created_at),
        }
    }
}
