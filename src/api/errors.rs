use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::accounts::AccountError;
use crate::services::authoring::AuthoringError;
use crate::services::exam_session::SessionError;
use crate::services::question_import::ImportError;
use crate::services::student_provisioning::StudentError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ExamNotFound
            | SessionError::QuestionNotFound
            | SessionError::StudentNotFound
            | SessionError::NoResults => Self::NotFound(err.to_string()),
            SessionError::ExamNotPublished | SessionError::InvalidAccessCode => {
                Self::BadRequest(err.to_string())
            }
            SessionError::Banned => Self::Forbidden("You are banned from this exam"),
            SessionError::AlreadyTaken => Self::Conflict(err.to_string()),
            SessionError::Database(err) => Self::internal(err, "Exam session query failed"),
        }
    }
}

impl From<AuthoringError> for ApiError {
    fn from(err: AuthoringError) -> Self {
        match err {
            AuthoringError::Validation(_) => Self::BadRequest(err.to_string()),
            AuthoringError::ExamNotFound
            | AuthoringError::QuestionNotFound
            | AuthoringError::ChoiceNotFound => Self::NotFound(err.to_string()),
            AuthoringError::DuplicateQuestion | AuthoringError::DuplicateChoice => {
                Self::Conflict(err.to_string())
            }
            AuthoringError::Database(err) => Self::internal(err, "Authoring query failed"),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ExamNotFound => Self::NotFound(err.to_string()),
            ImportError::Upload { .. } => Self::ServiceUnavailable(err.to_string()),
            err if err.is_validation() => Self::BadRequest(err.to_string()),
            err => Self::internal(err, "Question import failed"),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(_) => Self::BadRequest(err.to_string()),
            AccountError::NotFound => Self::NotFound(err.to_string()),
            AccountError::InvalidCredentials => Self::Unauthorized("Incorrect username or password"),
            AccountError::Inactive => Self::Forbidden("Account is disabled"),
            AccountError::Security(err) => Self::internal(err, "Password processing failed"),
            AccountError::Database(err) => Self::internal(err, "Account query failed"),
        }
    }
}

impl From<StudentError> for ApiError {
    fn from(err: StudentError) -> Self {
        match err {
            StudentError::Validation(_) => Self::BadRequest(err.to_string()),
            StudentError::NotFound => Self::NotFound(err.to_string()),
            StudentError::HasExamActivity => Self::Conflict(err.to_string()),
            StudentError::Account(err) => err.into(),
            StudentError::Database(err) => Self::internal(err, "Student query failed"),
        }
    }
}
