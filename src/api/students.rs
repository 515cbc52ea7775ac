use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentCoordinator;
use crate::api::pagination::ListParams;
use crate::api::validation::{read_file_field, validate_upload_extension, ROSTER_EXTENSIONS};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::student::{
    BulkStudentResponse, ProvisionedStudentResponse, StudentCreate, StudentResponse, StudentUpdate,
};
use crate::services::{accounts, student_provisioning};

/// Rosters are small text files.
const MAX_ROSTER_BYTES: usize = 2 * 1024 * 1024;


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/bulk", post(bulk_create_students))
        .route("/:student_id", get(get_student).patch(update_student).delete(delete_student))
        .route("/:student_id/require-password-change", post(require_password_change))
}

async fn list_students(
    Query(params): Query<ListParams>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let (skip, limit) = params.bounds();
    let students = repositories::students::list(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    Ok(Json(students.into_iter().map(StudentResponse::from_db).collect()))
}

async fn create_student(
    CurrentCoordinator(user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<ProvisionedStudentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let provisioned = student_provisioning::provision_student(
        state.db(),
        &payload.into_details(),
        &state.settings().accounts().student_password_suffix,
    )
    .await?;

    tracing::info!(
        coordinator_id = %user.id,
        student_id = %provisioned.student.id,
        action = "student_created",
        "Student created by coordinator"
    );
    Ok((StatusCode::CREATED, Json(provisioned.into())))
}

async fn bulk_create_students(
    CurrentCoordinator(user): CurrentCoordinator,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BulkStudentResponse>), ApiError> {
    let upload = read_file_field(&mut multipart, MAX_ROSTER_BYTES).await?;
    validate_upload_extension(&upload.file_name, ROSTER_EXTENSIONS)?;

    let text = String::from_utf8(upload.bytes)
        .map_err(|_| ApiError::BadRequest("Roster must be UTF-8 text".to_string()))?;

    let outcome = student_provisioning::provision_roster(
        state.db(),
        &text,
        &state.settings().accounts().student_password_suffix,
    )
    .await?;

    tracing::info!(
        coordinator_id = %user.id,
        file_name = %upload.file_name,
        created = outcome.created.len(),
        action = "students_bulk_created",
        "Student roster uploaded"
    );
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

async fn get_student(
    Path(student_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    Ok(Json(StudentResponse::from_db(student)))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student =
        student_provisioning::update_student(state.db(), &student_id, payload.into_changes())
            .await?;
    Ok(Json(StudentResponse::from_db(student)))
}

async fn delete_student(
    Path(student_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    student_provisioning::delete_student(state.db(), &student_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Forces the student to pick a new password at their next login.
async fn require_password_change(
    Path(student_id): Path<String>,
    CurrentCoordinator(user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    accounts::set_must_change_password(state.db(), &student.user_id, true).await?;

    tracing::info!(
        coordinator_id = %user.id,
        student_id = %student_id,
        action = "password_change_required",
        "Student must change password"
    );
    Ok(StatusCode::NO_CONTENT)
}
