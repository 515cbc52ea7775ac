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
use crate::api::validation::{read_file_field, validate_upload_extension, ARCHIVE_EXTENSIONS};
use crate::core::state::AppState;
use crate::schemas::exam::{
    ExamCreate, ExamDetailResponse, ExamResponse, ExamUpdate, ImportSummaryResponse,
};
use crate::schemas::question::{QuestionCreate, QuestionResponse};
use crate::schemas::student::{BanRequest, BanResponse};
use crate::services::{authoring, exam_session, question_import};


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
        .route("/:exam_id/publish", post(publish_exam))
        .route("/:exam_id/questions", get(list_questions).post(create_question))
        .route("/:exam_id/import", post(import_questions))
        .route("/:exam_id/students/:student_id/ban", post(set_ban))
}

async fn list_exams(
    Query(params): Query<ListParams>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let (skip, limit) = params.bounds();
    let exams = authoring::list_exams(state.db(), skip, limit).await?;
    Ok(Json(exams.into_iter().map(ExamResponse::from_db).collect()))
}

async fn create_exam(
    CurrentCoordinator(user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = authoring::create_exam(state.db(), &user.id, payload.into_draft()).await?;
    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let aggregate = authoring::get_exam(state.db(), &exam_id).await?;
    Ok(Json(ExamDetailResponse::from_aggregate(aggregate)))
}

async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = authoring::update_exam(state.db(), &exam_id, payload.into_changes()).await?;
    Ok(Json(ExamResponse::from_db(exam)))
}

async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    authoring::delete_exam(state.db(), &exam_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_exam(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = authoring::publish_exam(state.db(), &exam_id).await?;
    Ok(Json(ExamResponse::from_db(exam)))
}

async fn list_questions(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let aggregate = authoring::get_exam(state.db(), &exam_id).await?;
    Ok(Json(aggregate.questions.into_iter().map(QuestionResponse::from_aggregate).collect()))
}

async fn create_question(
    Path(exam_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let question = authoring::create_question(
        state.db(),
        &exam_id,
        &payload.question_text,
        payload.mark_weight,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, Vec::new()))))
}

async fn import_questions(
    Path(exam_id): Path<String>,
    CurrentCoordinator(user): CurrentCoordinator,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportSummaryResponse>), ApiError> {
    let import_settings = state.settings().import();
    let upload = read_file_field(&mut multipart, import_settings.max_upload_bytes()).await?;
    validate_upload_extension(&upload.file_name, ARCHIVE_EXTENSIONS)?;

    tracing::info!(
        exam_id = %exam_id,
        user_id = %user.id,
        file_name = %upload.file_name,
        size = upload.bytes.len(),
        action = "questions_import_started",
        "Question import started"
    );

    let summary = question_import::import_questions(
        state.db(),
        state.images(),
        import_settings,
        &exam_id,
        upload.bytes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(summary.into())))
}

async fn set_ban(
    Path((exam_id, student_id)): Path<(String, String)>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<BanResponse>, ApiError> {
    let status = exam_session::set_ban(state.db(), &student_id, &exam_id, payload.banned).await?;
    Ok(Json(status.into()))
}
