//! Student-facing exam flow: entering with an access code, paging through
//! questions, saving answers and reading results.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::schemas::exam::AvailableExamResponse;
use crate::schemas::session::{
    AnswerSubmit, EnterExamRequest, ExamResultResponse, SessionStepResponse, SubmitResponse,
};
use crate::services::exam_session::{self, SubmitAnswer};

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exams", get(available_exams))
        .route("/exams/:exam_id/enter", post(enter_exam))
        .route("/exams/:exam_id/questions/:index", get(fetch_question))
        .route("/exams/:exam_id/answers", post(submit_answer))
        .route("/exams/:exam_id/result", get(exam_result))
        .route("/results", get(history))
        .route("/results/latest", get(latest_result))
}

async fn available_exams(
    current: CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailableExamResponse>>, ApiError> {
    let exams = exam_session::available_exams(state.db(), &current.student.id).await?;
    Ok(Json(exams.into_iter().map(AvailableExamResponse::from_db).collect()))
}

async fn enter_exam(
    Path(exam_id): Path<String>,
    current: CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<EnterExamRequest>,
) -> Result<Json<SessionStepResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let step =
        exam_session::enter_exam(state.db(), &current.student.id, &exam_id, &payload.access_code)
            .await?;
    Ok(Json(step.into()))
}

async fn fetch_question(
    Path((exam_id, index)): Path<(String, i64)>,
    current: CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SessionStepResponse>, ApiError> {
    let step = exam_session::fetch_question(state.db(), &current.student.id, &exam_id, index).await?;
    Ok(Json(step.into()))
}

async fn submit_answer(
    Path(exam_id): Path<String>,
    current: CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<SubmitResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = exam_session::submit_answer(
        state.db(),
        SubmitAnswer {
            student_id: &current.student.id,
            exam_id: &exam_id,
            question_id: &payload.question_id,
            choice_id: payload.choice_id.as_deref(),
            flagged: payload.flagged,
            next_index: payload.next_index,
        },
    )
    .await?;
    Ok(Json(outcome.into()))
}

async fn exam_result(
    Path(exam_id): Path<String>,
    current: CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<ExamResultResponse>, ApiError> {
    let result = exam_session::finalize_result(state.db(), &current.student.id, &exam_id).await?;
    Ok(Json(result.into()))
}

async fn history(
    current: CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResultResponse>>, ApiError> {
    let results = exam_session::history(state.db(), &current.student.id).await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

async fn latest_result(
    current: CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<ExamResultResponse>, ApiError> {
    let result = exam_session::latest_result(state.db(), &current.student.id).await?;
    Ok(Json(result.into()))
}
