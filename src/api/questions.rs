use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentCoordinator;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::question::{ChoiceCreate, ChoiceResponse, QuestionResponse, QuestionUpdate};
use crate::services::authoring;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:question_id", get(get_question).patch(update_question).delete(delete_question))
        .route("/:question_id/choices", get(list_choices).post(add_choice))
}

pub(crate) fn choices_router() -> Router<AppState> {
    Router::new().route("/:choice_id", delete(delete_choice))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let choices = authoring::list_choices(state.db(), &question_id).await?;
    Ok(Json(QuestionResponse::from_db(question, choices)))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let question = authoring::update_question(
        state.db(),
        &question_id,
        payload.question_text.as_deref(),
        payload.mark_weight,
    )
    .await?;
    let choices = authoring::list_choices(state.db(), &question_id).await?;
    Ok(Json(QuestionResponse::from_db(question, choices)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    authoring::delete_question(state.db(), &question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_choices(
    Path(question_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChoiceResponse>>, ApiError> {
    let choices = authoring::list_choices(state.db(), &question_id).await?;
    Ok(Json(choices.into_iter().map(ChoiceResponse::from_db).collect()))
}

async fn add_choice(
    Path(question_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
    Json(payload): Json<ChoiceCreate>,
) -> Result<(StatusCode, Json<ChoiceResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let choice =
        authoring::add_choice(state.db(), &question_id, &payload.choice_text, payload.is_answer)
            .await?;
    Ok((StatusCode::CREATED, Json(ChoiceResponse::from_db(choice))))
}

async fn delete_choice(
    Path(choice_id): Path<String>,
    CurrentCoordinator(_user): CurrentCoordinator,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    authoring::delete_choice(state.db(), &choice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
