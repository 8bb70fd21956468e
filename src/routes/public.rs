//! Applicant-facing endpoints. Candidates authenticate with their access
//! key alone, either in the body (login) or in the path.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::public_dto::{
        AccessKeyLogin, AnswerInterviewPayload, ApplicationPayload, ApplicationResponse,
        AssessmentView, ExamView, PortalView, SaveAnswerPayload, SubmitResponse,
    },
    error::{Error, Result},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/public/applications",
    request_body = ApplicationPayload,
    responses(
        (status = 201, description = "Application stored, access key issued", body = Json<ApplicationResponse>),
        (status = 400, description = "Invalid payload or unknown role"),
        (status = 422, description = "Entered name does not match the resume"),
        (status = 502, description = "Screening service unavailable")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state.pipeline.submit_application(payload).await?;
    let notification = outcome
        .notification
        .ok_or_else(|| Error::Internal("Application notice was not dispatched".into()))?;
    let response = ApplicationResponse {
        candidate_id: outcome.candidate.id,
        access_key: outcome.candidate.access_key,
        stage: outcome.candidate.stage,
        notification,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/public/login",
    request_body = AccessKeyLogin,
    responses(
        (status = 200, description = "Portal view for the key holder", body = Json<PortalView>),
        (status = 401, description = "Unknown, malformed or archived key")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AccessKeyLogin>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let view: PortalView = state.pipeline.portal(&payload.access_key).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn portal(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let view = state.pipeline.portal(&key).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let view: ExamView = state.pipeline.exam(&key).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::info!("Starting exam for access key ending {}", key_suffix(&key));
    let view = state.pipeline.start_exam(&key).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<SaveAnswerPayload>,
) -> Result<impl IntoResponse> {
    let view = state.pipeline.save_answer(&key, &payload).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let result: SubmitResponse = state.pipeline.submit_exam(&key).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn confirm_documents(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let view = state.pipeline.confirm_documents(&key).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let view: AssessmentView = state.pipeline.interview_assessment(&key).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/api/public/candidates/{key}/assessment/answer",
    params(
        ("key" = String, Path, description = "Candidate access key")
    ),
    request_body = AnswerInterviewPayload,
    responses(
        (status = 200, description = "Answer evaluated", body = Json<AssessmentView>),
        (status = 400, description = "Unknown question or empty response"),
        (status = 401, description = "Unknown, malformed or archived key"),
        (status = 412, description = "Question already answered or no assessment open"),
        (status = 502, description = "Evaluation service unavailable")
    )
)]
#[axum::debug_handler]
pub async fn answer_assessment(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<AnswerInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let view = state.pipeline.answer_interview_question(&key, &payload).await?;
    Ok(Json(view))
}

/// Last four characters only; keys are credentials.
fn key_suffix(key: &str) -> &str {
    let trimmed = key.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(idx, _)| idx);
    &trimmed[start..]
}
