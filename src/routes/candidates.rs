use axum::{
    extract::{Extension, Path, Query, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        CandidateListQuery, CandidateResponse, LeaderboardEntry, LeaderboardQuery, PurgePayload, PurgeResponse, ReassignOwnerPayload,
        RejectPayload, ScheduleAptitudePayload, ScheduleInterviewPayload, ScheduleJoiningPayload,
        TransitionResponse,
    },
    error::Result,
    models::recruiter::RecruiterSession,
    services::pipeline_service::TransitionOutcome,
    AppState,
};

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            candidate: CandidateResponse::from(outcome.candidate),
            notification: outcome.notification,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/candidates",
    params(
        ("stage" = Option<String>, Query, description = "Filter by stage"),
        ("archived" = Option<bool>, Query, description = "Filter by archived flag"),
        ("owner" = Option<String>, Query, description = "Filter by owning recruiter")
    ),
    responses(
        (status = 200, description = "Candidates, newest first", body = Json<Vec<CandidateResponse>>)
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let candidates = state.pipeline.list(&query).await?;
    Ok(Json(
        candidates
            .into_iter()
            .map(CandidateResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate found", body = Json<CandidateResponse>),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.pipeline.get(id).await?;
    Ok(Json(CandidateResponse::from(candidate)))
}

#[axum::debug_handler]
pub async fn schedule_aptitude(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleAptitudePayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .pipeline
        .schedule_aptitude(&actor, id, payload.start_at)
        .await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .pipeline
        .schedule_interview(&actor, id, payload.scheduled_at)
        .await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn select_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.pipeline.select(&actor, id).await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn schedule_joining(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleJoiningPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .pipeline
        .schedule_joining(&actor, id, payload.joining_date)
        .await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn reject_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state.pipeline.reject(&actor, id, &payload.reason).await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn archive_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.pipeline.archive(&actor, id).await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn restore_candidate(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.pipeline.restore(&actor, id).await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn reassign_owner(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignOwnerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .pipeline
        .reassign_owner(&actor, id, &payload.username)
        .await?;
    Ok(Json(TransitionResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn resend_notification(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let outcome = state.pipeline.resend_notification(&actor, id).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/candidates/purge",
    request_body = PurgePayload,
    responses(
        (status = 200, description = "Archived candidates deleted", body = Json<PurgeResponse>),
        (status = 403, description = "Caller is not a super-admin"),
        (status = 404, description = "A listed candidate does not exist"),
        (status = 412, description = "A listed candidate is not archived")
    )
)]
#[axum::debug_handler]
pub async fn purge_archived(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Json(payload): Json<PurgePayload>,
) -> Result<impl IntoResponse> {
    let purged = state.pipeline.purge_archived(&actor, &payload.ids).await?;
    Ok(Json(PurgeResponse { purged }))
}

#[utoipa::path(
    get,
    path = "/api/candidates/leaderboard",
    params(
        ("limit" = Option<usize>, Query, description = "Entries to return, 10 by default, at most 100")
    ),
    responses(
        (status = 200, description = "Active candidates ranked by points", body = Json<Vec<LeaderboardEntry>>)
    )
)]
#[axum::debug_handler]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse> {
    let ranked = state.pipeline.leaderboard(query.limit()).await?;
    Ok(Json(LeaderboardEntry::ranked(ranked)))
}
