use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        BatchScreeningPayload, BatchScreeningResult, CreateJobPayload, JobResponse, PublicJobSummary,
        UpdateJobPayload,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job created successfully", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload or duplicate title")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.jobs.create(payload).await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

#[utoipa::path(
    patch,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = UpdateJobPayload,
    responses(
        (status = 200, description = "Job updated successfully", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.jobs.update(id, payload).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job deleted successfully"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.jobs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "List of jobs", body = Json<Vec<JobResponse>>)
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.jobs.list().await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = Json<JobResponse>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.jobs.get(id).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    get,
    path = "/api/public/jobs",
    responses(
        (status = 200, description = "Open roles applicants can apply for", body = Json<Vec<PublicJobSummary>>)
    )
)]
#[axum::debug_handler]
pub async fn list_public_jobs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.jobs.list().await?;
    Ok(Json(jobs.into_iter().map(PublicJobSummary::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/screen",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = BatchScreeningPayload,
    responses(
        (status = 200, description = "Resumes screened, best first", body = Json<Vec<BatchScreeningResult>>),
        (status = 400, description = "Empty batch, too many resumes or invalid entry"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn screen_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BatchScreeningPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    for resume in &payload.resumes {
        resume.validate()?;
    }
    let results = state.pipeline.screen_batch(id, &payload.resumes).await?;
    Ok(Json(results))
}
