use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::auth_dto::{CreateRecruiterPayload, LoginPayload, LoginResponse},
    error::Result,
    models::recruiter::{Recruiter, RecruiterSession},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Session token issued", body = Json<LoginResponse>),
        (status = 401, description = "Unknown username or wrong password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let session: LoginResponse = state.recruiters.login(payload).await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/api/recruiters",
    responses(
        (status = 200, description = "All recruiter accounts", body = Json<Vec<Recruiter>>)
    )
)]
#[axum::debug_handler]
pub async fn list_recruiters(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let recruiters: Vec<Recruiter> = state.recruiters.list().await?;
    Ok(Json(recruiters))
}

#[utoipa::path(
    post,
    path = "/api/recruiters",
    request_body = CreateRecruiterPayload,
    responses(
        (status = 201, description = "Recruiter created", body = Json<Recruiter>),
        (status = 400, description = "Invalid payload or duplicate username"),
        (status = 403, description = "Caller is not a super-admin")
    )
)]
#[axum::debug_handler]
pub async fn create_recruiter(
    State(state): State<AppState>,
    Extension(actor): Extension<RecruiterSession>,
    Json(payload): Json<CreateRecruiterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let recruiter: Recruiter = state.recruiters.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(recruiter)))
}
