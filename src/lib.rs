pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, PipelinePolicy};
use crate::database::memory::{MemoryCandidateStore, MemoryJobStore, MemoryRecruiterStore};
use crate::database::postgres::{PgCandidateStore, PgJobStore, PgRecruiterStore};
use crate::database::{CandidateStore, JobStore, RecruiterStore};
use crate::error::Result;
use crate::middleware::auth::{require_recruiter, TokenIssuer};
use crate::middleware::cors::cors_layer;
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::services::{
    job_service::JobService,
    message_gateway::{self, MessageGateway},
    notification_service::NotificationService,
    pipeline_service::PipelineService,
    reasoning_client::{OpenAiClient, ReasoningClient},
    recruiter_service::RecruiterService,
    scoring_service::{RetryPolicy, ScoringService},
};
use crate::utils::time::{Clock, SystemClock};

/// Request bodies larger than this are refused before parsing. Resumes are
/// plain text.
const BODY_LIMIT_BYTES: usize = 256 * 1024;

/// Storage and outbound adapters the services run on.
#[derive(Clone)]
pub struct Backends {
    pub candidates: Arc<dyn CandidateStore>,
    pub jobs: Arc<dyn JobStore>,
    pub recruiters: Arc<dyn RecruiterStore>,
    pub reasoning: Arc<dyn ReasoningClient>,
    pub gateway: Arc<dyn MessageGateway>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Postgres when a pool is given, process memory otherwise.
    pub fn from_config(config: &Config, pool: Option<PgPool>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.reasoning.timeout)
            .build()?;

        let (candidates, jobs, recruiters): (
            Arc<dyn CandidateStore>,
            Arc<dyn JobStore>,
            Arc<dyn RecruiterStore>,
        ) = match pool {
            Some(pool) => (
                Arc::new(PgCandidateStore::new(pool.clone())),
                Arc::new(PgJobStore::new(pool.clone())),
                Arc::new(PgRecruiterStore::new(pool)),
            ),
            None => {
                info!("DATABASE_URL not set, records are kept in memory");
                (
                    Arc::new(MemoryCandidateStore::new()),
                    Arc::new(MemoryJobStore::new()),
                    Arc::new(MemoryRecruiterStore::new()),
                )
            }
        };

        Ok(Self {
            candidates,
            jobs,
            recruiters,
            reasoning: Arc::new(OpenAiClient::new(&config.reasoning, http_client.clone())),
            gateway: message_gateway::from_config(&config.mail, http_client),
            clock: Arc::new(SystemClock),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenIssuer,
    pub pipeline: PipelineService,
    pub jobs: JobService,
    pub recruiters: RecruiterService,
}

impl AppState {
    pub fn new(backends: Backends, tokens: TokenIssuer, policy: PipelinePolicy, retry: RetryPolicy) -> Self {
        let scoring = ScoringService::new(backends.reasoning, retry);
        let notifier = NotificationService::new(backends.gateway);
        let pipeline = PipelineService::new(
            backends.candidates,
            backends.jobs.clone(),
            backends.recruiters.clone(),
            scoring,
            notifier,
            policy,
            backends.clock,
        );
        Self {
            jobs: JobService::new(backends.jobs),
            recruiters: RecruiterService::new(backends.recruiters, tokens.clone()),
            tokens,
            pipeline,
        }
    }

    /// Wires the state from configuration and creates the bootstrap
    /// super-admin if one is configured.
    pub async fn from_config(config: &Config, pool: Option<PgPool>) -> Result<Self> {
        let backends = Backends::from_config(config, pool)?;
        let state = Self::new(
            backends,
            TokenIssuer::new(config.jwt_secret.clone(), config.session_ttl_hours),
            config.policy.clone(),
            RetryPolicy::from(&config.reasoning),
        );
        if let Some(admin) = &config.admin {
            state.recruiters.bootstrap_admin(admin).await?;
        }
        Ok(state)
    }
}

/// Full HTTP surface. Recruiter routes sit behind bearer-token auth; the
/// applicant-facing routes share one rate limiter.
pub fn build_router(state: AppState, public_rps: u32, cors_origin: Option<&str>) -> Router {
    let recruiter_api = Router::new()
        .route("/api/recruiters", get(routes::auth::list_recruiters).post(routes::auth::create_recruiter))
        .route("/api/jobs", get(routes::jobs::list_jobs).post(routes::jobs::create_job))
        .route(
            "/api/jobs/:id",
            get(routes::jobs::get_job)
                .patch(routes::jobs::update_job)
                .delete(routes::jobs::delete_job),
        )
        .route("/api/jobs/:id/screen", post(routes::jobs::screen_batch))
        .route("/api/candidates", get(routes::candidates::list_candidates))
        .route("/api/candidates/purge", post(routes::candidates::purge_archived))
        .route("/api/candidates/leaderboard", get(routes::candidates::leaderboard))
        .route("/api/candidates/:id", get(routes::candidates::get_candidate))
        .route(
            "/api/candidates/:id/aptitude",
            post(routes::candidates::schedule_aptitude),
        )
        .route(
            "/api/candidates/:id/interview",
            post(routes::candidates::schedule_interview),
        )
        .route(
            "/api/candidates/:id/select",
            post(routes::candidates::select_candidate),
        )
        .route(
            "/api/candidates/:id/joining",
            post(routes::candidates::schedule_joining),
        )
        .route(
            "/api/candidates/:id/reject",
            post(routes::candidates::reject_candidate),
        )
        .route(
            "/api/candidates/:id/archive",
            post(routes::candidates::archive_candidate),
        )
        .route(
            "/api/candidates/:id/restore",
            post(routes::candidates::restore_candidate),
        )
        .route(
            "/api/candidates/:id/owner",
            post(routes::candidates::reassign_owner),
        )
        .route(
            "/api/candidates/:id/notify",
            post(routes::candidates::resend_notification),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_recruiter,
        ));

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/public/jobs", get(routes::jobs::list_public_jobs))
        .route(
            "/api/public/applications",
            post(routes::public::submit_application),
        )
        .route("/api/public/login", post(routes::public::login))
        .route("/api/public/candidates/:key", get(routes::public::portal))
        .route("/api/public/candidates/:key/exam", get(routes::public::get_exam))
        .route("/api/public/candidates/:key/exam/start", post(routes::public::start_exam))
        .route("/api/public/candidates/:key/exam/answer", patch(routes::public::save_answer))
        .route("/api/public/candidates/:key/exam/submit", post(routes::public::submit_exam))
        .route(
            "/api/public/candidates/:key/assessment",
            get(routes::public::get_assessment),
        )
        .route(
            "/api/public/candidates/:key/assessment/answer",
            post(routes::public::answer_assessment),
        )
        .route(
            "/api/public/candidates/:key/documents",
            post(routes::public::confirm_documents),
        )
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ));

    Router::new()
        .merge(recruiter_api)
        .merge(public_api)
        .with_state(state)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}
