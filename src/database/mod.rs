//! Record store adapters.
//!
//! The pipeline only talks to the traits below. `postgres` keeps candidates as
//! JSONB documents next to typed job and recruiter tables; `memory` backs
//! tests and database-less deployments.

pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{candidate::Candidate, job::Job, recruiter::Recruiter};

/// Candidate documents. `save` is a whole-document upsert by id: the last
/// writer wins and nothing is merged.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Candidate>;
    async fn find_by_access_key(&self, access_key: &str) -> Result<Option<Candidate>>;
    async fn list(&self) -> Result<Vec<Candidate>>;
    async fn save(&self, candidate: &Candidate) -> Result<()>;
    /// Deletes the listed records that are archived; others are left alone.
    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Job>>;
    async fn get(&self, id: Uuid) -> Result<Job>;
    async fn find_by_title(&self, title: &str) -> Result<Option<Job>>;
    async fn insert(&self, job: &Job) -> Result<()>;
    async fn update(&self, job: &Job) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RecruiterStore: Send + Sync {
    async fn get(&self, username: &str) -> Result<Option<Recruiter>>;
    async fn list(&self) -> Result<Vec<Recruiter>>;
    async fn insert(&self, recruiter: &Recruiter) -> Result<()>;
}

pub(crate) fn ensure_valid(candidate: &Candidate) -> Result<()> {
    candidate.check_document().map_err(|reason| {
        Error::Internal(format!("candidate {} failed document checks: {}", candidate.id, reason))
    })
}

pub(crate) fn candidate_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Candidate {} not found", id))
}

pub(crate) fn job_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Job {} not found", id))
}
