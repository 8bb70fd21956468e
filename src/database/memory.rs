use std::collections::HashMap;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{candidate_not_found, ensure_valid, job_not_found, CandidateStore, JobStore, RecruiterStore};
use crate::error::{Error, Result};
use crate::models::{candidate::Candidate, job::Job, recruiter::Recruiter};

#[derive(Default)]
pub struct MemoryCandidateStore {
    records: RwLock<HashMap<Uuid, Candidate>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn get(&self, id: Uuid) -> Result<Candidate> {
        let records = self.records.read().await;
        records.get(&id).cloned().ok_or_else(|| candidate_not_found(id))
    }

    async fn find_by_access_key(&self, access_key: &str) -> Result<Option<Candidate>> {
        let records = self.records.read().await;
        let found = records
            .values()
            .find(|c| bool::from(c.access_key.as_bytes().ct_eq(access_key.as_bytes())))
            .cloned();
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<Candidate>> {
        let records = self.records.read().await;
        let mut all: Vec<Candidate> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn save(&self, candidate: &Candidate) -> Result<()> {
        ensure_valid(candidate)?;
        let mut records = self.records.write().await;
        records.insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64> {
        let mut records = self.records.write().await;
        let mut removed = 0;
        for id in ids {
            if records.get(id).is_some_and(|c| c.archived) {
                records.remove(id);
                removed += 1;
            }
        }
        Ok(removed as u64)
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn list(&self) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).cloned().ok_or_else(|| job_not_found(id))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Job>> {
        let wanted = title.trim().to_lowercase();
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .find(|job| job.title.to_lowercase() == wanted)
            .cloned())
    }

    async fn insert(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(job_not_found(job.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(&id).map(|_| ()).ok_or_else(|| job_not_found(id))
    }
}

#[derive(Default)]
pub struct MemoryRecruiterStore {
    recruiters: RwLock<HashMap<String, Recruiter>>,
}

impl MemoryRecruiterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecruiterStore for MemoryRecruiterStore {
    async fn get(&self, username: &str) -> Result<Option<Recruiter>> {
        let recruiters = self.recruiters.read().await;
        Ok(recruiters.get(username).cloned())
    }

    async fn list(&self) -> Result<Vec<Recruiter>> {
        let recruiters = self.recruiters.read().await;
        let mut all: Vec<Recruiter> = recruiters.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    async fn insert(&self, recruiter: &Recruiter) -> Result<()> {
        let mut recruiters = self.recruiters.write().await;
        if recruiters.contains_key(&recruiter.username) {
            return Err(Error::Validation(format!(
                "Recruiter '{}' already exists",
                recruiter.username
            )));
        }
        recruiters.insert(recruiter.username.clone(), recruiter.clone());
        Ok(())
    }
}
