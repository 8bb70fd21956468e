use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::database::JobStore;
use crate::dto::job_dto::{CreateJobPayload, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::job::Job;

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for skill in skills.into_iter().map(|s| s.trim().to_string()) {
        if !skill.is_empty() && !cleaned.iter().any(|c| c.eq_ignore_ascii_case(&skill)) {
            cleaned.push(skill);
        }
    }
    cleaned
}

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    async fn ensure_title_free(&self, title: &str, except: Option<Uuid>) -> Result<()> {
        if let Some(existing) = self.store.find_by_title(title).await? {
            if Some(existing.id) != except {
                return Err(Error::Validation(format!("A job titled '{}' already exists", title)));
            }
        }
        Ok(())
    }

    pub async fn create(&self, payload: CreateJobPayload) -> Result<Job> {
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("Job title cannot be blank".into()));
        }
        self.ensure_title_free(&title, None).await?;

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title,
            description: payload.description.trim().to_string(),
            required_skills: clean_skills(payload.required_skills),
            min_experience_years: payload.min_experience_years,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&job).await?;
        info!(job_id = %job.id, title = %job.title, "job created");
        Ok(job)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateJobPayload) -> Result<Job> {
        let mut job = self.store.get(id).await?;
        if let Some(title) = payload.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(Error::Validation("Job title cannot be blank".into()));
            }
            self.ensure_title_free(&title, Some(id)).await?;
            job.title = title;
        }
        if let Some(description) = payload.description {
            job.description = description.trim().to_string();
        }
        if let Some(skills) = payload.required_skills {
            job.required_skills = clean_skills(skills);
        }
        if let Some(years) = payload.min_experience_years {
            job.min_experience_years = years;
        }
        job.updated_at = Utc::now();
        self.store.update(&job).await?;
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<Job>> {
        self.store.list().await
    }

    /// Candidates keep the title frozen on their record, so removal does not
    /// touch them.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(id).await?;
        info!(job_id = %id, "job deleted");
        Ok(())
    }
}
