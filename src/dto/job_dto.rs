use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::ScreeningResult;
use crate::models::job::Job;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 60))]
    pub min_experience_years: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<String>>,
    #[validate(range(min = 0, max = 60))]
    pub min_experience_years: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub min_experience_years: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            description: job.description,
            required_skills: job.required_skills,
            min_experience_years: job.min_experience_years,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Public listing; internal thresholds stay out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicJobSummary {
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
}

impl From<Job> for PublicJobSummary {
    fn from(job: Job) -> Self {
        Self {
            title: job.title,
            description: job.description,
            required_skills: job.required_skills,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchResume {
    #[validate(length(min = 1, max = 200))]
    pub label: String,
    #[validate(length(min = 20, max = 100000))]
    pub resume_text: String,
}

/// Resumes screened against one job without creating candidates.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchScreeningPayload {
    #[validate(length(min = 1, max = 25))]
    pub resumes: Vec<BatchResume>,
}

/// What an entry of a batch duplicates, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ref")]
pub enum DuplicateRef {
    Candidate(Uuid),
    Entry(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchScreeningResult {
    pub label: String,
    pub screening: Option<ScreeningResult>,
    pub duplicate_of: Option<DuplicateRef>,
    pub error: Option<String>,
}
