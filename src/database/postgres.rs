use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::{candidate_not_found, ensure_valid, job_not_found, CandidateStore, JobStore, RecruiterStore};
use crate::error::{Error, Result};
use crate::models::{candidate::Candidate, job::Job, recruiter::Recruiter};

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_candidate(document: JsonValue) -> Result<Candidate> {
    let candidate: Candidate = serde_json::from_value(document)?;
    ensure_valid(&candidate)?;
    Ok(candidate)
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn get(&self, id: Uuid) -> Result<Candidate> {
        let document = sqlx::query_scalar::<_, JsonValue>(
            r#"SELECT document FROM candidates WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| candidate_not_found(id))?;
        decode_candidate(document)
    }

    async fn find_by_access_key(&self, access_key: &str) -> Result<Option<Candidate>> {
        let document = sqlx::query_scalar::<_, JsonValue>(
            r#"SELECT document FROM candidates WHERE access_key = $1"#,
        )
        .bind(access_key)
        .fetch_optional(&self.pool)
        .await?;
        document.map(decode_candidate).transpose()
    }

    async fn list(&self) -> Result<Vec<Candidate>> {
        let documents = sqlx::query_scalar::<_, JsonValue>(
            r#"SELECT document FROM candidates ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        documents.into_iter().map(decode_candidate).collect()
    }

    async fn save(&self, candidate: &Candidate) -> Result<()> {
        ensure_valid(candidate)?;
        let document = serde_json::to_value(candidate)?;
        sqlx::query(
            r#"
            INSERT INTO candidates (id, access_key, stage, archived, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                stage = EXCLUDED.stage,
                archived = EXCLUDED.archived,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.access_key)
        .bind(candidate.stage.as_str())
        .bind(candidate.archived)
        .bind(document)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM candidates WHERE id = ANY($1) AND archived"#)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list(&self) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, required_skills, min_experience_years, created_at, updated_at
            FROM jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn get(&self, id: Uuid) -> Result<Job> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, required_skills, min_experience_years, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| job_not_found(id))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, required_skills, min_experience_years, created_at, updated_at
            FROM jobs
            WHERE LOWER(title) = LOWER($1)
            "#,
        )
        .bind(title.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, title, description, required_skills, min_experience_years, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(job.min_experience_years)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET title = $2, description = $3, required_skills = $4, min_experience_years = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(job.min_experience_years)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(job_not_found(job.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM jobs WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(job_not_found(id));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRecruiterStore {
    pool: PgPool,
}

impl PgRecruiterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecruiterStore for PgRecruiterStore {
    async fn get(&self, username: &str) -> Result<Option<Recruiter>> {
        let recruiter = sqlx::query_as::<_, Recruiter>(
            r#"SELECT username, password_hash, email, is_super_admin, created_at FROM recruiters WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recruiter)
    }

    async fn list(&self) -> Result<Vec<Recruiter>> {
        let recruiters = sqlx::query_as::<_, Recruiter>(
            r#"SELECT username, password_hash, email, is_super_admin, created_at FROM recruiters ORDER BY username ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(recruiters)
    }

    async fn insert(&self, recruiter: &Recruiter) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO recruiters (username, password_hash, email, is_super_admin, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(&recruiter.username)
        .bind(&recruiter.password_hash)
        .bind(&recruiter.email)
        .bind(recruiter.is_super_admin)
        .bind(recruiter.created_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Validation(format!(
                "Recruiter '{}' already exists",
                recruiter.username
            )));
        }
        Ok(())
    }
}
