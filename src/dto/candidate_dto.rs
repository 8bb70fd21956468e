use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::{
    AptitudeWindow, Candidate, EmailStatus, InterviewSlot, NoticeKind, ScreeningResult, Stage,
};
use crate::models::interview::InterviewAssessment;
use crate::models::question::CategoryBreakdown;
use crate::services::message_gateway::DeliveryOutcome;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateListQuery {
    pub stage: Option<Stage>,
    pub archived: Option<bool>,
    pub owner: Option<String>,
}

impl CandidateListQuery {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.stage.map_or(true, |s| candidate.stage == s)
            && self.archived.map_or(true, |a| candidate.archived == a)
            && self
                .owner
                .as_deref()
                .map_or(true, |o| candidate.owner_recruiter.as_deref() == Some(o))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleAptitudePayload {
    pub start_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInterviewPayload {
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleJoiningPayload {
    pub joining_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectPayload {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReassignOwnerPayload {
    #[validate(length(min = 1))]
    pub username: String,
}

/// An empty `ids` list purges every archived record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurgePayload {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub purged: u64,
}

/// Exam progress as recruiters see it. The quiz itself and its answer key
/// are not exposed; the per-category result is, once graded.
#[derive(Debug, Clone, Serialize)]
pub struct ExamSummary {
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
    pub answered: usize,
    pub total: usize,
    pub by_category: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationSummary {
    pub email_status: EmailStatus,
    pub email_error: Option<String>,
    pub last_notice: Option<NoticeKind>,
    pub notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub stage: Stage,
    pub previous_stage: Option<Stage>,
    pub owner_recruiter: Option<String>,
    pub access_key: String,
    pub screening: ScreeningResult,
    pub duplicate_of: Option<Uuid>,
    pub aptitude_window: Option<AptitudeWindow>,
    pub aptitude_score: Option<i32>,
    pub exam: Option<ExamSummary>,
    pub interview: Option<InterviewSlot>,
    pub assessment: Option<InterviewAssessment>,
    pub points: u32,
    pub documents_uploaded: bool,
    pub joining_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub archived: bool,
    pub notification: NotificationSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateResponse {
    fn from(c: Candidate) -> Self {
        let exam = c.exam.as_ref().map(|session| ExamSummary {
            started_at: session.started_at,
            deadline: session.deadline,
            graded_at: session.graded_at,
            answered: session.answered_count(),
            total: session.quiz.len(),
            by_category: session.by_category.clone(),
        });
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            role: c.role,
            stage: c.stage,
            previous_stage: c.previous_stage,
            owner_recruiter: c.owner_recruiter,
            access_key: c.access_key,
            screening: c.screening,
            duplicate_of: c.duplicate_of,
            aptitude_window: c.aptitude_window,
            aptitude_score: c.aptitude_score,
            exam,
            interview: c.interview,
            assessment: c.assessment,
            points: c.points,
            documents_uploaded: c.documents_uploaded,
            joining_date: c.joining_date,
            rejection_reason: c.rejection_reason,
            archived: c.archived,
            notification: NotificationSummary {
                email_status: c.email_status,
                email_error: c.email_error,
                last_notice: c.last_notice,
                notified_at: c.notified_at,
            },
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const MAX_LEADERBOARD_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub candidate_id: Uuid,
    pub name: String,
    pub role: String,
    pub stage: Stage,
    pub points: u32,
    pub overall_score: i32,
}

impl LeaderboardEntry {
    /// Ranks are 1-based and follow the order given.
    pub fn ranked(candidates: Vec<Candidate>) -> Vec<Self> {
        candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| Self {
                rank: i + 1,
                candidate_id: c.id,
                name: c.name,
                role: c.role,
                stage: c.stage,
                points: c.points,
                overall_score: c.screening.overall_score,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub candidate: CandidateResponse,
    pub notification: Option<DeliveryOutcome>,
}
