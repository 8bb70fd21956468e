use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::interview::InterviewAssessment;
use crate::models::question::{Answer, CategoryBreakdown, QuizQuestion};

pub const MAX_INTERVIEW_ROUNDS: u8 = 2;

/// Position of a candidate in the hiring pipeline.
///
/// Forward edges:
/// `Screening -> {AptitudeScheduled, InterviewScheduled}`,
/// `AptitudeScheduled -> AptitudeCompleted -> InterviewScheduled`,
/// `InterviewScheduled -> InterviewScheduled (round 2) | Selected`,
/// `Selected -> JoiningScheduled`.
/// `Rejected` and `Archived` are reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Screening,
    AptitudeScheduled,
    AptitudeCompleted,
    InterviewScheduled,
    Selected,
    JoiningScheduled,
    Rejected,
    Archived,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Screening,
        Stage::AptitudeScheduled,
        Stage::AptitudeCompleted,
        Stage::InterviewScheduled,
        Stage::Selected,
        Stage::JoiningScheduled,
        Stage::Rejected,
        Stage::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Screening => "screening",
            Stage::AptitudeScheduled => "aptitude_scheduled",
            Stage::AptitudeCompleted => "aptitude_completed",
            Stage::InterviewScheduled => "interview_scheduled",
            Stage::Selected => "selected",
            Stage::JoiningScheduled => "joining_scheduled",
            Stage::Rejected => "rejected",
            Stage::Archived => "archived",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Rejected | Stage::Archived)
    }

    fn successors(self) -> &'static [Stage] {
        match self {
            Stage::Screening => &[Stage::AptitudeScheduled, Stage::InterviewScheduled],
            Stage::AptitudeScheduled => &[Stage::AptitudeCompleted],
            Stage::AptitudeCompleted => &[Stage::InterviewScheduled],
            Stage::InterviewScheduled => &[Stage::InterviewScheduled, Stage::Selected],
            Stage::Selected => &[Stage::JoiningScheduled],
            Stage::JoiningScheduled | Stage::Rejected | Stage::Archived => &[],
        }
    }

    /// Whether `next` is a legal forward move. Restore is not a forward move
    /// and is validated separately.
    pub fn can_advance_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.is_terminal() || self.successors().contains(&next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown stage '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub overall_score: i32,
    pub technical_match: i32,
    pub years_experience: i32,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSlot {
    pub round: u8,
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptitudeWindow {
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl AptitudeWindow {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }
}

/// Quiz snapshot and answers of a started exam. The quiz is frozen when the
/// session starts and kept for audit after grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSession {
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub quiz: Vec<QuizQuestion>,
    pub answers: Vec<Answer>,
    pub graded_at: Option<DateTime<Utc>>,
    /// Filled in at grading.
    #[serde(default)]
    pub by_category: Vec<CategoryBreakdown>,
}

impl ExamSession {
    pub fn is_graded(&self) -> bool {
        self.graded_at.is_some()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    #[default]
    NotSent,
    Delivered,
    NotDelivered,
}

/// Message template selected for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NoticeKind {
    ApplicationReceived,
    ExamScheduled,
    AptitudeResult { passed: bool },
    InterviewInvite { round: u8 },
    DocumentRequest,
    JoiningLetter,
    Rejection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub stage: Stage,
    #[serde(default)]
    pub previous_stage: Option<Stage>,
    #[serde(default)]
    pub owner_recruiter: Option<String>,
    pub access_key: String,
    pub screening: ScreeningResult,
    pub resume_fingerprint: String,
    #[serde(default)]
    pub duplicate_of: Option<Uuid>,
    #[serde(default)]
    pub aptitude_window: Option<AptitudeWindow>,
    #[serde(default)]
    pub aptitude_score: Option<i32>,
    #[serde(default)]
    pub exam: Option<ExamSession>,
    #[serde(default)]
    pub interview: Option<InterviewSlot>,
    #[serde(default)]
    pub documents_uploaded: bool,
    #[serde(default)]
    pub joining_date: Option<NaiveDate>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub email_status: EmailStatus,
    #[serde(default)]
    pub email_error: Option<String>,
    #[serde(default)]
    pub last_notice: Option<NoticeKind>,
    #[serde(default)]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assessment: Option<InterviewAssessment>,
    /// Leaderboard points earned in interview assessments.
    #[serde(default)]
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn interview_round(&self) -> Option<u8> {
        self.interview.as_ref().map(|slot| slot.round)
    }

    /// Structural invariants of a stored document. Checked whenever a record
    /// crosses the store boundary.
    pub fn check_document(&self) -> Result<(), String> {
        let in_range = |v: i32| (0..=100).contains(&v);
        if !in_range(self.screening.overall_score) || !in_range(self.screening.technical_match) {
            return Err("screening scores must be within 0..=100".into());
        }
        if self.screening.years_experience < 0 {
            return Err("years of experience cannot be negative".into());
        }
        if let Some(score) = self.aptitude_score {
            if !in_range(score) {
                return Err("aptitude score must be within 0..=100".into());
            }
        }
        if let Some(slot) = &self.interview {
            if slot.round == 0 || slot.round > MAX_INTERVIEW_ROUNDS {
                return Err(format!("interview round {} is out of range", slot.round));
            }
        }
        if let Some(exam) = &self.exam {
            if exam.answers.len() != exam.quiz.len() {
                return Err("exam answers do not line up with the quiz".into());
            }
        }
        if let Some(assessment) = &self.assessment {
            if assessment.answers.len() != assessment.questions.len() {
                return Err("assessment answers do not line up with its questions".into());
            }
        }
        if self.stage.is_terminal() != self.archived {
            return Err(format!("archived flag disagrees with stage {}", self.stage));
        }
        match self.stage {
            Stage::AptitudeScheduled if self.aptitude_window.is_none() => {
                Err("aptitude stage without a scheduled window".into())
            }
            Stage::AptitudeCompleted if self.aptitude_score.is_none() => {
                Err("aptitude completed without a score".into())
            }
            Stage::InterviewScheduled if self.interview.is_none() => {
                Err("interview stage without a slot".into())
            }
            Stage::JoiningScheduled if self.joining_date.is_none() => {
                Err("joining stage without a date".into())
            }
            Stage::Rejected | Stage::Archived if self.previous_stage.is_none() => {
                Err("terminal stage without a stage to restore".into())
            }
            _ => Ok(()),
        }
    }
}
