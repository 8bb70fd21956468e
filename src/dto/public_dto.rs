use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::{Candidate, ExamSession, Stage};
use crate::models::interview::InterviewAssessment;
use crate::models::question::{Answer, QuestionCategory};
use crate::services::exam_service::{ExamController, ExamStatus};
use crate::services::message_gateway::DeliveryOutcome;
use crate::utils::time::within;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplicationPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub role: String,
    #[validate(length(min = 20, max = 100000))]
    pub resume_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResponse {
    pub candidate_id: Uuid,
    pub access_key: String,
    pub stage: Stage,
    pub notification: DeliveryOutcome,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AccessKeyLogin {
    #[validate(length(min = 1, max = 32))]
    pub access_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewInfo {
    pub round: u8,
    pub scheduled_at: DateTime<Utc>,
    pub meeting_link: String,
}

/// What a candidate sees in the self-service portal. Never carries the
/// rejection reason, screening scores or the owning recruiter.
#[derive(Debug, Clone, Serialize)]
pub struct PortalView {
    pub name: String,
    pub role: String,
    pub stage: Stage,
    pub interview: Option<InterviewInfo>,
    pub interview_soon: bool,
    pub exam: ExamStatus,
    pub documents_uploaded: bool,
    pub joining_date: Option<NaiveDate>,
}

impl PortalView {
    pub fn build(candidate: &Candidate, now: DateTime<Utc>, soon_window: chrono::Duration) -> Self {
        let interview = candidate
            .interview
            .as_ref()
            .filter(|_| candidate.stage == Stage::InterviewScheduled)
            .map(|slot| InterviewInfo {
                round: slot.round,
                scheduled_at: slot.scheduled_at,
                meeting_link: slot.meeting_link.clone(),
            });
        let interview_soon = interview
            .as_ref()
            .is_some_and(|i| within(i.scheduled_at, now, soon_window));
        Self {
            name: candidate.name.clone(),
            role: candidate.role.clone(),
            stage: candidate.stage,
            interview,
            interview_soon,
            exam: ExamController::status(candidate, now),
            documents_uploaded: candidate.documents_uploaded,
            joining_date: candidate.joining_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: u32,
    pub category: QuestionCategory,
    pub text: String,
    pub options: Vec<String>,
    pub answer: Answer,
}

/// The running exam without its answer key.
#[derive(Debug, Clone, Serialize)]
pub struct ExamView {
    pub status: ExamStatus,
    pub questions: Vec<QuestionView>,
}

impl ExamView {
    pub fn build(candidate: &Candidate, now: DateTime<Utc>) -> Self {
        let status = ExamController::status(candidate, now);
        let questions = match (&status, &candidate.exam) {
            (ExamStatus::InProgress { .. }, Some(session)) => Self::questions(session),
            _ => Vec::new(),
        };
        Self { status, questions }
    }

    fn questions(session: &ExamSession) -> Vec<QuestionView> {
        session
            .quiz
            .iter()
            .zip(session.answers.iter())
            .map(|(q, a)| QuestionView {
                id: q.id,
                category: q.category,
                text: q.text.clone(),
                options: q.options.clone(),
                answer: *a,
            })
            .collect()
    }
}

/// `option: null` clears a previous answer.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveAnswerPayload {
    pub question_id: u32,
    pub option: Option<u8>,
}

impl SaveAnswerPayload {
    pub fn answer(&self) -> Answer {
        self.option.map_or(Answer::Unanswered, Answer::Selected)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub score: i32,
    pub passed: bool,
    pub already_submitted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentQuestionView {
    pub index: usize,
    pub question: String,
    pub category: String,
    pub answered: bool,
    pub feedback: Option<String>,
    pub suggested_improvement: Option<String>,
}

/// Interview assessment as the candidate sees it: questions and written
/// feedback. Numeric scores stay with the recruiters.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub round: u8,
    pub questions: Vec<AssessmentQuestionView>,
    pub answered: usize,
    pub completed: bool,
    pub points: u32,
}

impl AssessmentView {
    pub fn build(assessment: &InterviewAssessment, points: u32) -> Self {
        let questions = assessment
            .questions
            .iter()
            .zip(assessment.answers.iter())
            .enumerate()
            .map(|(index, (q, a))| AssessmentQuestionView {
                index,
                question: q.question.clone(),
                category: q.category.clone(),
                answered: a.is_some(),
                feedback: a.as_ref().map(|a| a.evaluation.feedback.clone()),
                suggested_improvement: a.as_ref().and_then(|a| a.evaluation.suggested_improvement.clone()),
            })
            .collect();
        Self {
            round: assessment.round,
            questions,
            answered: assessment.answered_count(),
            completed: assessment.is_complete(),
            points,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerInterviewPayload {
    pub question_index: usize,
    #[validate(length(min = 1, max = 5000))]
    pub response: String,
}
