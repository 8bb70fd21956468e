//! Time-gated aptitude exam. Every function takes `now` explicitly; there is
//! no timer task, so unlock and expiry are decided whenever a record is read
//! or written.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, ExamSession, Stage};
use crate::models::question::{Answer, QuizQuestion, OPTIONS_PER_QUESTION};
use crate::services::grading_service::GradingService;
use crate::utils::time::seconds_until;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExamStatus {
    NotScheduled,
    Locked {
        starts_at: DateTime<Utc>,
        starts_in_seconds: i64,
    },
    Ready {
        duration_minutes: i64,
    },
    InProgress {
        deadline: DateTime<Utc>,
        remaining_seconds: i64,
        answered: usize,
        total: usize,
    },
    Completed {
        score: i32,
    },
}

/// Outcome of a grading request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grading {
    Graded(i32),
    AlreadyGraded(i32),
}

impl Grading {
    pub fn score(self) -> i32 {
        match self {
            Grading::Graded(score) | Grading::AlreadyGraded(score) => score,
        }
    }
}

pub struct ExamController;

impl ExamController {
    pub fn status(candidate: &Candidate, now: DateTime<Utc>) -> ExamStatus {
        if let Some(score) = candidate.aptitude_score {
            return ExamStatus::Completed { score };
        }
        let Some(window) = candidate.aptitude_window.filter(|_| candidate.stage == Stage::AptitudeScheduled) else {
            return ExamStatus::NotScheduled;
        };
        match &candidate.exam {
            Some(session) => ExamStatus::InProgress {
                deadline: session.deadline,
                remaining_seconds: seconds_until(session.deadline, now),
                answered: session.answered_count(),
                total: session.quiz.len(),
            },
            None if now < window.scheduled_start => ExamStatus::Locked {
                starts_at: window.scheduled_start,
                starts_in_seconds: seconds_until(window.scheduled_start, now),
            },
            None => ExamStatus::Ready {
                duration_minutes: window.duration_minutes,
            },
        }
    }

    /// Whether a running session ran out of time without being graded.
    pub fn is_expired(candidate: &Candidate, now: DateTime<Utc>) -> bool {
        candidate.stage == Stage::AptitudeScheduled
            && candidate
                .exam
                .as_ref()
                .is_some_and(|s| !s.is_graded() && now >= s.deadline)
    }

    /// Checks that a new session may start. Returns `false` when one is
    /// already running, in which case no quiz should be generated.
    pub fn ensure_startable(candidate: &Candidate, now: DateTime<Utc>) -> Result<bool> {
        if candidate.stage != Stage::AptitudeScheduled {
            return Err(Error::PreconditionFailed(format!(
                "No aptitude exam is open in stage {}",
                candidate.stage
            )));
        }
        let window = candidate.aptitude_window.ok_or_else(|| {
            Error::PreconditionFailed("Aptitude exam has not been scheduled".into())
        })?;
        if now < window.scheduled_start {
            return Err(Error::PreconditionFailed(format!(
                "Aptitude exam unlocks in {} seconds",
                seconds_until(window.scheduled_start, now)
            )));
        }
        Ok(candidate.exam.is_none())
    }

    /// Freezes `quiz` into a new session; the timer runs from `now`.
    pub fn start(candidate: &mut Candidate, quiz: Vec<QuizQuestion>, now: DateTime<Utc>) -> Result<()> {
        if !Self::ensure_startable(candidate, now)? {
            return Ok(());
        }
        let duration = candidate
            .aptitude_window
            .map(|w| w.duration())
            .ok_or_else(|| Error::PreconditionFailed("Aptitude exam has not been scheduled".into()))?;
        let answers = vec![Answer::Unanswered; quiz.len()];
        candidate.exam = Some(ExamSession {
            started_at: now,
            deadline: now + duration,
            quiz,
            answers,
            graded_at: None,
            by_category: Vec::new(),
        });
        candidate.updated_at = now;
        Ok(())
    }

    pub fn record_answer(
        candidate: &mut Candidate,
        question_id: u32,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let session = candidate
            .exam
            .as_mut()
            .filter(|s| !s.is_graded())
            .ok_or_else(|| Error::PreconditionFailed("No exam session is in progress".into()))?;
        if now >= session.deadline {
            return Err(Error::PreconditionFailed("Exam time is over".into()));
        }
        if let Answer::Selected(option) = answer {
            if option as usize >= OPTIONS_PER_QUESTION {
                return Err(Error::Validation(format!("Option {} does not exist", option)));
            }
        }
        let idx = session
            .quiz
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| Error::Validation(format!("Question {} is not part of this exam", question_id)))?;
        session.answers[idx] = answer;
        candidate.updated_at = now;
        Ok(())
    }

    /// Grades the session once and moves the candidate to
    /// `AptitudeCompleted`. Later calls return the stored score.
    pub fn grade(candidate: &mut Candidate, now: DateTime<Utc>) -> Result<Grading> {
        if let Some(score) = candidate.aptitude_score {
            return Ok(Grading::AlreadyGraded(score));
        }
        if candidate.stage != Stage::AptitudeScheduled {
            return Err(Error::PreconditionFailed(format!(
                "No aptitude exam is open in stage {}",
                candidate.stage
            )));
        }
        let session = candidate
            .exam
            .as_mut()
            .ok_or_else(|| Error::PreconditionFailed("Exam has not been started".into()))?;

        let report = GradingService::grade(&session.quiz, &session.answers);
        session.graded_at = Some(now);
        session.by_category = report.by_category;
        candidate.aptitude_score = Some(report.score_percent);
        candidate.stage = Stage::AptitudeCompleted;
        candidate.updated_at = now;
        Ok(Grading::Graded(report.score_percent))
    }
}
