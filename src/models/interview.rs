use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INTERVIEW_QUESTION_COUNT: usize = 5;

/// Points added once every question of an assessment is answered.
pub const COMPLETION_BONUS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    pub category: String,
    pub intent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvaluation {
    pub score: i32,
    pub feedback: String,
    pub clarity: String,
    pub conciseness: String,
    pub relevance: String,
    #[serde(default)]
    pub suggested_improvement: Option<String>,
}

impl ResponseEvaluation {
    /// Half the score, rounded half up.
    pub fn points(&self) -> u32 {
        (self.score.clamp(0, 100) as u32 + 1) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub response: String,
    pub evaluation: ResponseEvaluation,
    pub answered_at: DateTime<Utc>,
}

/// Generated questions for one interview round and the answers given so far.
/// `answers` is index-aligned with `questions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewAssessment {
    pub round: u8,
    pub generated_at: DateTime<Utc>,
    pub questions: Vec<InterviewQuestion>,
    pub answers: Vec<Option<InterviewAnswer>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewAssessment {
    pub fn new(round: u8, questions: Vec<InterviewQuestion>, now: DateTime<Utc>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            round,
            generated_at: now,
            questions,
            answers,
            completed_at: None,
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}
