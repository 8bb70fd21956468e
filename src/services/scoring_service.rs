use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ReasoningConfig;
use crate::error::{Error, Result};
use crate::models::candidate::ScreeningResult;
use crate::models::interview::{InterviewQuestion, ResponseEvaluation, INTERVIEW_QUESTION_COUNT};
use crate::models::job::Job;
use crate::models::question::{
    QuestionCategory, QuizQuestion, OPTIONS_PER_QUESTION, QUESTIONS_PER_CATEGORY,
};
use crate::services::reasoning_client::{ReasoningClient, ReasoningError, ReasoningRequest};
use crate::utils::{crypto, names};

/// Ceiling applied to the overall score when a resume shows less experience
/// than the job asks for.
pub const UNDER_EXPERIENCED_CEILING: i32 = 39;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    /// Linear backoff: the n-th retry waits `base_delay * n`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

impl From<&ReasoningConfig> for RetryPolicy {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            call_timeout: config.timeout,
        }
    }
}

const SCREENING_PROMPT: &str = r#"You are a deterministic and objective technical recruiter.
Analyse the resume against the job requirements strictly on the provided text.
Identical resumes for the same job must yield identical scores.
Return a JSON object:
{ "overall_score": <integer 0-100>, "technical_match": <integer 0-100>,
  "years_experience": <integer, total relevant professional years>,
  "summary": "<two or three sentences>" }"#;

const IDENTITY_PROMPT: &str = r#"Extract the full name of the person this resume belongs to.
Return a JSON object: { "full_name": "<name as written in the resume, or empty if none>" }"#;

const QUIZ_PROMPT: &str = r#"You write aptitude tests for job applicants.
Produce exactly 20 multiple-choice questions: 5 logical reasoning, 5 quantitative aptitude,
5 verbal ability and 5 domain knowledge for the given role.
Every question has exactly 4 options and one correct option. Vary the position of the correct option.
Return a JSON object:
{ "questions": [ { "category": "logical reasoning", "question": "...",
                   "options": ["...", "...", "...", "..."], "correct_index": 0 } ] }"#;

const INTERVIEW_QUESTIONS_PROMPT: &str = r#"You are an experienced interviewer.
Write exactly 5 relevant interview questions for the candidate and role given.
Return a JSON object:
{ "questions": [ { "question": "...", "category": "<e.g. technical, behavioural>",
                   "intent": "<what the question is meant to reveal>" } ] }"#;

const EVALUATION_PROMPT: &str = r#"You evaluate interview answers objectively.
Score the response to the question out of 100.
Return a JSON object:
{ "score": <integer 0-100>, "feedback": "...", "clarity": "...", "conciseness": "...",
  "relevance": "...", "suggested_improvement": "<optional>" }"#;

/// Screenings kept in memory. Older entries are evicted first.
const SCREENING_CACHE_CAPACITY: usize = 512;

/// Recent screening results keyed by the digest of job and resume.
struct ScreeningCache {
    capacity: usize,
    entries: HashMap<String, ScreeningResult>,
    order: VecDeque<String>,
}

impl ScreeningCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<ScreeningResult> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, result: ScreeningResult) {
        if self.entries.insert(key.clone(), result).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resume screening, identity extraction, quiz generation and interview
/// assessment on top of the reasoning service.
#[derive(Clone)]
pub struct ScoringService {
    client: Arc<dyn ReasoningClient>,
    retry: RetryPolicy,
    screenings: Arc<Mutex<ScreeningCache>>,
}

impl ScoringService {
    pub fn new(client: Arc<dyn ReasoningClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            screenings: Arc::new(Mutex::new(ScreeningCache::new(SCREENING_CACHE_CAPACITY))),
        }
    }

    async fn call(&self, operation: &'static str, request: ReasoningRequest) -> Result<JsonValue> {
        let mut retries = 0u32;
        loop {
            let outcome = match tokio::time::timeout(
                self.retry.call_timeout,
                self.client.complete_json(request.clone()),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ReasoningError::Timeout),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    warn!(operation, retry = retries, delay_ms = delay.as_millis() as u64, error = %err, "reasoning call failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(operation, retries, error = %err, "reasoning call failed");
                    return Err(err.into());
                }
            }
        }
    }

    pub async fn screen_resume(&self, resume_text: &str, job: &Job) -> Result<ScreeningResult> {
        let skills = job.required_skills.join(", ");
        let min_years = job.min_experience_years.to_string();
        let title = job.title.trim().to_lowercase();
        let digest = crypto::digest_parts(&[
            &title,
            job.description.trim(),
            &skills,
            &min_years,
            resume_text.trim(),
        ]);
        let key = hex::encode(digest);

        if let Some(cached) = self.screenings.lock().await.get(&key) {
            return Ok(cached);
        }

        let user = serde_json::json!({
            "job": {
                "title": job.title,
                "description": job.description,
                "required_skills": job.required_skills,
                "min_experience_years": job.min_experience_years,
            },
            "resume": resume_text.trim(),
        });
        let request = ReasoningRequest::deterministic(
            SCREENING_PROMPT,
            user.to_string(),
            crypto::seed_from_digest(&digest),
        );
        let raw = self.call("screen_resume", request).await?;
        let result = apply_experience_policy(parse_screening(&raw)?, job.min_experience_years);

        info!(
            job = %job.title,
            overall = result.overall_score,
            years = result.years_experience,
            "resume screened"
        );
        self.screenings.lock().await.insert(key, result.clone());
        Ok(result)
    }

    /// Fails with `IdentityMismatch` unless the name on the resume plausibly
    /// matches `entered_name`.
    pub async fn verify_identity(&self, entered_name: &str, resume_text: &str) -> Result<()> {
        let digest = crypto::digest_parts(&["identity", resume_text.trim()]);
        let request = ReasoningRequest::deterministic(
            IDENTITY_PROMPT,
            resume_text.trim().to_string(),
            crypto::seed_from_digest(&digest),
        );
        let raw = self.call("verify_identity", request).await?;
        let extracted = raw
            .get("full_name")
            .or_else(|| raw.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim();

        if extracted.is_empty() {
            return Err(Error::IdentityMismatch(
                "No applicant name could be found in the resume".into(),
            ));
        }
        if !names::names_match(entered_name, extracted) {
            return Err(Error::IdentityMismatch(format!(
                "'{}' does not match the name on the resume",
                entered_name.trim()
            )));
        }
        Ok(())
    }

    pub async fn generate_quiz(&self, role: &str) -> Result<Vec<QuizQuestion>> {
        let request = ReasoningRequest {
            system: QUIZ_PROMPT.to_string(),
            user: serde_json::json!({ "role": role.trim() }).to_string(),
            seed: None,
            temperature: 0.7,
        };
        let raw = self.call("generate_quiz", request).await?;
        normalize_quiz(&raw)
    }

    pub async fn generate_interview_questions(&self, name: &str, role: &str) -> Result<Vec<InterviewQuestion>> {
        let digest = crypto::digest_parts(&["interview", name.trim(), role.trim()]);
        let user = serde_json::json!({ "candidate": name.trim(), "role": role.trim() });
        let request = ReasoningRequest::deterministic(
            INTERVIEW_QUESTIONS_PROMPT,
            user.to_string(),
            crypto::seed_from_digest(&digest),
        );
        let raw = self.call("generate_interview_questions", request).await?;
        parse_interview_questions(&raw)
    }

    pub async fn evaluate_response(&self, question: &str, response: &str) -> Result<ResponseEvaluation> {
        let digest = crypto::digest_parts(&["evaluation", question.trim(), response.trim()]);
        let user = serde_json::json!({ "question": question.trim(), "response": response.trim() });
        let request = ReasoningRequest::deterministic(
            EVALUATION_PROMPT,
            user.to_string(),
            crypto::seed_from_digest(&digest),
        );
        let raw = self.call("evaluate_response", request).await?;
        parse_evaluation(&raw)
    }
}

fn str_field(value: &JsonValue, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Keeps the first five questions with non-empty text.
fn parse_interview_questions(raw: &JsonValue) -> Result<Vec<InterviewQuestion>> {
    let items = raw
        .get("questions")
        .and_then(|q| q.as_array())
        .or_else(|| raw.as_array())
        .ok_or_else(|| Error::ExternalService("interview response has no questions array".into()))?;

    let questions: Vec<InterviewQuestion> = items
        .iter()
        .filter_map(|item| {
            let question = str_field(item, &["question", "text"]);
            (!question.is_empty()).then(|| InterviewQuestion {
                question,
                category: str_field(item, &["category"]),
                intent: str_field(item, &["intent"]),
            })
        })
        .take(INTERVIEW_QUESTION_COUNT)
        .collect();

    if questions.len() < INTERVIEW_QUESTION_COUNT {
        return Err(Error::ExternalService(format!(
            "interview generation returned {} usable questions, {} required",
            questions.len(),
            INTERVIEW_QUESTION_COUNT
        )));
    }
    Ok(questions)
}

fn parse_evaluation(raw: &JsonValue) -> Result<ResponseEvaluation> {
    let score = int_field(raw, &["score"])
        .ok_or_else(|| Error::ExternalService("evaluation response is missing score".into()))?;
    let improvement = str_field(raw, &["suggested_improvement", "suggestedImprovement"]);
    Ok(ResponseEvaluation {
        score: score.clamp(0, 100) as i32,
        feedback: str_field(raw, &["feedback"]),
        clarity: str_field(raw, &["clarity"]),
        conciseness: str_field(raw, &["conciseness"]),
        relevance: str_field(raw, &["relevance"]),
        suggested_improvement: (!improvement.is_empty()).then_some(improvement),
    })
}

fn int_field(value: &JsonValue, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| {
        let field = value.get(*key)?;
        field
            .as_i64()
            .or_else(|| field.as_f64().map(|f| f.round() as i64))
            .or_else(|| field.as_str().and_then(|s| s.trim().parse::<f64>().ok()).map(|f| f.round() as i64))
    })
}

fn parse_screening(raw: &JsonValue) -> Result<ScreeningResult> {
    let malformed = |what: &str| Error::ExternalService(format!("screening response is missing {}", what));

    let overall = int_field(raw, &["overall_score", "overallScore"]).ok_or_else(|| malformed("overall_score"))?;
    let technical = int_field(raw, &["technical_match", "technicalScore", "technical_score"])
        .ok_or_else(|| malformed("technical_match"))?;
    let years = int_field(raw, &["years_experience", "yearsExperience", "experience_years"])
        .ok_or_else(|| malformed("years_experience"))?;
    let summary = raw
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(ScreeningResult {
        overall_score: overall.clamp(0, 100) as i32,
        technical_match: technical.clamp(0, 100) as i32,
        years_experience: years.clamp(0, 80) as i32,
        summary,
    })
}

fn apply_experience_policy(mut result: ScreeningResult, min_years: i32) -> ScreeningResult {
    if result.years_experience < min_years {
        result.overall_score = result.overall_score.min(UNDER_EXPERIENCED_CEILING);
    }
    result
}

fn coerce_question(value: &JsonValue) -> Option<(QuestionCategory, String, Vec<String>, u8)> {
    let category = value
        .get("category")
        .and_then(|c| c.as_str())
        .and_then(QuestionCategory::parse_loose)?;
    let text = value
        .get("question")
        .or_else(|| value.get("text"))
        .and_then(|q| q.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())?
        .to_string();
    let options: Vec<String> = value
        .get("options")?
        .as_array()?
        .iter()
        .filter_map(|o| o.as_str().map(|s| s.trim().to_string()))
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() != OPTIONS_PER_QUESTION {
        return None;
    }
    let correct = int_field(value, &["correct_index", "correct_answer", "answer_index"])?;
    if !(0..OPTIONS_PER_QUESTION as i64).contains(&correct) {
        return None;
    }
    Some((category, text, options, correct as u8))
}

/// Buckets the generated questions by category and keeps five of each, in
/// category order. Fewer than five usable questions in any category fails.
pub fn normalize_quiz(raw: &JsonValue) -> Result<Vec<QuizQuestion>> {
    let items = raw
        .get("questions")
        .and_then(|q| q.as_array())
        .or_else(|| raw.as_array())
        .ok_or_else(|| Error::ExternalService("quiz response has no questions array".into()))?;

    let mut buckets: HashMap<QuestionCategory, Vec<(String, Vec<String>, u8)>> = HashMap::new();
    for item in items {
        if let Some((category, text, options, correct)) = coerce_question(item) {
            buckets.entry(category).or_default().push((text, options, correct));
        }
    }

    let mut quiz = Vec::with_capacity(QUESTIONS_PER_CATEGORY * QuestionCategory::ALL.len());
    for category in QuestionCategory::ALL {
        let usable = buckets.remove(&category).unwrap_or_default();
        if usable.len() < QUESTIONS_PER_CATEGORY {
            return Err(Error::ExternalService(format!(
                "quiz generation returned {} usable {} questions, {} required",
                usable.len(),
                category.label(),
                QUESTIONS_PER_CATEGORY
            )));
        }
        for (text, options, correct_index) in usable.into_iter().take(QUESTIONS_PER_CATEGORY) {
            quiz.push(QuizQuestion {
                id: quiz.len() as u32 + 1,
                category,
                text,
                options,
                correct_index,
            });
        }
    }
    Ok(quiz)
}
