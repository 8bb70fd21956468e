#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tower::ServiceExt;

use hiring_pipeline::{
    build_router,
    config::{AdminBootstrap, PipelinePolicy},
    database::memory::{MemoryCandidateStore, MemoryJobStore, MemoryRecruiterStore},
    middleware::auth::TokenIssuer,
    services::{
        message_gateway::{DeliveryOutcome, MessageGateway, OutboundMessage, UnconfiguredGateway},
        reasoning_client::{ReasoningClient, ReasoningError, ReasoningRequest},
        scoring_service::RetryPolicy,
    },
    utils::time::{Clock, ManualClock},
    AppState, Backends,
};

pub const ADMIN_PASSWORD: &str = "admin-password";

/// Reasoning stand-in. The applicant's name is the first resume line and
/// experience is the number in front of "years". Interview answers score 70.
pub struct ScriptedReasoning;

pub fn quiz_json() -> JsonValue {
    let mut questions = Vec::new();
    for category in ["Logical Reasoning", "Quantitative Aptitude", "Verbal Ability", "Domain Knowledge"] {
        for i in 0..5 {
            questions.push(json!({
                "category": category,
                "question": format!("{category} #{i}"),
                "options": ["w", "x", "y", "z"],
                "correct_index": i % 4,
            }));
        }
    }
    json!({ "questions": questions })
}

/// Correct option for question `id` of `quiz_json`.
pub fn correct_option(id: u32) -> u8 {
    (((id - 1) % 5) % 4) as u8
}

#[async_trait]
impl ReasoningClient for ScriptedReasoning {
    async fn complete_json(&self, request: ReasoningRequest) -> Result<JsonValue, ReasoningError> {
        if request.system.contains("full name") {
            let name = request.user.lines().next().unwrap_or_default().trim().to_string();
            return Ok(json!({ "full_name": name }));
        }
        if request.system.contains("aptitude tests") {
            return Ok(quiz_json());
        }
        if request.system.contains("interview questions") {
            let questions: Vec<JsonValue> = (1..=5)
                .map(|i| json!({ "question": format!("Tell us about project {i}"), "category": "behavioural", "intent": "ownership" }))
                .collect();
            return Ok(json!({ "questions": questions }));
        }
        if request.system.contains("evaluate interview answers") {
            return Ok(json!({
                "score": 70,
                "feedback": "Structured answer",
                "clarity": "clear",
                "conciseness": "a little long",
                "relevance": "relevant",
                "suggested_improvement": "Quantify the impact"
            }));
        }
        let words: Vec<&str> = request.user.split_whitespace().collect();
        let years = words
            .windows(2)
            .find(|w| w[1].starts_with("year"))
            .and_then(|w| w[0].parse::<i64>().ok())
            .unwrap_or(0);
        Ok(json!({
            "overall_score": 82,
            "technical_match": 78,
            "years_experience": years,
            "summary": "Scripted screening"
        }))
    }
}

/// Accepts every message and keeps a copy.
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingGateway {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send(&self, message: OutboundMessage) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(message);
        DeliveryOutcome::delivered("accepted (202)")
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<RecordingGateway>,
    pub admin_token: String,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

pub async fn spawn_app() -> TestApp {
    spawn_with(true).await
}

/// `mail_configured = false` wires the unconfigured gateway.
pub async fn spawn_with(mail_configured: bool) -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    let gateway = Arc::new(RecordingGateway::default());
    let backends = Backends {
        candidates: Arc::new(MemoryCandidateStore::new()),
        jobs: Arc::new(MemoryJobStore::new()),
        recruiters: Arc::new(MemoryRecruiterStore::new()),
        reasoning: Arc::new(ScriptedReasoning),
        gateway: if mail_configured {
            gateway.clone() as Arc<dyn MessageGateway>
        } else {
            Arc::new(UnconfiguredGateway)
        },
        clock: clock.clone(),
    };
    let state = AppState::new(
        backends,
        TokenIssuer::new("integration-secret", 12),
        PipelinePolicy::default(),
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            call_timeout: Duration::from_secs(5),
        },
    );
    state
        .recruiters
        .bootstrap_admin(&AdminBootstrap {
            username: "admin".into(),
            password: ADMIN_PASSWORD.into(),
            email: "admin@example.com".into(),
        })
        .await
        .expect("bootstrap admin");

    let router = build_router(state, 1000, None);
    let mut app = TestApp {
        router,
        clock,
        gateway,
        admin_token: String::new(),
    };
    app.admin_token = app.login("admin", ADMIN_PASSWORD).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/jobs",
            Some(app.admin_token.as_str()),
            Some(json!({
                "title": "Backend Engineer",
                "description": "Services in Rust",
                "required_skills": ["Rust", "PostgreSQL"],
                "min_experience_years": 3
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a plain recruiter and returns its session token.
    pub async fn recruiter(&self, username: &str) -> String {
        let password = format!("{username}-password");
        let (status, body) = self
            .send(
                Method::POST,
                "/api/recruiters",
                Some(self.admin_token.as_str()),
                Some(json!({
                    "username": username,
                    "password": password,
                    "email": format!("{username}@example.com")
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create recruiter failed: {body}");
        self.login(username, &password).await
    }

    /// Applies as "Ada Lovelace" with the given experience. Returns
    /// (candidate id, access key).
    pub async fn apply(&self, years: u32) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/public/applications",
                None,
                Some(json!({
                    "name": "Ada Lovelace",
                    "email": "ada@example.com",
                    "role": "Backend Engineer",
                    "resume_text": format!("Ada Lovelace\nEngineer with {years} years building Rust services on PostgreSQL.")
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "apply failed: {body}");
        (
            body["candidate_id"].as_str().unwrap().to_string(),
            body["access_key"].as_str().unwrap().to_string(),
        )
    }

    pub fn at(&self, offset: chrono::Duration) -> String {
        (self.clock.now() + offset).to_rfc3339()
    }
}
