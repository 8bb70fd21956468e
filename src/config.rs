use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub public_rps: u32,
    pub cors_origin: Option<String>,
    pub reasoning: ReasoningConfig,
    pub mail: MailConfig,
    pub policy: PipelinePolicy,
    pub admin: Option<AdminBootstrap>,
}

#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Tunable business rules of the pipeline. Services receive this by value so
/// nothing below the HTTP layer reads the global config.
#[derive(Debug, Clone)]
pub struct PipelinePolicy {
    /// Candidates with strictly more experience than this skip the aptitude exam.
    pub experience_threshold_years: i32,
    pub aptitude_pass_percent: i32,
    pub exam_duration_minutes: i64,
    pub interview_soon_minutes: i64,
    pub meeting_base_url: String,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            experience_threshold_years: 2,
            aptitude_pass_percent: 50,
            exam_duration_minutes: 20,
            interview_soon_minutes: 60,
            meeting_base_url: "https://meet.jit.si".to_string(),
        }
    }
}

/// One working day.
pub const MAX_EXAM_DURATION_MINUTES: i64 = 24 * 60;
/// One week.
pub const MAX_INTERVIEW_SOON_MINUTES: i64 = 7 * 24 * 60;

pub const DEFAULT_REASONING_URL: &str = "https://api.openai.com/v1/chat/completions";

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = PipelinePolicy::default();
        let policy = PipelinePolicy {
            experience_threshold_years: get_env_or("EXPERIENCE_THRESHOLD_YEARS", defaults.experience_threshold_years)?,
            aptitude_pass_percent: get_env_or("APTITUDE_PASS_PERCENT", defaults.aptitude_pass_percent)?,
            exam_duration_minutes: get_env_or("EXAM_DURATION_MINUTES", defaults.exam_duration_minutes)?,
            interview_soon_minutes: get_env_or("INTERVIEW_SOON_MINUTES", defaults.interview_soon_minutes)?,
            meeting_base_url: get_env_opt("MEETING_BASE_URL").unwrap_or(defaults.meeting_base_url),
        };
        if !(0..=100).contains(&policy.aptitude_pass_percent) {
            return Err(Error::Config("APTITUDE_PASS_PERCENT must be within 0..=100".to_string()));
        }
        if !(1..=MAX_EXAM_DURATION_MINUTES).contains(&policy.exam_duration_minutes) {
            return Err(Error::Config(format!(
                "EXAM_DURATION_MINUTES must be within 1..={}",
                MAX_EXAM_DURATION_MINUTES
            )));
        }
        if !(0..=MAX_INTERVIEW_SOON_MINUTES).contains(&policy.interview_soon_minutes) {
            return Err(Error::Config(format!(
                "INTERVIEW_SOON_MINUTES must be within 0..={}",
                MAX_INTERVIEW_SOON_MINUTES
            )));
        }
        url::Url::parse(&policy.meeting_base_url)
            .map_err(|e| Error::Config(format!("Invalid value for MEETING_BASE_URL: {}", e)))?;

        let reasoning = ReasoningConfig {
            api_key: get_env_opt("OPENAI_API_KEY"),
            api_url: get_env_opt("REASONING_API_URL").unwrap_or_else(|| DEFAULT_REASONING_URL.to_string()),
            model: get_env_opt("REASONING_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            timeout: Duration::from_secs(get_env_or("REASONING_TIMEOUT_SECS", 60)?),
            max_retries: get_env_or("REASONING_MAX_RETRIES", 3)?,
            retry_base_delay: Duration::from_millis(get_env_or("REASONING_RETRY_BASE_MS", 1000)?),
        };

        let mail = MailConfig {
            api_url: get_env_opt("MAIL_API_URL"),
            api_key: get_env_opt("MAIL_API_KEY"),
            from_address: get_env_opt("MAIL_FROM"),
        };

        let admin = match (get_env_opt("ADMIN_USERNAME"), get_env_opt("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap {
                email: get_env_opt("ADMIN_EMAIL").unwrap_or_else(|| format!("{}@localhost", username)),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            session_ttl_hours: get_env_or("SESSION_TTL_HOURS", 12)?,
            public_rps: get_env_or("PUBLIC_RPS", 20)?,
            cors_origin: get_env_opt("CORS_ORIGIN"),
            reasoning,
            mail,
            policy,
            admin,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
