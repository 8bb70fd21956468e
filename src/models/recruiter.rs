use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recruiter {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// The acting recruiter, taken from a verified session token and passed
/// explicitly into every pipeline operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterSession {
    pub username: String,
    pub is_super_admin: bool,
}

impl RecruiterSession {
    pub fn may_act_on(&self, owner: Option<&str>) -> bool {
        self.is_super_admin || owner.map_or(true, |o| o == self.username)
    }
}

impl From<&Recruiter> for RecruiterSession {
    fn from(recruiter: &Recruiter) -> Self {
        Self {
            username: recruiter.username.clone(),
            is_super_admin: recruiter.is_super_admin,
        }
    }
}
