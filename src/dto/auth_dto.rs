use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub is_super_admin: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecruiterPayload {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub is_super_admin: bool,
}
