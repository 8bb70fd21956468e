use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::recruiter::{Recruiter, RecruiterSession};
use crate::AppState;

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_RECRUITER: &str = "recruiter";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl From<Claims> for RecruiterSession {
    fn from(claims: Claims) -> Self {
        let is_super_admin = claims
            .role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(ROLE_SUPER_ADMIN));
        Self {
            username: claims.sub,
            is_super_admin,
        }
    }
}

/// HS256 session tokens for recruiters.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, recruiter: &Recruiter, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>)> {
        let expires_at = now + self.ttl;
        let role = if recruiter.is_super_admin {
            ROLE_SUPER_ADMIN
        } else {
            ROLE_RECRUITER
        };
        let claims = Claims {
            sub: recruiter.username.clone(),
            exp: expires_at.timestamp().max(0) as usize,
            role: Some(role.to_string()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("Failed to sign session token: {}", e)))?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<RecruiterSession> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims.into())
        .map_err(|_| Error::Unauthorized("invalid_token".into()))
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code, "code": "unauthorized" }))).into_response()
}

/// Verifies the bearer token and stores the `RecruiterSession` in request
/// extensions for handlers to extract.
pub async fn require_recruiter(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    match state.tokens.verify(token.trim()) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(_) => unauthorized("invalid_token"),
    }
}
