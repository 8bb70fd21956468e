use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AdminBootstrap;
use crate::database::RecruiterStore;
use crate::dto::auth_dto::{CreateRecruiterPayload, LoginPayload, LoginResponse};
use crate::error::{Error, Result};
use crate::middleware::auth::TokenIssuer;
use crate::models::recruiter::{Recruiter, RecruiterSession};
use crate::utils::crypto::{hash_password, verify_against_decoy, verify_password};

#[derive(Clone)]
pub struct RecruiterService {
    store: Arc<dyn RecruiterStore>,
    tokens: TokenIssuer,
}

impl RecruiterService {
    pub fn new(store: Arc<dyn RecruiterStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<LoginResponse> {
        let username = payload.username.trim();
        let Some(recruiter) = self.store.get(username).await? else {
            verify_against_decoy(&payload.password);
            warn!(username, "login for unknown recruiter");
            return Err(Error::InvalidCredentials);
        };
        if !verify_password(&payload.password, &recruiter.password_hash) {
            warn!(username, "login with wrong password");
            return Err(Error::InvalidCredentials);
        }
        let (token, expires_at) = self.tokens.issue(&recruiter, Utc::now())?;
        info!(username, "recruiter signed in");
        Ok(LoginResponse {
            token,
            username: recruiter.username,
            is_super_admin: recruiter.is_super_admin,
            expires_at,
        })
    }

    pub async fn create(&self, actor: &RecruiterSession, payload: CreateRecruiterPayload) -> Result<Recruiter> {
        if !actor.is_super_admin {
            return Err(Error::Forbidden("Only a super-admin can add recruiters".into()));
        }
        let recruiter = Recruiter {
            username: payload.username.trim().to_string(),
            password_hash: hash_password(&payload.password)?,
            email: payload.email.trim().to_string(),
            is_super_admin: payload.is_super_admin,
            created_at: Utc::now(),
        };
        self.store.insert(&recruiter).await?;
        info!(username = %recruiter.username, created_by = %actor.username, "recruiter added");
        Ok(recruiter)
    }

    pub async fn list(&self) -> Result<Vec<Recruiter>> {
        self.store.list().await
    }

    /// Creates the configured super-admin when the registry does not have it.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<()> {
        if self.store.get(&admin.username).await?.is_some() {
            return Ok(());
        }
        let recruiter = Recruiter {
            username: admin.username.clone(),
            password_hash: hash_password(&admin.password)?,
            email: admin.email.clone(),
            is_super_admin: true,
            created_at: Utc::now(),
        };
        self.store.insert(&recruiter).await?;
        info!(username = %admin.username, "bootstrapped super-admin");
        Ok(())
    }
}
