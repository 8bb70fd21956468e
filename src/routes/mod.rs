pub mod auth;
pub mod candidates;
pub mod health;
pub mod jobs;
pub mod public;
