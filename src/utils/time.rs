use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Source of "now" for time-gated decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn ensure_future(at: DateTime<Utc>, now: DateTime<Utc>, what: &str) -> Result<()> {
    if at <= now {
        return Err(Error::Validation(format!(
            "{} must be in the future (got {})",
            what,
            to_rfc3339(at)
        )));
    }
    Ok(())
}

pub fn ensure_future_date(date: NaiveDate, now: DateTime<Utc>, what: &str) -> Result<()> {
    if date <= now.date_naive() {
        return Err(Error::Validation(format!("{} must be after today (got {})", what, date)));
    }
    Ok(())
}

/// Whole seconds until `at`, clamped at zero.
pub fn seconds_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (at - now).num_seconds().max(0)
}

pub fn within(at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    at > now && at - now <= window
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Human-facing rendering used in outbound messages.
pub fn human(dt: DateTime<Utc>) -> String {
    dt.format("%A, %d %B %Y at %H:%M UTC").to_string()
}
