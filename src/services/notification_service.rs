use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::models::candidate::{Candidate, EmailStatus, NoticeKind};
use crate::services::message_gateway::{DeliveryOutcome, MessageGateway, OutboundMessage};
use crate::utils::time::human;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

/// Renders the candidate-facing message for `kind`. Internal fields such as
/// the rejection reason and screening scores never appear here.
pub fn render(kind: NoticeKind, candidate: &Candidate) -> Notice {
    let greeting = format!("Dear {},", candidate.name.trim());
    let sign_off = "Kind regards,\nThe Hiring Team";

    let (subject, paragraph) = match kind {
        NoticeKind::ApplicationReceived => (
            format!("We received your application for {}", candidate.role),
            format!(
                "Thank you for applying for the {} position. You can follow your application \
                 in the candidate portal with this access key:\n\n    {}\n\nKeep it private; \
                 it is the only way to sign in.",
                candidate.role, candidate.access_key
            ),
        ),
        NoticeKind::ExamScheduled => {
            let when = candidate
                .aptitude_window
                .map(|w| {
                    format!(
                        "It unlocks on {} and lasts {} minutes from the moment you start it.",
                        human(w.scheduled_start),
                        w.duration_minutes
                    )
                })
                .unwrap_or_default();
            (
                format!("Your aptitude assessment for {}", candidate.role),
                format!(
                    "The next step is a short aptitude assessment taken in the candidate portal. {}",
                    when
                ),
            )
        }
        NoticeKind::AptitudeResult { passed: true } => (
            "Your aptitude assessment result".to_string(),
            format!(
                "You scored {}% on the aptitude assessment and passed. We will contact you \
                 shortly to arrange an interview.",
                candidate.aptitude_score.unwrap_or_default()
            ),
        ),
        NoticeKind::AptitudeResult { passed: false } => (
            "Your aptitude assessment result".to_string(),
            format!(
                "You scored {}% on the aptitude assessment. Our team will review your \
                 application and let you know about next steps.",
                candidate.aptitude_score.unwrap_or_default()
            ),
        ),
        NoticeKind::InterviewInvite { round } => {
            let details = candidate
                .interview
                .as_ref()
                .map(|slot| {
                    format!(
                        "It is scheduled for {}.\nJoin here: {}",
                        human(slot.scheduled_at),
                        slot.meeting_link
                    )
                })
                .unwrap_or_default();
            (
                format!("Interview invitation (round {}) for {}", round, candidate.role),
                format!("We would like to invite you to interview round {}. {}", round, details),
            )
        }
        NoticeKind::DocumentRequest => (
            format!("Congratulations! You have been selected for {}", candidate.role),
            "We are delighted to let you know that you have been selected. Please confirm \
             your documents in the candidate portal so we can schedule your joining date."
                .to_string(),
        ),
        NoticeKind::JoiningLetter => (
            format!("Your joining date for {}", candidate.role),
            format!(
                "Welcome aboard! Your joining date is {}. We look forward to working with you.",
                candidate
                    .joining_date
                    .map(|d| d.format("%A, %d %B %Y").to_string())
                    .unwrap_or_default()
            ),
        ),
        NoticeKind::Rejection => (
            format!("Your application for {}", candidate.role),
            "Thank you for the time you invested in our process. After careful consideration \
             we will not be moving forward with your application. We wish you every success."
                .to_string(),
        ),
    };

    Notice {
        subject,
        body: format!("{}\n\n{}\n\n{}", greeting, paragraph, sign_off),
    }
}

/// Sends transition notices and records the outcome on the candidate.
#[derive(Clone)]
pub struct NotificationService {
    gateway: Arc<dyn MessageGateway>,
}

impl NotificationService {
    pub fn new(gateway: Arc<dyn MessageGateway>) -> Self {
        Self { gateway }
    }

    pub async fn dispatch(
        &self,
        candidate: &mut Candidate,
        kind: NoticeKind,
        now: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let notice = render(kind, candidate);
        let outcome = self
            .gateway
            .send(OutboundMessage {
                to: candidate.email.clone(),
                subject: notice.subject,
                body: notice.body,
            })
            .await;

        candidate.last_notice = Some(kind);
        candidate.notified_at = Some(now);
        if outcome.delivered {
            candidate.email_status = EmailStatus::Delivered;
            candidate.email_error = None;
            info!(candidate_id = %candidate.id, ?kind, "notice delivered");
        } else {
            candidate.email_status = EmailStatus::NotDelivered;
            candidate.email_error = Some(outcome.detail.clone());
            warn!(candidate_id = %candidate.id, ?kind, detail = %outcome.detail, "notice not delivered");
        }
        outcome
    }

    /// Re-sends the last notice unless it was already delivered. Returns
    /// `None` when the candidate was never notified.
    pub async fn resend(&self, candidate: &mut Candidate, now: DateTime<Utc>) -> Option<DeliveryOutcome> {
        let kind = candidate.last_notice?;
        if candidate.email_status == EmailStatus::Delivered {
            return Some(DeliveryOutcome::delivered("already delivered"));
        }
        Some(self.dispatch(candidate, kind, now).await)
    }
}
