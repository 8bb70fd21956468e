//! Candidate stage transitions.
//!
//! Every recruiter operation takes the acting `RecruiterSession` explicitly
//! and runs under a per-candidate lock from load to persist. Notices go out
//! only after the new state is saved; their outcome is recorded on the
//! record and never fails the transition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelinePolicy;
use crate::database::{CandidateStore, JobStore, RecruiterStore};
use crate::dto::candidate_dto::CandidateListQuery;
use crate::dto::job_dto::{BatchResume, BatchScreeningResult, DuplicateRef};
use crate::dto::public_dto::{
    AnswerInterviewPayload, ApplicationPayload, AssessmentView, ExamView, PortalView, SaveAnswerPayload,
    SubmitResponse,
};
use crate::error::{Error, Result};
use crate::models::candidate::{
    AptitudeWindow, Candidate, EmailStatus, InterviewSlot, NoticeKind, Stage, MAX_INTERVIEW_ROUNDS,
};
use crate::models::interview::{InterviewAnswer, InterviewAssessment, COMPLETION_BONUS};
use crate::models::recruiter::RecruiterSession;
use crate::services::exam_service::{ExamController, Grading};
use crate::services::message_gateway::DeliveryOutcome;
use crate::services::notification_service::NotificationService;
use crate::services::scoring_service::ScoringService;
use crate::utils::time::{ensure_future, ensure_future_date, Clock};
use crate::utils::{crypto, token};

type LockSlots = Arc<StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

/// One async mutex per candidate id. A slot lives only while some task holds
/// or waits for it.
#[derive(Default)]
struct CandidateLocks {
    slots: LockSlots,
}

/// Releases the candidate lock and drops its slot once nobody else wants it.
struct CandidateGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    slots: LockSlots,
}

impl Drop for CandidateGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(&self.id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&self.id);
        }
    }
}

impl CandidateLocks {
    async fn acquire(&self, id: Uuid) -> CandidateGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots left behind by cancelled waiters.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(id).or_default().clone()
        };
        CandidateGuard {
            id,
            guard: Some(slot.lock_owned().await),
            slots: self.slots.clone(),
        }
    }

    /// Locks every id in ascending order so concurrent batches cannot
    /// deadlock against each other.
    async fn acquire_all(&self, ids: &[Uuid]) -> Vec<CandidateGuard> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for id in sorted {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    #[cfg(test)]
    fn live_slots(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// Check, then record the actor as owner if nobody holds the candidate.
    Claim,
    /// Check only.
    Check,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub candidate: Candidate,
    pub notification: Option<DeliveryOutcome>,
}

fn ensure_may_act(actor: &RecruiterSession, candidate: &Candidate) -> Result<()> {
    if actor.may_act_on(candidate.owner_recruiter.as_deref()) {
        return Ok(());
    }
    Err(Error::OwnershipConflict(format!(
        "Candidate {} is owned by {}",
        candidate.id,
        candidate.owner_recruiter.as_deref().unwrap_or_default()
    )))
}

fn require_stage(candidate: &Candidate, allowed: &[Stage], what: &str) -> Result<()> {
    if allowed.contains(&candidate.stage) {
        return Ok(());
    }
    Err(Error::PreconditionFailed(format!(
        "Cannot {} while the candidate is in stage {}",
        what, candidate.stage
    )))
}

fn advance(candidate: &mut Candidate, next: Stage) -> Result<()> {
    if !candidate.stage.can_advance_to(next) {
        return Err(Error::PreconditionFailed(format!(
            "Stage {} cannot move to {}",
            candidate.stage, next
        )));
    }
    candidate.stage = next;
    Ok(())
}

fn enter_terminal(candidate: &mut Candidate, terminal: Stage) -> Result<()> {
    if candidate.stage.is_terminal() {
        return Err(Error::PreconditionFailed(format!(
            "Candidate is already {}",
            candidate.stage
        )));
    }
    let from = candidate.stage;
    advance(candidate, terminal)?;
    candidate.previous_stage = Some(from);
    candidate.archived = true;
    Ok(())
}

#[derive(Clone)]
pub struct PipelineService {
    candidates: Arc<dyn CandidateStore>,
    jobs: Arc<dyn JobStore>,
    recruiters: Arc<dyn RecruiterStore>,
    scoring: ScoringService,
    notifier: NotificationService,
    policy: PipelinePolicy,
    clock: Arc<dyn Clock>,
    locks: Arc<CandidateLocks>,
}

impl PipelineService {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        jobs: Arc<dyn JobStore>,
        recruiters: Arc<dyn RecruiterStore>,
        scoring: ScoringService,
        notifier: NotificationService,
        policy: PipelinePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            candidates,
            jobs,
            recruiters,
            scoring,
            notifier,
            policy,
            clock,
            locks: Arc::new(CandidateLocks::default()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn send_notice(&self, candidate: &mut Candidate, kind: NoticeKind, now: DateTime<Utc>) -> DeliveryOutcome {
        let outcome = self.notifier.dispatch(candidate, kind, now).await;
        if let Err(e) = self.candidates.save(candidate).await {
            error!(candidate_id = %candidate.id, error = %e, "failed to record notice outcome");
        }
        outcome
    }

    /// Grades the running exam if there is one. Saves and notifies when the
    /// grade is new.
    async fn finish_exam(&self, candidate: &mut Candidate, now: DateTime<Utc>) -> Result<(Grading, Option<DeliveryOutcome>)> {
        let grading = ExamController::grade(candidate, now)?;
        let Grading::Graded(score) = grading else {
            return Ok((grading, None));
        };
        self.candidates.save(candidate).await?;
        let passed = score >= self.policy.aptitude_pass_percent;
        info!(candidate_id = %candidate.id, score, passed, "aptitude exam graded");
        let outcome = self
            .send_notice(candidate, NoticeKind::AptitudeResult { passed }, now)
            .await;
        Ok((grading, Some(outcome)))
    }

    async fn expire_exam(&self, candidate: &mut Candidate, now: DateTime<Utc>) -> Result<()> {
        if ExamController::is_expired(candidate, now) {
            info!(candidate_id = %candidate.id, "exam time ran out, grading recorded answers");
            self.finish_exam(candidate, now).await?;
        }
        Ok(())
    }

    async fn transition<F>(
        &self,
        actor: &RecruiterSession,
        id: Uuid,
        ownership: Ownership,
        action: &'static str,
        apply: F,
    ) -> Result<TransitionOutcome>
    where
        F: FnOnce(&mut Candidate, DateTime<Utc>) -> Result<Option<NoticeKind>>,
    {
        let _guard = self.locks.acquire(id).await;
        let now = self.clock.now();
        let mut candidate = self.candidates.get(id).await?;
        self.expire_exam(&mut candidate, now).await?;
        ensure_may_act(actor, &candidate)?;

        // Work on a copy so a failed check leaves nothing half-applied.
        let mut next = candidate.clone();
        let notice = apply(&mut next, now)?;
        if ownership == Ownership::Claim && next.owner_recruiter.is_none() {
            next.owner_recruiter = Some(actor.username.clone());
        }
        next.updated_at = now;
        self.candidates.save(&next).await?;
        info!(
            candidate_id = %id,
            actor = %actor.username,
            action,
            from = %candidate.stage,
            to = %next.stage,
            "candidate updated"
        );

        let notification = match notice {
            Some(kind) => Some(self.send_notice(&mut next, kind, now).await),
            None => None,
        };
        Ok(TransitionOutcome {
            candidate: next,
            notification,
        })
    }

    async fn unique_access_key(&self) -> Result<String> {
        for _ in 0..8 {
            let key = token::generate_access_key();
            if self.candidates.find_by_access_key(&key).await?.is_none() {
                return Ok(key);
            }
        }
        Err(Error::Internal("Could not allocate a unique access key".into()))
    }

    /// Identity gate, screening, then persistence. Nothing is stored when any
    /// step before the save fails.
    pub async fn submit_application(&self, payload: ApplicationPayload) -> Result<TransitionOutcome> {
        let name = payload.name.trim().to_string();
        let email = payload.email.trim().to_lowercase();
        let resume = payload.resume_text.trim();

        let job = self
            .jobs
            .find_by_title(&payload.role)
            .await?
            .ok_or_else(|| Error::Validation(format!("No open job titled '{}'", payload.role.trim())))?;

        self.scoring.verify_identity(&name, resume).await?;
        let screening = self.scoring.screen_resume(resume, &job).await?;

        let fingerprint = crypto::resume_fingerprint(resume);
        let duplicate_of = self
            .candidates
            .list()
            .await?
            .into_iter()
            .filter(|c| c.resume_fingerprint == fingerprint)
            .min_by_key(|c| c.created_at)
            .map(|c| c.id);
        if let Some(original) = duplicate_of {
            info!(duplicate_of = %original, "resume matches an earlier application");
        }

        let now = self.clock.now();
        let mut candidate = Candidate {
            id: Uuid::new_v4(),
            name,
            email,
            role: job.title.clone(),
            stage: Stage::Screening,
            previous_stage: None,
            owner_recruiter: None,
            access_key: self.unique_access_key().await?,
            screening,
            resume_fingerprint: fingerprint,
            duplicate_of,
            aptitude_window: None,
            aptitude_score: None,
            exam: None,
            interview: None,
            documents_uploaded: false,
            joining_date: None,
            rejection_reason: None,
            archived: false,
            email_status: EmailStatus::NotSent,
            email_error: None,
            last_notice: None,
            notified_at: None,
            assessment: None,
            points: 0,
            created_at: now,
            updated_at: now,
        };
        self.candidates.save(&candidate).await?;
        info!(
            candidate_id = %candidate.id,
            role = %candidate.role,
            score = candidate.screening.overall_score,
            "application received"
        );

        let notification = self
            .send_notice(&mut candidate, NoticeKind::ApplicationReceived, now)
            .await;
        Ok(TransitionOutcome {
            candidate,
            notification: Some(notification),
        })
    }

    pub async fn schedule_aptitude(
        &self,
        actor: &RecruiterSession,
        id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let threshold = self.policy.experience_threshold_years;
        let duration_minutes = self.policy.exam_duration_minutes;
        self.transition(actor, id, Ownership::Claim, "schedule_aptitude", move |c, now| {
            require_stage(c, &[Stage::Screening], "schedule an aptitude exam")?;
            if c.screening.years_experience > threshold {
                return Err(Error::PreconditionFailed(format!(
                    "Candidates with more than {} years of experience go straight to interview",
                    threshold
                )));
            }
            ensure_future(start_at, now, "Aptitude start time")?;
            advance(c, Stage::AptitudeScheduled)?;
            c.aptitude_window = Some(AptitudeWindow {
                scheduled_start: start_at,
                duration_minutes,
            });
            Ok(Some(NoticeKind::ExamScheduled))
        })
        .await
    }

    pub async fn schedule_interview(
        &self,
        actor: &RecruiterSession,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let threshold = self.policy.experience_threshold_years;
        let pass_percent = self.policy.aptitude_pass_percent;
        let link = token::meeting_link(&self.policy.meeting_base_url);
        self.transition(actor, id, Ownership::Claim, "schedule_interview", move |c, now| {
            let round = match c.stage {
                Stage::Screening if c.screening.years_experience <= threshold => {
                    return Err(Error::PreconditionFailed(format!(
                        "Candidates with {} years of experience or less must take the aptitude exam first",
                        threshold
                    )));
                }
                Stage::Screening => 1,
                Stage::AptitudeScheduled => {
                    return Err(Error::PreconditionFailed(
                        "The aptitude exam has not been completed yet".into(),
                    ));
                }
                Stage::AptitudeCompleted => {
                    let score = c.aptitude_score.unwrap_or_default();
                    if score < pass_percent {
                        return Err(Error::ThresholdNotMet {
                            score,
                            threshold: pass_percent,
                        });
                    }
                    1
                }
                Stage::InterviewScheduled => {
                    let next = c.interview_round().unwrap_or_default() + 1;
                    if next > MAX_INTERVIEW_ROUNDS {
                        return Err(Error::PreconditionFailed(format!(
                            "At most {} interview rounds can be scheduled",
                            MAX_INTERVIEW_ROUNDS
                        )));
                    }
                    next
                }
                other => {
                    return Err(Error::PreconditionFailed(format!(
                        "Cannot schedule an interview while the candidate is in stage {}",
                        other
                    )));
                }
            };
            ensure_future(scheduled_at, now, "Interview time")?;
            advance(c, Stage::InterviewScheduled)?;
            c.interview = Some(InterviewSlot {
                round,
                scheduled_at,
                meeting_link: link,
            });
            Ok(Some(NoticeKind::InterviewInvite { round }))
        })
        .await
    }

    pub async fn select(&self, actor: &RecruiterSession, id: Uuid) -> Result<TransitionOutcome> {
        self.transition(actor, id, Ownership::Claim, "select", |c, _| {
            require_stage(c, &[Stage::InterviewScheduled], "select")?;
            advance(c, Stage::Selected)?;
            Ok(Some(NoticeKind::DocumentRequest))
        })
        .await
    }

    pub async fn schedule_joining(
        &self,
        actor: &RecruiterSession,
        id: Uuid,
        joining_date: NaiveDate,
    ) -> Result<TransitionOutcome> {
        self.transition(actor, id, Ownership::Claim, "schedule_joining", move |c, now| {
            require_stage(c, &[Stage::Selected], "schedule joining")?;
            if !c.documents_uploaded {
                return Err(Error::PreconditionFailed(
                    "The candidate has not confirmed their documents yet".into(),
                ));
            }
            ensure_future_date(joining_date, now, "Joining date")?;
            advance(c, Stage::JoiningScheduled)?;
            c.joining_date = Some(joining_date);
            Ok(Some(NoticeKind::JoiningLetter))
        })
        .await
    }

    pub async fn reject(&self, actor: &RecruiterSession, id: Uuid, reason: &str) -> Result<TransitionOutcome> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(Error::Validation("A rejection reason is required".into()));
        }
        self.transition(actor, id, Ownership::Claim, "reject", move |c, _| {
            enter_terminal(c, Stage::Rejected)?;
            c.rejection_reason = Some(reason);
            Ok(Some(NoticeKind::Rejection))
        })
        .await
    }

    pub async fn archive(&self, actor: &RecruiterSession, id: Uuid) -> Result<TransitionOutcome> {
        self.transition(actor, id, Ownership::Claim, "archive", |c, _| {
            enter_terminal(c, Stage::Archived)?;
            Ok(None)
        })
        .await
    }

    /// Back to the stage held before rejection or archival. Skipped steps are
    /// not replayed and no notice is sent.
    pub async fn restore(&self, actor: &RecruiterSession, id: Uuid) -> Result<TransitionOutcome> {
        self.transition(actor, id, Ownership::Claim, "restore", |c, _| {
            if !c.stage.is_terminal() {
                return Err(Error::PreconditionFailed(
                    "Only rejected or archived candidates can be restored".into(),
                ));
            }
            let previous = c
                .previous_stage
                .take()
                .ok_or_else(|| Error::Internal(format!("Candidate {} has no stage to restore", c.id)))?;
            c.stage = previous;
            c.archived = false;
            c.rejection_reason = None;
            Ok(None)
        })
        .await
    }

    pub async fn reassign_owner(
        &self,
        actor: &RecruiterSession,
        id: Uuid,
        username: &str,
    ) -> Result<TransitionOutcome> {
        if !actor.is_super_admin {
            return Err(Error::Forbidden("Only a super-admin can reassign candidates".into()));
        }
        let username = username.trim().to_string();
        if self.recruiters.get(&username).await?.is_none() {
            return Err(Error::NotFound(format!("Recruiter '{}' not found", username)));
        }
        self.transition(actor, id, Ownership::Check, "reassign_owner", move |c, _| {
            c.owner_recruiter = Some(username);
            Ok(None)
        })
        .await
    }

    /// Deletes archived records. Either every requested id is archived and
    /// all of them go, or nothing is deleted. An empty list means every
    /// archived record. Targets are locked and re-read before deletion, so a
    /// concurrent restore wins over the purge.
    pub async fn purge_archived(&self, actor: &RecruiterSession, ids: &[Uuid]) -> Result<u64> {
        if !actor.is_super_admin {
            return Err(Error::Forbidden("Only a super-admin can purge candidates".into()));
        }
        let purge_all = ids.is_empty();
        let requested: Vec<Uuid> = if purge_all {
            self.candidates
                .list()
                .await?
                .into_iter()
                .filter(|c| c.archived)
                .map(|c| c.id)
                .collect()
        } else {
            ids.to_vec()
        };

        let guards = self.locks.acquire_all(&requested).await;
        let mut targets = Vec::with_capacity(guards.len());
        for id in guards.iter().map(|g| g.id) {
            match self.candidates.get(id).await {
                Ok(c) if c.archived => targets.push(id),
                Ok(_) if purge_all => {}
                Ok(_) => {
                    return Err(Error::PreconditionFailed(format!(
                        "Candidate {} is not archived",
                        id
                    )));
                }
                Err(Error::NotFound(_)) if purge_all => {}
                Err(e) => return Err(e),
            }
        }
        if targets.is_empty() {
            return Ok(0);
        }
        let purged = self.candidates.bulk_delete(&targets).await?;
        drop(guards);
        info!(actor = %actor.username, purged, "archived candidates purged");
        Ok(purged)
    }

    /// Re-sends the last notice if it was not delivered.
    pub async fn resend_notification(&self, actor: &RecruiterSession, id: Uuid) -> Result<DeliveryOutcome> {
        let _guard = self.locks.acquire(id).await;
        let now = self.clock.now();
        let mut candidate = self.candidates.get(id).await?;
        ensure_may_act(actor, &candidate)?;
        let outcome = self
            .notifier
            .resend(&mut candidate, now)
            .await
            .ok_or_else(|| Error::PreconditionFailed("No notice has been sent to this candidate yet".into()))?;
        self.candidates.save(&candidate).await?;
        Ok(outcome)
    }

    /// Screens resumes against a job without creating candidates. Entries
    /// whose resume was already submitted, or appears earlier in the batch,
    /// are flagged. A reasoning failure marks that entry only. Results come
    /// back best first; failed entries last.
    pub async fn screen_batch(&self, job_id: Uuid, resumes: &[BatchResume]) -> Result<Vec<BatchScreeningResult>> {
        let job = self.jobs.get(job_id).await?;
        let existing: HashMap<String, Uuid> = {
            let mut known = self.candidates.list().await?;
            known.sort_by_key(|c| c.created_at);
            let mut map = HashMap::new();
            for c in known {
                map.entry(c.resume_fingerprint).or_insert(c.id);
            }
            map
        };

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut results = Vec::with_capacity(resumes.len());
        for entry in resumes {
            let resume = entry.resume_text.trim();
            let fingerprint = crypto::resume_fingerprint(resume);
            let duplicate_of = match existing.get(&fingerprint) {
                Some(id) => Some(DuplicateRef::Candidate(*id)),
                None => seen.get(&fingerprint).cloned().map(DuplicateRef::Entry),
            };
            seen.entry(fingerprint).or_insert_with(|| entry.label.clone());

            let (screening, error) = match self.scoring.screen_resume(resume, &job).await {
                Ok(screening) => (Some(screening), None),
                Err(Error::ExternalService(message)) => {
                    warn!(job = %job.title, label = %entry.label, error = %message, "batch entry not screened");
                    (None, Some(message))
                }
                Err(e) => return Err(e),
            };
            results.push(BatchScreeningResult {
                label: entry.label.clone(),
                screening,
                duplicate_of,
                error,
            });
        }

        results.sort_by_key(|r| std::cmp::Reverse(r.screening.as_ref().map(|s| s.overall_score)));
        info!(job = %job.title, entries = results.len(), "batch screened");
        Ok(results)
    }

    /// Active candidates ordered by points, then screening score, then
    /// application time.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<Candidate>> {
        let mut active: Vec<Candidate> = self
            .candidates
            .list()
            .await?
            .into_iter()
            .filter(|c| !c.archived)
            .collect();
        active.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.screening.overall_score.cmp(&a.screening.overall_score))
                .then(a.created_at.cmp(&b.created_at))
        });
        active.truncate(limit);
        Ok(active)
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate> {
        let _guard = self.locks.acquire(id).await;
        let mut candidate = self.candidates.get(id).await?;
        self.expire_exam(&mut candidate, self.clock.now()).await?;
        Ok(candidate)
    }

    pub async fn list(&self, query: &CandidateListQuery) -> Result<Vec<Candidate>> {
        let now = self.clock.now();
        let mut all = self.candidates.list().await?;
        for candidate in all.iter_mut() {
            if ExamController::is_expired(candidate, now) {
                *candidate = self.get(candidate.id).await?;
            }
        }
        all.retain(|c| query.matches(c));
        Ok(all)
    }

    async fn load_by_key(&self, raw_key: &str) -> Result<(CandidateGuard, Candidate, DateTime<Utc>)> {
        let key = token::normalize_access_key(raw_key);
        if !token::is_well_formed_access_key(&key) {
            return Err(Error::InvalidKey);
        }
        let id = match self.candidates.find_by_access_key(&key).await? {
            Some(c) if !c.archived => c.id,
            _ => return Err(Error::InvalidKey),
        };
        let guard = self.locks.acquire(id).await;
        let mut candidate = self.candidates.get(id).await?;
        if candidate.archived {
            return Err(Error::InvalidKey);
        }
        let now = self.clock.now();
        self.expire_exam(&mut candidate, now).await?;
        Ok((guard, candidate, now))
    }

    fn soon_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.policy.interview_soon_minutes)
    }

    /// Self-service login and status view.
    pub async fn portal(&self, access_key: &str) -> Result<PortalView> {
        let (_guard, candidate, now) = self.load_by_key(access_key).await?;
        Ok(PortalView::build(&candidate, now, self.soon_window()))
    }

    pub async fn exam(&self, access_key: &str) -> Result<ExamView> {
        let (_guard, candidate, now) = self.load_by_key(access_key).await?;
        Ok(ExamView::build(&candidate, now))
    }

    /// Generates the quiz and starts the timer on first access; later calls
    /// return the running session.
    pub async fn start_exam(&self, access_key: &str) -> Result<ExamView> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        if candidate.aptitude_score.is_some() {
            return Ok(ExamView::build(&candidate, now));
        }
        if ExamController::ensure_startable(&candidate, now)? {
            let quiz = self.scoring.generate_quiz(&candidate.role).await?;
            ExamController::start(&mut candidate, quiz, now)?;
            self.candidates.save(&candidate).await?;
            info!(candidate_id = %candidate.id, "aptitude exam started");
        }
        Ok(ExamView::build(&candidate, now))
    }

    /// Records one answer. Once time is up the exam is graded instead and the
    /// completed view comes back.
    pub async fn save_answer(&self, access_key: &str, payload: &SaveAnswerPayload) -> Result<ExamView> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        if candidate.aptitude_score.is_none() {
            ExamController::record_answer(&mut candidate, payload.question_id, payload.answer(), now)?;
            self.candidates.save(&candidate).await?;
        }
        Ok(ExamView::build(&candidate, now))
    }

    pub async fn submit_exam(&self, access_key: &str) -> Result<SubmitResponse> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        let (grading, _) = self.finish_exam(&mut candidate, now).await?;
        let score = grading.score();
        Ok(SubmitResponse {
            score,
            passed: score >= self.policy.aptitude_pass_percent,
            already_submitted: matches!(grading, Grading::AlreadyGraded(_)),
        })
    }

    /// The AI interview assessment for the current round. Questions are
    /// generated on first access in each round.
    pub async fn interview_assessment(&self, access_key: &str) -> Result<AssessmentView> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        require_stage(&candidate, &[Stage::InterviewScheduled], "open the interview assessment")?;
        let round = candidate.interview_round().unwrap_or(1);
        let current = candidate.assessment.as_ref().filter(|a| a.round == round);
        if let Some(assessment) = current {
            return Ok(AssessmentView::build(assessment, candidate.points));
        }

        let questions = self
            .scoring
            .generate_interview_questions(&candidate.name, &candidate.role)
            .await?;
        candidate.assessment = Some(InterviewAssessment::new(round, questions, now));
        candidate.updated_at = now;
        self.candidates.save(&candidate).await?;
        info!(candidate_id = %candidate.id, round, "interview assessment generated");
        let assessment = candidate
            .assessment
            .as_ref()
            .ok_or_else(|| Error::Internal("assessment vanished after generation".into()))?;
        Ok(AssessmentView::build(assessment, candidate.points))
    }

    /// Evaluates one answer and awards half its score as points. Answering
    /// the last question completes the assessment and adds the bonus.
    pub async fn answer_interview_question(
        &self,
        access_key: &str,
        payload: &AnswerInterviewPayload,
    ) -> Result<AssessmentView> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        require_stage(&candidate, &[Stage::InterviewScheduled], "answer interview questions")?;
        let round = candidate.interview_round().unwrap_or(1);
        let assessment = candidate
            .assessment
            .as_mut()
            .filter(|a| a.round == round)
            .ok_or_else(|| Error::PreconditionFailed("The interview assessment has not been opened".into()))?;

        let index = payload.question_index;
        let question = assessment
            .questions
            .get(index)
            .map(|q| q.question.clone())
            .ok_or_else(|| Error::Validation(format!("Question {} does not exist", index)))?;
        if assessment.answers.get(index).is_some_and(|a| a.is_some()) {
            return Err(Error::PreconditionFailed(format!(
                "Question {} has already been answered",
                index
            )));
        }

        let response = payload.response.trim().to_string();
        let evaluation = self.scoring.evaluate_response(&question, &response).await?;
        let mut earned = evaluation.points();
        assessment.answers[index] = Some(InterviewAnswer {
            response,
            evaluation,
            answered_at: now,
        });
        if assessment.answers.iter().all(|a| a.is_some()) {
            assessment.completed_at = Some(now);
            earned += COMPLETION_BONUS;
        }
        let completed = assessment.is_complete();
        candidate.points += earned;
        candidate.updated_at = now;
        self.candidates.save(&candidate).await?;
        info!(candidate_id = %candidate.id, question = index, earned, completed, "interview answer evaluated");

        let assessment = candidate
            .assessment
            .as_ref()
            .ok_or_else(|| Error::Internal("assessment vanished after answering".into()))?;
        Ok(AssessmentView::build(assessment, candidate.points))
    }

    pub async fn confirm_documents(&self, access_key: &str) -> Result<PortalView> {
        let (_guard, mut candidate, now) = self.load_by_key(access_key).await?;
        require_stage(&candidate, &[Stage::Selected], "confirm documents")?;
        if !candidate.documents_uploaded {
            candidate.documents_uploaded = true;
            candidate.updated_at = now;
            self.candidates.save(&candidate).await?;
            info!(candidate_id = %candidate.id, "documents confirmed");
        }
        Ok(PortalView::build(&candidate, now, self.soon_window()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{MemoryCandidateStore, MemoryJobStore, MemoryRecruiterStore};
    use crate::models::job::Job;
    use crate::models::recruiter::Recruiter;
    use crate::services::exam_service::ExamStatus;
    use crate::services::message_gateway::{MessageGateway, MockMessageGateway, UnconfiguredGateway};
    use crate::services::reasoning_client::{ReasoningClient, ReasoningError, ReasoningRequest};
    use crate::dto::candidate_dto::CandidateResponse;
    use crate::models::interview::INTERVIEW_QUESTION_COUNT;
    use crate::services::scoring_service::{
        tests::{interview_questions_json, quiz_json},
        RetryPolicy,
    };
    use crate::utils::time::ManualClock;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    /// Answers by prompt: the name is the resume's first line, experience is
    /// the number before "years", quizzes and interview questions are well
    /// formed and every interview answer scores 90.
    struct ScriptedReasoning;

    #[async_trait]
    impl ReasoningClient for ScriptedReasoning {
        async fn complete_json(&self, request: ReasoningRequest) -> std::result::Result<JsonValue, ReasoningError> {
            if request.system.contains("full name") {
                let name = request.user.lines().next().unwrap_or_default().trim().to_string();
                return Ok(serde_json::json!({ "full_name": name }));
            }
            if request.system.contains("aptitude tests") {
                return Ok(quiz_json(5));
            }
            if request.system.contains("interview questions") {
                return Ok(interview_questions_json(5));
            }
            if request.system.contains("evaluate interview answers") {
                return Ok(serde_json::json!({
                    "score": 90, "feedback": "clear answer", "clarity": "good",
                    "conciseness": "good", "relevance": "good"
                }));
            }
            let words: Vec<&str> = request.user.split_whitespace().collect();
            let years = words
                .windows(2)
                .find(|w| w[1].trim_matches(|c: char| !c.is_alphabetic()).starts_with("year"))
                .and_then(|w| w[0].parse::<i64>().ok())
                .unwrap_or(0);
            Ok(serde_json::json!({
                "overall_score": 85, "technical_match": 80, "years_experience": years, "summary": "scripted"
            }))
        }
    }

    struct Harness {
        pipeline: PipelineService,
        store: Arc<MemoryCandidateStore>,
        clock: Arc<ManualClock>,
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, 8, 0, 0).unwrap()
    }

    async fn harness_with(gateway: Arc<dyn MessageGateway>) -> Harness {
        let store = Arc::new(MemoryCandidateStore::new());
        let jobs = Arc::new(MemoryJobStore::new());
        let recruiters = Arc::new(MemoryRecruiterStore::new());
        for username in ["maria", "tom"] {
            recruiters
                .insert(&Recruiter {
                    username: username.into(),
                    password_hash: String::new(),
                    email: format!("{username}@example.com"),
                    is_super_admin: false,
                    created_at: start_time(),
                })
                .await
                .unwrap();
        }
        jobs.insert(&Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            description: "Services in Rust".into(),
            required_skills: vec!["Rust".into()],
            min_experience_years: 3,
            created_at: start_time(),
            updated_at: start_time(),
        })
        .await
        .unwrap();

        let clock = Arc::new(ManualClock::new(start_time()));
        let scoring = ScoringService::new(
            Arc::new(ScriptedReasoning),
            RetryPolicy {
                max_retries: 3,
                base_delay: StdDuration::from_millis(1),
                call_timeout: StdDuration::from_secs(5),
            },
        );
        let pipeline = PipelineService::new(
            store.clone(),
            jobs,
            recruiters,
            scoring,
            NotificationService::new(gateway),
            PipelinePolicy::default(),
            clock.clone(),
        );
        Harness { pipeline, store, clock }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(UnconfiguredGateway)).await
    }

    fn maria() -> RecruiterSession {
        RecruiterSession { username: "maria".into(), is_super_admin: false }
    }

    fn tom() -> RecruiterSession {
        RecruiterSession { username: "tom".into(), is_super_admin: false }
    }

    fn root() -> RecruiterSession {
        RecruiterSession { username: "root".into(), is_super_admin: true }
    }

    fn application(name: &str, years: u32) -> ApplicationPayload {
        ApplicationPayload {
            name: name.into(),
            email: "applicant@example.com".into(),
            role: "backend engineer".into(),
            resume_text: format!("{name}\nSoftware engineer with {years} years of Rust and PostgreSQL."),
        }
    }

    async fn apply(h: &Harness, years: u32) -> Candidate {
        h.pipeline
            .submit_application(application("Ada Lovelace", years))
            .await
            .unwrap()
            .candidate
    }

    /// Correct option for quiz question `id` as produced by `quiz_json(5)`.
    fn correct_option(id: u32) -> u8 {
        (((id - 1) % 5) % 4) as u8
    }

    async fn take_exam(h: &Harness, candidate: &Candidate, correct: u32) {
        h.pipeline
            .schedule_aptitude(&maria(), candidate.id, h.clock.now() + Duration::hours(1))
            .await
            .unwrap();
        h.clock.advance(Duration::hours(1));
        h.pipeline.start_exam(&candidate.access_key).await.unwrap();
        for id in 1..=correct {
            let payload = SaveAnswerPayload { question_id: id, option: Some(correct_option(id)) };
            h.pipeline.save_answer(&candidate.access_key, &payload).await.unwrap();
        }
    }

    #[tokio::test]
    async fn application_is_screened_and_persisted_without_mail_credentials() {
        let h = harness().await;
        let outcome = h
            .pipeline
            .submit_application(application("Ada Lovelace", 1))
            .await
            .unwrap();

        let stored = h.store.get(outcome.candidate.id).await.unwrap();
        assert_eq!(stored.stage, Stage::Screening);
        assert_eq!(stored.role, "Backend Engineer");
        assert!(stored.screening.overall_score < 40);
        assert!(token::is_well_formed_access_key(&stored.access_key));
        assert_eq!(stored.email_status, EmailStatus::NotDelivered);
        assert_eq!(stored.last_notice, Some(NoticeKind::ApplicationReceived));
        assert_eq!(outcome.notification.map(|n| n.delivered), Some(false));
    }

    #[tokio::test]
    async fn identity_mismatch_persists_nothing() {
        let h = harness().await;
        let mut payload = application("Grace Hopper", 4);
        payload.name = "Ada Lovelace".into();
        let err = h.pipeline.submit_application(payload).await.unwrap_err();
        assert!(matches!(err, Error::IdentityMismatch(_)));
        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_role_is_a_validation_error() {
        let h = harness().await;
        let mut payload = application("Ada Lovelace", 4);
        payload.role = "Astronaut".into();
        assert!(matches!(
            h.pipeline.submit_application(payload).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn resubmitted_resume_is_flagged_as_duplicate() {
        let h = harness().await;
        let first = apply(&h, 4).await;
        let second = apply(&h, 4).await;
        assert_eq!(second.duplicate_of, Some(first.id));
        assert_eq!(second.screening, first.screening);
        assert_ne!(second.access_key, first.access_key);
    }

    #[tokio::test]
    async fn experience_decides_the_branch() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::days(1);

        assert!(matches!(
            h.pipeline.schedule_interview(&maria(), junior.id, at).await,
            Err(Error::PreconditionFailed(_))
        ));
        assert!(matches!(
            h.pipeline.schedule_aptitude(&maria(), senior.id, at).await,
            Err(Error::PreconditionFailed(_))
        ));

        let invited = h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();
        let slot = invited.candidate.interview.clone().unwrap();
        assert_eq!(slot.round, 1);
        assert!(slot.meeting_link.starts_with("https://meet.jit.si/"));
        assert_eq!(invited.candidate.owner_recruiter.as_deref(), Some("maria"));
    }

    #[tokio::test]
    async fn interview_rounds_stop_at_the_cap() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let mut at = h.clock.now() + Duration::days(1);
        for _ in 0..MAX_INTERVIEW_ROUNDS {
            h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();
            at += Duration::days(1);
        }
        let err = h
            .pipeline
            .schedule_interview(&maria(), senior.id, at)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
        let stored = h.store.get(senior.id).await.unwrap();
        assert_eq!(stored.interview_round(), Some(MAX_INTERVIEW_ROUNDS));
    }

    #[tokio::test]
    async fn past_timestamps_are_rejected_without_mutation() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let err = h
            .pipeline
            .schedule_interview(&maria(), senior.id, h.clock.now() - Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let stored = h.store.get(senior.id).await.unwrap();
        assert_eq!(stored.stage, Stage::Screening);
        assert!(stored.owner_recruiter.is_none());
    }

    #[tokio::test]
    async fn second_recruiter_hits_ownership_conflict() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::days(1);
        h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();

        let err = h.pipeline.select(&tom(), senior.id).await.unwrap_err();
        assert!(matches!(err, Error::OwnershipConflict(_)));
        assert_eq!(h.store.get(senior.id).await.unwrap().stage, Stage::InterviewScheduled);

        let selected = h.pipeline.select(&root(), senior.id).await.unwrap();
        assert_eq!(selected.candidate.stage, Stage::Selected);
        assert_eq!(selected.candidate.owner_recruiter.as_deref(), Some("maria"));
    }

    #[tokio::test]
    async fn aptitude_below_threshold_blocks_the_interview() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        take_exam(&h, &junior, 9).await;
        let submitted = h.pipeline.submit_exam(&junior.access_key).await.unwrap();
        assert_eq!(submitted.score, 45);
        assert!(!submitted.passed);

        let err = h
            .pipeline
            .schedule_interview(&maria(), junior.id, h.clock.now() + Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ThresholdNotMet { score: 45, threshold: 50 }));
        assert_eq!(h.store.get(junior.id).await.unwrap().stage, Stage::AptitudeCompleted);
    }

    #[tokio::test]
    async fn passing_aptitude_opens_round_one_and_second_submit_is_a_no_op() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        take_exam(&h, &junior, 10).await;

        let first = h.pipeline.submit_exam(&junior.access_key).await.unwrap();
        let second = h.pipeline.submit_exam(&junior.access_key).await.unwrap();
        assert_eq!((first.score, first.already_submitted), (50, false));
        assert_eq!((second.score, second.already_submitted), (50, true));

        let invited = h
            .pipeline
            .schedule_interview(&maria(), junior.id, h.clock.now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(invited.candidate.interview_round(), Some(1));
    }

    #[tokio::test]
    async fn graded_exam_shows_its_breakdown_to_recruiters() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        take_exam(&h, &junior, 7).await;
        h.pipeline.submit_exam(&junior.access_key).await.unwrap();

        let response = CandidateResponse::from(h.pipeline.get(junior.id).await.unwrap());
        let exam = response.exam.unwrap();
        assert_eq!(exam.by_category.len(), 4);
        assert_eq!((exam.by_category[0].correct, exam.by_category[0].total), (5, 5));
        assert_eq!((exam.by_category[1].correct, exam.by_category[1].total), (2, 5));
        assert_eq!(exam.by_category[2].correct + exam.by_category[3].correct, 0);
    }

    #[tokio::test]
    async fn exam_auto_grades_when_time_runs_out() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        take_exam(&h, &junior, 3).await;

        h.clock.advance(Duration::minutes(20));
        let view = h.pipeline.exam(&junior.access_key).await.unwrap();
        assert_eq!(view.status, ExamStatus::Completed { score: 15 });
        assert!(view.questions.is_empty());

        let stored = h.store.get(junior.id).await.unwrap();
        assert_eq!(stored.stage, Stage::AptitudeCompleted);
        assert_eq!(stored.last_notice, Some(NoticeKind::AptitudeResult { passed: false }));

        let late = SaveAnswerPayload { question_id: 5, option: Some(0) };
        let view = h.pipeline.save_answer(&junior.access_key, &late).await.unwrap();
        assert_eq!(view.status, ExamStatus::Completed { score: 15 });
    }

    #[tokio::test]
    async fn untouched_exam_scores_zero_at_expiry() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        take_exam(&h, &junior, 0).await;
        h.clock.advance(Duration::minutes(20));
        let graded = h.pipeline.get(junior.id).await.unwrap();
        assert_eq!(graded.aptitude_score, Some(0));
    }

    #[tokio::test]
    async fn exam_is_locked_before_its_start() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        h.pipeline
            .schedule_aptitude(&maria(), junior.id, h.clock.now() + Duration::hours(2))
            .await
            .unwrap();
        let view = h.pipeline.exam(&junior.access_key).await.unwrap();
        assert!(matches!(view.status, ExamStatus::Locked { starts_in_seconds: 7200, .. }));
        assert!(matches!(
            h.pipeline.start_exam(&junior.access_key).await,
            Err(Error::PreconditionFailed(_))
        ));
    }

    #[tokio::test]
    async fn rejection_at_round_two_archives_and_keeps_the_reason_internal() {
        let rejections = Arc::new(AtomicUsize::new(0));
        let seen = rejections.clone();
        let mut gateway = MockMessageGateway::new();
        gateway.expect_send().returning(move |msg| {
            if msg.body.contains("not be moving forward") {
                assert!(!msg.body.to_lowercase().contains("system design"));
                assert!(!msg.subject.to_lowercase().contains("system design"));
                seen.fetch_add(1, Ordering::SeqCst);
            }
            DeliveryOutcome::delivered("accepted (202)")
        });
        let h = harness_with(Arc::new(gateway)).await;

        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::days(1);
        h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();
        h.pipeline
            .schedule_interview(&maria(), senior.id, at + Duration::days(1))
            .await
            .unwrap();
        assert!(matches!(
            h.pipeline.schedule_interview(&maria(), senior.id, at + Duration::days(2)).await,
            Err(Error::PreconditionFailed(_))
        ));

        let rejected = h
            .pipeline
            .reject(&maria(), senior.id, "weak system design")
            .await
            .unwrap();
        assert_eq!(rejected.candidate.stage, Stage::Rejected);
        assert!(rejected.candidate.archived);
        assert_eq!(rejected.candidate.rejection_reason.as_deref(), Some("weak system design"));
        assert_eq!(rejected.candidate.email_status, EmailStatus::Delivered);
        assert_eq!(rejections.load(Ordering::SeqCst), 1);

        assert!(matches!(
            h.pipeline.portal(&senior.access_key).await,
            Err(Error::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn blank_rejection_reason_is_refused() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        assert!(matches!(
            h.pipeline.reject(&maria(), senior.id, "   ").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn restore_returns_to_the_previous_stage() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::days(1);
        h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();
        h.pipeline.reject(&maria(), senior.id, "culture fit").await.unwrap();
        assert!(matches!(
            h.pipeline.reject(&maria(), senior.id, "again").await,
            Err(Error::PreconditionFailed(_))
        ));

        let restored = h.pipeline.restore(&maria(), senior.id).await.unwrap().candidate;
        assert_eq!(restored.stage, Stage::InterviewScheduled);
        assert!(!restored.archived);
        assert!(restored.rejection_reason.is_none());
        assert_eq!(restored.interview_round(), Some(1));
    }

    #[tokio::test]
    async fn joining_needs_confirmed_documents() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::days(1);
        h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();
        h.pipeline.select(&maria(), senior.id).await.unwrap();

        let joining = (h.clock.now() + Duration::days(30)).date_naive();
        assert!(matches!(
            h.pipeline.schedule_joining(&maria(), senior.id, joining).await,
            Err(Error::PreconditionFailed(_))
        ));

        let view = h.pipeline.confirm_documents(&senior.access_key).await.unwrap();
        assert!(view.documents_uploaded);
        let done = h.pipeline.schedule_joining(&maria(), senior.id, joining).await.unwrap();
        assert_eq!(done.candidate.stage, Stage::JoiningScheduled);
        assert_eq!(done.candidate.joining_date, Some(joining));
        assert_eq!(done.candidate.last_notice, Some(NoticeKind::JoiningLetter));
    }

    #[tokio::test]
    async fn interview_soon_is_computed_at_read_time() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let at = h.clock.now() + Duration::hours(3);
        h.pipeline.schedule_interview(&maria(), senior.id, at).await.unwrap();

        assert!(!h.pipeline.portal(&senior.access_key).await.unwrap().interview_soon);
        h.clock.advance(Duration::hours(2) + Duration::minutes(30));
        let view = h.pipeline.portal(&senior.access_key.to_lowercase()).await.unwrap();
        assert!(view.interview_soon);
        assert!(view.interview.is_some());
    }

    #[tokio::test]
    async fn reassignment_and_purge_are_super_admin_only() {
        let h = harness().await;
        let first = apply(&h, 5).await;
        let second = apply(&h, 4).await;
        h.pipeline.archive(&maria(), first.id).await.unwrap();

        assert!(matches!(
            h.pipeline.reassign_owner(&maria(), first.id, "tom").await,
            Err(Error::Forbidden(_))
        ));
        let moved = h.pipeline.reassign_owner(&root(), first.id, "tom").await.unwrap();
        assert_eq!(moved.candidate.owner_recruiter.as_deref(), Some("tom"));
        assert!(matches!(
            h.pipeline.reassign_owner(&root(), first.id, "nobody").await,
            Err(Error::NotFound(_))
        ));

        assert!(matches!(
            h.pipeline.purge_archived(&maria(), &[]).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            h.pipeline.purge_archived(&root(), &[first.id, second.id]).await,
            Err(Error::PreconditionFailed(_))
        ));
        assert_eq!(h.store.list().await.unwrap().len(), 2);

        assert_eq!(h.pipeline.purge_archived(&root(), &[first.id]).await.unwrap(), 1);
        assert!(matches!(h.store.get(first.id).await, Err(Error::NotFound(_))));
        assert!(h.store.get(second.id).await.is_ok());
    }

    #[tokio::test]
    async fn purge_spares_a_candidate_restored_while_it_waited() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        h.pipeline.archive(&maria(), senior.id).await.unwrap();

        let held = h.pipeline.locks.acquire(senior.id).await;
        let admin = root();
        let purge = h.pipeline.purge_archived(&admin, &[]);
        let restore_first = async {
            // The purge has listed the archived record and is queued on its lock.
            let mut restored = h.store.get(senior.id).await.unwrap();
            restored.stage = Stage::Screening;
            restored.previous_stage = None;
            restored.archived = false;
            h.store.save(&restored).await.unwrap();
            drop(held);
        };
        let (purged, ()) = tokio::join!(purge, restore_first);

        assert_eq!(purged.unwrap(), 0);
        let kept = h.store.get(senior.id).await.unwrap();
        assert!(!kept.archived);
    }

    #[tokio::test]
    async fn lock_slots_do_not_outlive_their_users() {
        let h = harness().await;
        for _ in 0..200 {
            assert!(matches!(h.pipeline.get(Uuid::new_v4()).await, Err(Error::NotFound(_))));
        }
        assert_eq!(h.pipeline.locks.live_slots(), 0);

        let senior = apply(&h, 5).await;
        h.pipeline.archive(&maria(), senior.id).await.unwrap();
        h.pipeline.portal(&senior.access_key).await.unwrap_err();
        assert_eq!(h.pipeline.purge_archived(&root(), &[]).await.unwrap(), 1);
        assert_eq!(h.pipeline.locks.live_slots(), 0);
    }

    #[tokio::test]
    async fn resend_requires_permission_but_does_not_claim() {
        let h = harness().await;
        let senior = apply(&h, 5).await;

        let outcome = h.pipeline.resend_notification(&tom(), senior.id).await.unwrap();
        assert!(!outcome.delivered);
        assert!(h.store.get(senior.id).await.unwrap().owner_recruiter.is_none());

        h.pipeline.archive(&maria(), senior.id).await.unwrap();
        assert!(matches!(
            h.pipeline.resend_notification(&tom(), senior.id).await,
            Err(Error::OwnershipConflict(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_stage_and_owner() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        let senior = apply(&h, 5).await;
        h.pipeline
            .schedule_interview(&maria(), senior.id, h.clock.now() + Duration::days(1))
            .await
            .unwrap();

        let screening = h
            .pipeline
            .list(&CandidateListQuery { stage: Some(Stage::Screening), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(screening.iter().map(|c| c.id).collect::<Vec<_>>(), vec![junior.id]);

        let owned = h
            .pipeline
            .list(&CandidateListQuery { owner: Some("maria".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, senior.id);
    }

    async fn answer(h: &Harness, key: &str, index: usize) -> Result<AssessmentView> {
        let payload = AnswerInterviewPayload { question_index: index, response: "I would profile first.".into() };
        h.pipeline.answer_interview_question(key, &payload).await
    }

    #[tokio::test]
    async fn interview_assessment_needs_an_interview() {
        let h = harness().await;
        let junior = apply(&h, 1).await;
        assert!(matches!(
            h.pipeline.interview_assessment(&junior.access_key).await,
            Err(Error::PreconditionFailed(_))
        ));
    }

    #[tokio::test]
    async fn interview_assessment_awards_points_and_a_completion_bonus() {
        let h = harness().await;
        let senior = apply(&h, 5).await;
        let key = senior.access_key.clone();
        h.pipeline
            .schedule_interview(&maria(), senior.id, h.clock.now() + Duration::days(1))
            .await
            .unwrap();

        assert!(matches!(answer(&h, &key, 0).await, Err(Error::PreconditionFailed(_))));

        let opened = h.pipeline.interview_assessment(&key).await.unwrap();
        assert_eq!(opened.round, 1);
        assert_eq!(opened.questions.len(), INTERVIEW_QUESTION_COUNT);
        assert_eq!(opened.answered, 0);
        let again = h.pipeline.interview_assessment(&key).await.unwrap();
        assert_eq!(again.questions[0].question, opened.questions[0].question);

        let view = answer(&h, &key, 0).await.unwrap();
        assert_eq!(view.points, 45);
        assert_eq!(view.questions[0].feedback.as_deref(), Some("clear answer"));
        assert!(matches!(answer(&h, &key, 0).await, Err(Error::PreconditionFailed(_))));
        assert!(matches!(answer(&h, &key, INTERVIEW_QUESTION_COUNT).await, Err(Error::Validation(_))));

        for index in 1..INTERVIEW_QUESTION_COUNT {
            answer(&h, &key, index).await.unwrap();
        }
        let stored = h.store.get(senior.id).await.unwrap();
        assert_eq!(stored.points, 45 * INTERVIEW_QUESTION_COUNT as u32 + COMPLETION_BONUS);
        assert!(stored.assessment.as_ref().is_some_and(|a| a.is_complete()));

        // A second round starts a fresh assessment and keeps earned points.
        h.pipeline
            .schedule_interview(&maria(), senior.id, h.clock.now() + Duration::days(2))
            .await
            .unwrap();
        let round_two = h.pipeline.interview_assessment(&key).await.unwrap();
        assert_eq!(round_two.round, 2);
        assert_eq!(round_two.answered, 0);
        assert_eq!(round_two.points, stored.points);
    }

    #[tokio::test]
    async fn leaderboard_ranks_active_candidates_by_points() {
        let h = harness().await;
        let first = apply(&h, 5).await;
        h.clock.advance(Duration::minutes(1));
        let second = apply(&h, 6).await;
        h.clock.advance(Duration::minutes(1));
        let archived = apply(&h, 7).await;
        h.pipeline.archive(&maria(), archived.id).await.unwrap();

        let mut scored = h.store.get(second.id).await.unwrap();
        scored.points = 120;
        h.store.save(&scored).await.unwrap();

        let board = h.pipeline.leaderboard(10).await.unwrap();
        assert_eq!(board.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert_eq!(h.pipeline.leaderboard(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_screening_flags_duplicates_and_persists_nothing() {
        let h = harness().await;
        let existing = apply(&h, 5).await;
        let job = h.pipeline.jobs.find_by_title("Backend Engineer").await.unwrap().unwrap();
        let resume = |years: u32| application("Ada Lovelace", years).resume_text;
        let batch = vec![
            BatchResume { label: "junior.txt".into(), resume_text: resume(1) },
            BatchResume { label: "resubmitted.txt".into(), resume_text: resume(5) },
            BatchResume { label: "copy-of-junior.txt".into(), resume_text: resume(1) },
        ];

        let results = h.pipeline.screen_batch(job.id, &batch).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].label, "resubmitted.txt");
        assert_eq!(results[0].duplicate_of, Some(DuplicateRef::Candidate(existing.id)));
        let copy = results.iter().find(|r| r.label == "copy-of-junior.txt").unwrap();
        assert_eq!(copy.duplicate_of, Some(DuplicateRef::Entry("junior.txt".into())));
        assert!(results.iter().all(|r| r.error.is_none()));
        assert!(results[1].screening.as_ref().unwrap().overall_score < 40);
        assert_eq!(h.store.list().await.unwrap().len(), 1);

        assert!(matches!(
            h.pipeline.screen_batch(Uuid::new_v4(), &batch).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_or_unknown_keys_are_invalid() {
        let h = harness().await;
        assert!(matches!(h.pipeline.portal("nope").await, Err(Error::InvalidKey)));
        assert!(matches!(h.pipeline.portal("ABCD-EFGH").await, Err(Error::InvalidKey)));
    }
}
