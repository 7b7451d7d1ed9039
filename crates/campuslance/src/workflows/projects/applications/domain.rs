use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::workflows::projects::domain::ApplicationId;
use crate::workflows::projects::domain::{CompanyId, ProjectId, StudentId, ValidationError};

/// Application lifecycle states.
///
/// Only the first five are produced by the wired selection flow. The
/// remaining variants belong to a dormant multi-round selection system
/// (timed offers with backup candidates) that is modeled for storage
/// compatibility but not reachable through any coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
    Withdrawn,
    AwaitingAcceptance,
    OnHold,
    Expired,
    RejectedByStudent,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::AwaitingAcceptance => "awaiting_acceptance",
            ApplicationStatus::OnHold => "on_hold",
            ApplicationStatus::Expired => "expired",
            ApplicationStatus::RejectedByStudent => "rejected_by_student",
        }
    }

    /// A withdrawn application frees the (student, project) slot.
    pub const fn is_active(self) -> bool {
        !matches!(self, ApplicationStatus::Withdrawn)
    }

    /// States a company decision (accept/reject/shortlist) may act on.
    pub const fn is_open_for_decision(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending | ApplicationStatus::Shortlisted
        )
    }
}

/// Fixed completion-time estimates a student can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedTime {
    OneWeek,
    TwoWeeks,
    ThreeToFourWeeks,
    OneToTwoMonths,
    TwoToThreeMonths,
}

impl EstimatedTime {
    pub const fn label(self) -> &'static str {
        match self {
            EstimatedTime::OneWeek => "1 week",
            EstimatedTime::TwoWeeks => "2 weeks",
            EstimatedTime::ThreeToFourWeeks => "3-4 weeks",
            EstimatedTime::OneToTwoMonths => "1-2 months",
            EstimatedTime::TwoToThreeMonths => "2-3 months",
        }
    }
}

/// Display data captured from the student profile at apply time.
///
/// Reads intentionally reflect the profile as it was when the student
/// applied, not the live profile; companies review the snapshot even after
/// later edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub name: String,
    pub college: String,
    pub city: String,
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    pub captured_at: DateTime<Utc>,
}

const COVER_LETTER_MIN: usize = 50;
const COVER_LETTER_MAX: usize = 1000;

/// Student-supplied payload for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub cover_letter: String,
    pub proposed_price: u64,
    pub estimated_time: EstimatedTime,
}

impl ApplicationDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let letter = self.cover_letter.trim();
        if letter.len() < COVER_LETTER_MIN || letter.len() > COVER_LETTER_MAX {
            return Err(ValidationError::CoverLetterLength {
                min: COVER_LETTER_MIN,
                max: COVER_LETTER_MAX,
            });
        }
        if self.proposed_price == 0 {
            return Err(ValidationError::ProposedPriceZero);
        }
        Ok(())
    }
}

/// Transition failures raised by the application state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationError {
    #[error("application is already {current}, required: {required}")]
    InvalidTransition {
        current: &'static str,
        required: &'static str,
    },
}

/// One student's bid on one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub project: ProjectId,
    pub student: StudentId,
    pub company: CompanyId,

    pub cover_letter: String,
    pub proposed_price: u64,
    pub estimated_time: EstimatedTime,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub snapshot: StudentSnapshot,

    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub shortlisted_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    pub fn new(
        id: ApplicationId,
        project: ProjectId,
        student: StudentId,
        company: CompanyId,
        draft: ApplicationDraft,
        snapshot: StudentSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project,
            student,
            company,
            cover_letter: draft.cover_letter.trim().to_string(),
            proposed_price: draft.proposed_price,
            estimated_time: draft.estimated_time,
            status: ApplicationStatus::Pending,
            rejection_reason: None,
            snapshot,
            applied_at: now,
            reviewed_at: None,
            shortlisted_at: None,
            accepted_at: None,
            rejected_at: None,
            withdrawn_at: None,
        }
    }

    fn require_open(&self, required: &'static str) -> Result<(), ApplicationError> {
        if self.status.is_open_for_decision() {
            Ok(())
        } else {
            Err(ApplicationError::InvalidTransition {
                current: self.status.label(),
                required,
            })
        }
    }

    pub fn shortlist(&mut self, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        if self.status != ApplicationStatus::Pending {
            return Err(ApplicationError::InvalidTransition {
                current: self.status.label(),
                required: "pending",
            });
        }
        self.status = ApplicationStatus::Shortlisted;
        self.shortlisted_at = Some(now);
        self.reviewed_at = Some(now);
        Ok(())
    }

    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        self.require_open("pending or shortlisted")?;
        self.status = ApplicationStatus::Accepted;
        self.accepted_at = Some(now);
        self.reviewed_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        self.require_open("pending or shortlisted")?;
        self.status = ApplicationStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.rejected_at = Some(now);
        self.reviewed_at = Some(now);
        Ok(())
    }

    pub fn withdraw(&mut self, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        self.require_open("pending or shortlisted")?;
        self.status = ApplicationStatus::Withdrawn;
        self.withdrawn_at = Some(now);
        Ok(())
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            project_id: self.project.clone(),
            status: self.status.label(),
            proposed_price: self.proposed_price,
            rejection_reason: self.rejection_reason.clone(),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub project_id: ProjectId,
    pub status: &'static str,
    pub proposed_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Per-student application counts over non-withdrawn applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub pending: usize,
    pub shortlisted: usize,
    pub accepted: usize,
    pub rejected: usize,
}
