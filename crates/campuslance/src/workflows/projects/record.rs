use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::outbound::StoredFileRef;
use crate::workflows::payments::domain::PaymentStatus;

use super::domain::{
    CompanyId, CurrentSubmission, PaymentId, ProjectCategory, ProjectDraft, ProjectDuration,
    ProjectId, ProjectStatus, RevisionEntry, StudentId, Submission, SubmissionStatus, UserId,
    ValidationError,
};

/// Reason recorded when the expiry sweep closes an unassigned project.
pub const EXPIRY_CLOSE_REASON: &str = "Deadline passed without assignment";

/// Transition failures raised by the project state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("operation not allowed. Current status: {current}, required: {required}")]
    InvalidTransition {
        current: &'static str,
        required: &'static str,
    },
    #[error("revision limit reached ({limit} allowed)")]
    RevisionLimitExceeded { limit: u32 },
    #[error("revision budget not exhausted yet ({used} of {limit} used)")]
    RevisionBudgetRemaining { used: u32, limit: u32 },
    #[error("project is already assigned to a student")]
    AlreadyAssigned,
    #[error("project already has a linked payment")]
    PaymentAlreadyLinked,
}

/// Aggregate root for one published project.
///
/// All workflow mutations go through the guarded methods below; callers
/// persist the record through a version-checked repository write so that
/// concurrent transitions surface as conflicts instead of lost updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub company: CompanyId,

    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub required_skills: Vec<String>,
    pub budget_min: u64,
    pub budget_max: u64,
    pub duration: ProjectDuration,
    pub deadline: DateTime<Utc>,

    pub status: ProjectStatus,
    pub assigned_student: Option<StudentId>,
    pub submissions: Vec<Submission>,
    pub current_submission: Option<CurrentSubmission>,
    pub revision_count: u32,
    pub max_revisions_allowed: u32,
    pub revision_history: Vec<RevisionEntry>,

    /// Mirror of the payment record's status; the payment record is
    /// authoritative.
    pub payment_status: Option<PaymentStatus>,
    pub payment: Option<PaymentId>,
    pub payment_amount: Option<u64>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_reason: Option<String>,

    /// Optimistic-concurrency token bumped by the repository on every write.
    pub version: u64,
}

/// Student-delivered payload for one submission, attachments already stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionInput {
    pub files: Vec<StoredFileRef>,
    pub links: Vec<String>,
    pub message: String,
}

impl ProjectRecord {
    pub fn create(
        id: ProjectId,
        company: CompanyId,
        draft: ProjectDraft,
        max_revisions_allowed: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        draft.validate(now)?;

        Ok(Self {
            id,
            company,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category,
            required_skills: draft
                .required_skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            budget_min: draft.budget_min,
            budget_max: draft.budget_max,
            duration: draft.duration,
            deadline: draft.deadline,
            status: ProjectStatus::Open,
            assigned_student: None,
            submissions: Vec::new(),
            current_submission: None,
            revision_count: 0,
            max_revisions_allowed,
            revision_history: Vec::new(),
            payment_status: None,
            payment: None,
            payment_amount: None,
            created_at: now,
            started_at: None,
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            completed_at: None,
            closed_at: None,
            closed_reason: None,
            version: 1,
        })
    }

    fn require_status(
        &self,
        required: ProjectStatus,
        required_label: &'static str,
    ) -> Result<(), ProjectError> {
        if self.status == required {
            Ok(())
        } else {
            Err(ProjectError::InvalidTransition {
                current: self.status.label(),
                required: required_label,
            })
        }
    }

    /// Hand the project to the selected student. Selection is the only caller.
    pub fn assign_to(&mut self, student: StudentId) -> Result<(), ProjectError> {
        self.require_status(ProjectStatus::Open, "open")?;
        if self.assigned_student.is_some() {
            return Err(ProjectError::AlreadyAssigned);
        }
        self.assigned_student = Some(student);
        self.status = ProjectStatus::Assigned;
        Ok(())
    }

    pub fn start_work(&mut self, now: DateTime<Utc>) -> Result<(), ProjectError> {
        self.require_status(ProjectStatus::Assigned, "assigned")?;
        self.status = ProjectStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Append a new submission and move the project under review.
    ///
    /// Versions are assigned from the submission count and never reused; the
    /// submission id is derived from the project id and version so it stays
    /// stable without a global sequence.
    pub fn submit_work(
        &mut self,
        input: SubmissionInput,
        submitted_by: StudentId,
        now: DateTime<Utc>,
    ) -> Result<Submission, ProjectError> {
        if !matches!(
            self.status,
            ProjectStatus::InProgress | ProjectStatus::RevisionRequested
        ) {
            return Err(ProjectError::InvalidTransition {
                current: self.status.label(),
                required: "in-progress or revision-requested",
            });
        }

        let version = self.submissions.len() as u32 + 1;
        let submission = Submission {
            id: format!("{}-v{}", self.id.0, version),
            version,
            files: input.files,
            links: input.links,
            message: input.message,
            submitted_by,
            submitted_at: now,
            status: SubmissionStatus::Submitted,
            reviewed_at: None,
            reviewed_by: None,
            feedback: None,
        };

        self.current_submission = Some(CurrentSubmission {
            version,
            submission_id: submission.id.clone(),
            status: SubmissionStatus::Submitted,
        });
        self.submissions.push(submission.clone());
        self.status = ProjectStatus::UnderReview;
        self.submitted_at = Some(now);

        Ok(submission)
    }

    /// Approve the submission under review, completing the project.
    pub fn approve_work(
        &mut self,
        reviewer: UserId,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Submission, ProjectError> {
        self.require_status(ProjectStatus::UnderReview, "under-review")?;

        let submission = self.review_current(SubmissionStatus::Approved, reviewer, feedback, now)?;

        self.status = ProjectStatus::Completed;
        self.reviewed_at = Some(now);
        self.approved_at = Some(now);
        self.completed_at = Some(now);

        Ok(submission)
    }

    /// Send the current submission back for another iteration.
    pub fn request_revision(
        &mut self,
        reviewer: UserId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), ProjectError> {
        self.require_status(ProjectStatus::UnderReview, "under-review")?;
        if self.revision_count >= self.max_revisions_allowed {
            return Err(ProjectError::RevisionLimitExceeded {
                limit: self.max_revisions_allowed,
            });
        }

        let submission = self.review_current(
            SubmissionStatus::RevisionRequested,
            reviewer.clone(),
            Some(reason.clone()),
            now,
        )?;
        let version = submission.version;

        self.revision_count += 1;
        self.revision_history.push(RevisionEntry {
            submission_version: version,
            requested_by: reviewer,
            reason,
            requested_at: now,
        });
        self.status = ProjectStatus::RevisionRequested;
        self.reviewed_at = Some(now);
        Ok(())
    }

    /// Reject the work outright, moving the project into dispute. Only
    /// permitted once the revision budget is exhausted.
    pub fn reject_work(
        &mut self,
        reviewer: UserId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), ProjectError> {
        self.require_status(ProjectStatus::UnderReview, "under-review")?;
        if self.revision_count < self.max_revisions_allowed {
            return Err(ProjectError::RevisionBudgetRemaining {
                used: self.revision_count,
                limit: self.max_revisions_allowed,
            });
        }

        self.review_current(SubmissionStatus::Rejected, reviewer, Some(reason), now)?;
        self.status = ProjectStatus::Disputed;
        self.reviewed_at = Some(now);
        Ok(())
    }

    fn review_current(
        &mut self,
        status: SubmissionStatus,
        reviewer: UserId,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Submission, ProjectError> {
        let pointer = self
            .current_submission
            .as_mut()
            .ok_or(ProjectError::InvalidTransition {
                current: "no submission",
                required: "under-review",
            })?;
        pointer.status = status;
        let version = pointer.version;

        let submission = self
            .submissions
            .iter_mut()
            .find(|s| s.version == version)
            .ok_or(ProjectError::InvalidTransition {
                current: "no submission",
                required: "under-review",
            })?;
        submission.status = status;
        submission.reviewed_at = Some(now);
        submission.reviewed_by = Some(reviewer);
        submission.feedback = feedback;
        Ok(submission.clone())
    }

    /// Expiry sweep: close an open project whose deadline passed unassigned.
    pub fn close_expired(&mut self, now: DateTime<Utc>) -> Result<(), ProjectError> {
        self.require_status(ProjectStatus::Open, "open")?;
        if self.assigned_student.is_some() {
            return Err(ProjectError::AlreadyAssigned);
        }
        self.status = ProjectStatus::Closed;
        self.closed_at = Some(now);
        self.closed_reason = Some(EXPIRY_CLOSE_REASON.to_string());
        Ok(())
    }

    /// Company-initiated cancellation before any work is delivered.
    pub fn cancel(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), ProjectError> {
        if !matches!(self.status, ProjectStatus::Open | ProjectStatus::Assigned) {
            return Err(ProjectError::InvalidTransition {
                current: self.status.label(),
                required: "open or assigned",
            });
        }
        self.status = ProjectStatus::Cancelled;
        self.closed_at = Some(now);
        self.closed_reason = Some(reason);
        Ok(())
    }

    /// Record the 1:1 payment link. Set exactly once.
    pub fn link_payment(&mut self, payment: PaymentId, amount: u64) -> Result<(), ProjectError> {
        if self.payment.is_some() {
            return Err(ProjectError::PaymentAlreadyLinked);
        }
        self.payment = Some(payment);
        self.payment_amount = Some(amount);
        Ok(())
    }

    /// Keep the denormalized payment mirror in step with the payment record.
    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = Some(status);
    }

    /// Release forces completion even when review bookkeeping lagged behind.
    pub fn force_complete(&mut self, now: DateTime<Utc>) {
        if self.status != ProjectStatus::Completed {
            self.status = ProjectStatus::Completed;
        }
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }

    /// Amount the payment flow should settle: explicit order amount first,
    /// then the budget ceiling, then the floor.
    pub fn settlement_amount(&self) -> u64 {
        self.payment_amount
            .or(if self.budget_max > 0 {
                Some(self.budget_max)
            } else {
                None
            })
            .unwrap_or(self.budget_min)
    }
}
