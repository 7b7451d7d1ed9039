use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::workflows::identity::{ActorContext, ActorRole};
use crate::workflows::outbound::{
    dispatch, AdminAudience, FileStore, FileStoreError, Notification, Notifier, PaymentGateway,
    RelatedEntity, StoredFileRef,
};
use crate::workflows::payments::coordinator::PaymentCoordinator;
use crate::workflows::payments::repository::{EarningsLedger, PaymentRepository};
use crate::workflows::projects::domain::{
    CurrentSubmission, ProjectId, ProjectStatus, RevisionEntry, Submission, UserId,
    ValidationError,
};
use crate::workflows::projects::record::{ProjectError, ProjectRecord, SubmissionInput};
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

const REVIEW_REASON_MIN: usize = 10;
const REVIEW_REASON_MAX: usize = 2000;
const MESSAGE_MAX: usize = 2000;
const MAX_FILES: usize = 10;

/// Raw attachment handed in by the client; stored before the submission is
/// appended so the domain record only ever holds references.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub name: String,
    pub content: Vec<u8>,
}

/// Student-delivered work payload.
#[derive(Debug, Clone, Default)]
pub struct WorkSubmission {
    pub attachments: Vec<AttachmentUpload>,
    pub links: Vec<String>,
    pub message: String,
}

/// Review-side role of an actor inside a project workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkspaceRole {
    Student,
    Company,
    Admin,
}

/// Full submission history plus revision bookkeeping for the workspace view.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionHistoryView {
    pub submissions: Vec<Submission>,
    pub revision_history: Vec<RevisionEntry>,
    pub revision_count: u32,
    pub max_revisions_allowed: u32,
    pub current_submission: Option<CurrentSubmission>,
}

/// The submission under review plus the actions the caller may take on it.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubmissionView {
    pub submission: Option<Submission>,
    pub can_request_revision: bool,
    pub can_approve: bool,
    pub can_resubmit: bool,
}

/// Coordinates the submit → review → (approve | revision | reject) cycle.
/// Approval hands off to the payment coordinator for escrow settlement.
pub struct WorkSubmissionCoordinator<P, Y, G, L, N, F> {
    projects: Arc<P>,
    payments: Arc<PaymentCoordinator<P, Y, G, L, N>>,
    files: Arc<F>,
    notifier: Arc<N>,
    admins: AdminAudience,
}

impl<P, Y, G, L, N, F> WorkSubmissionCoordinator<P, Y, G, L, N, F>
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    pub fn new(
        projects: Arc<P>,
        payments: Arc<PaymentCoordinator<P, Y, G, L, N>>,
        files: Arc<F>,
        notifier: Arc<N>,
        admins: AdminAudience,
    ) -> Self {
        Self {
            projects,
            payments,
            files,
            notifier,
            admins,
        }
    }

    /// Assigned student begins work.
    pub fn start_work(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
    ) -> Result<ProjectRecord, SubmissionError> {
        let mut project = self.load(project_id)?;
        self.require_role(&project, actor, WorkspaceRole::Student)?;

        project.start_work(Utc::now())?;
        let project = self.projects.update(project)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(project.company.0.clone()),
                ActorRole::Company,
                format!("Student has started work on \"{}\"", project.title),
                "project_started",
                Some(RelatedEntity::Project(project.id.clone())),
            ),
        );

        Ok(project)
    }

    /// Assigned student delivers a new iteration of the work.
    pub fn submit_work(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        payload: WorkSubmission,
    ) -> Result<(ProjectRecord, Submission), SubmissionError> {
        let mut project = self.load(project_id)?;
        self.require_role(&project, actor, WorkspaceRole::Student)?;

        if payload.attachments.is_empty() && payload.links.is_empty() {
            return Err(ValidationError::EmptySubmission.into());
        }
        if payload.attachments.len() > MAX_FILES {
            return Err(ValidationError::TooManyFiles {
                found: payload.attachments.len(),
                max: MAX_FILES,
            }
            .into());
        }

        // Store attachments before touching the record; an upload failure
        // leaves the project exactly as it was.
        let mut files: Vec<StoredFileRef> = Vec::with_capacity(payload.attachments.len());
        let folder = format!("work/{}", project.id.0);
        for attachment in &payload.attachments {
            files.push(
                self.files
                    .store(&attachment.name, &attachment.content, &folder)
                    .map_err(SubmissionError::FileStore)?,
            );
        }

        let mut message = payload.message;
        message.truncate(MESSAGE_MAX);

        let student = project
            .assigned_student
            .clone()
            .ok_or(SubmissionError::Forbidden)?;
        let submission = project.submit_work(
            SubmissionInput {
                files,
                links: payload.links,
                message,
            },
            student,
            Utc::now(),
        )?;
        let project = self.projects.update(project)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(project.company.0.clone()),
                ActorRole::Company,
                format!(
                    "Work submitted for \"{}\" (version {})",
                    project.title, submission.version
                ),
                "work_submitted",
                Some(RelatedEntity::Project(project.id.clone())),
            ),
        );

        Ok((project, submission))
    }

    /// Company approves the submission under review; the project completes
    /// and the escrow settles.
    pub fn approve_work(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        feedback: Option<String>,
    ) -> Result<(ProjectRecord, Submission), SubmissionError> {
        let mut project = self.load(project_id)?;
        self.require_role(&project, actor, WorkspaceRole::Company)?;

        let feedback = feedback.map(|mut text| {
            text.truncate(REVIEW_REASON_MAX);
            text
        });
        let submission = project.approve_work(actor.id.clone(), feedback, Utc::now())?;
        let mut project = self.projects.update(project)?;

        // Settlement failure never rolls back an approval that already
        // persisted; admins get pinged to reconcile by hand.
        match self.payments.settle_approval(project.clone(), &actor.id) {
            Ok((settled, _payment)) => project = settled,
            Err(err) => {
                warn!(project = %project.id.0, %err, "payment settlement failed after approval");
                self.admins.broadcast(
                    self.notifier.as_ref(),
                    &format!(
                        "Payment settlement failed for project {}: {err}",
                        project.title
                    ),
                    "payment_error",
                    Some(RelatedEntity::Project(project.id.clone())),
                );
            }
        }

        if let Some(student) = project.assigned_student.clone() {
            dispatch(
                self.notifier.as_ref(),
                Notification::new(
                    UserId(student.0),
                    ActorRole::Student,
                    format!(
                        "Your submission for \"{}\" has been approved. The project is complete",
                        project.title
                    ),
                    "work_approved",
                    Some(RelatedEntity::Project(project.id.clone())),
                ),
            );
        }
        self.admins.broadcast(
            self.notifier.as_ref(),
            &format!("Work approved and project completed: {}", project.title),
            "work_approved",
            Some(RelatedEntity::Project(project.id.clone())),
        );

        Ok((project, submission))
    }

    /// Company sends the current submission back for rework.
    pub fn request_revision(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        reason: String,
    ) -> Result<ProjectRecord, SubmissionError> {
        let reason = validate_reason(reason, "revision reason")?;

        let mut project = self.load(project_id)?;
        self.require_role(&project, actor, WorkspaceRole::Company)?;

        project.request_revision(actor.id.clone(), reason, Utc::now())?;
        let project = self.projects.update(project)?;

        if let Some(student) = project.assigned_student.clone() {
            dispatch(
                self.notifier.as_ref(),
                Notification::new(
                    UserId(student.0),
                    ActorRole::Student,
                    format!(
                        "A revision has been requested on your submission for \"{}\"",
                        project.title
                    ),
                    "revision_requested",
                    Some(RelatedEntity::Project(project.id.clone())),
                ),
            );
        }

        Ok(project)
    }

    /// Company rejects the work outright once the revision budget is spent.
    pub fn reject_work(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        reason: String,
    ) -> Result<ProjectRecord, SubmissionError> {
        let reason = validate_reason(reason, "rejection reason")?;

        let mut project = self.load(project_id)?;
        self.require_role(&project, actor, WorkspaceRole::Company)?;

        project.reject_work(actor.id.clone(), reason.clone(), Utc::now())?;
        let project = self.projects.update(project)?;

        if let Some(student) = project.assigned_student.clone() {
            dispatch(
                self.notifier.as_ref(),
                Notification::new(
                    UserId(student.0),
                    ActorRole::Student,
                    format!(
                        "Your submission for \"{}\" was rejected. Reason: {reason}",
                        project.title
                    ),
                    "work_rejected",
                    Some(RelatedEntity::Project(project.id.clone())),
                ),
            );
        }
        self.admins.broadcast(
            self.notifier.as_ref(),
            &format!("Work rejected for project {}", project.title),
            "work_rejected",
            Some(RelatedEntity::Project(project.id.clone())),
        );

        Ok(project)
    }

    /// Full submission history, newest first.
    pub fn submission_history(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
    ) -> Result<SubmissionHistoryView, SubmissionError> {
        let project = self.load(project_id)?;
        self.workspace_role(&project, actor)
            .ok_or(SubmissionError::Forbidden)?;

        let mut submissions = project.submissions.clone();
        submissions.sort_by(|a, b| b.version.cmp(&a.version));

        Ok(SubmissionHistoryView {
            submissions,
            revision_history: project.revision_history.clone(),
            revision_count: project.revision_count,
            max_revisions_allowed: project.max_revisions_allowed,
            current_submission: project.current_submission.clone(),
        })
    }

    /// The submission under review plus the caller's available actions.
    pub fn current_submission(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
    ) -> Result<CurrentSubmissionView, SubmissionError> {
        let project = self.load(project_id)?;
        let role = self
            .workspace_role(&project, actor)
            .ok_or(SubmissionError::Forbidden)?;

        let submission = project.current_submission.as_ref().and_then(|pointer| {
            project
                .submissions
                .iter()
                .find(|s| s.version == pointer.version)
                .cloned()
        });

        let is_company = role == WorkspaceRole::Company;
        let is_student = role == WorkspaceRole::Student;
        let under_review = project.status == ProjectStatus::UnderReview;

        Ok(CurrentSubmissionView {
            submission,
            can_request_revision: is_company
                && under_review
                && project.revision_count < project.max_revisions_allowed,
            can_approve: is_company && under_review,
            can_resubmit: is_student && project.status == ProjectStatus::RevisionRequested,
        })
    }

    fn load(&self, project_id: &ProjectId) -> Result<ProjectRecord, SubmissionError> {
        self.projects
            .fetch(project_id)?
            .ok_or(SubmissionError::ProjectNotFound)
    }

    fn workspace_role(
        &self,
        project: &ProjectRecord,
        actor: &ActorContext,
    ) -> Option<WorkspaceRole> {
        if actor.is_admin() {
            return Some(WorkspaceRole::Admin);
        }
        if let Some(student) = actor.as_student() {
            if project.assigned_student.as_ref() == Some(&student) {
                return Some(WorkspaceRole::Student);
            }
        }
        if let Some(company) = actor.as_company() {
            if project.company == company {
                return Some(WorkspaceRole::Company);
            }
        }
        None
    }

    fn require_role(
        &self,
        project: &ProjectRecord,
        actor: &ActorContext,
        required: WorkspaceRole,
    ) -> Result<(), SubmissionError> {
        match self.workspace_role(project, actor) {
            Some(role) if role == required => Ok(()),
            _ => Err(SubmissionError::Forbidden),
        }
    }
}

fn validate_reason(reason: String, field: &'static str) -> Result<String, SubmissionError> {
    let trimmed = reason.trim();
    if trimmed.len() < REVIEW_REASON_MIN || trimmed.len() > REVIEW_REASON_MAX {
        return Err(ValidationError::ReasonLength {
            field,
            min: REVIEW_REASON_MIN,
            max: REVIEW_REASON_MAX,
        }
        .into());
    }
    Ok(trimmed.to_string())
}

/// Error raised by the work submission coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("project not found")]
    ProjectNotFound,
    #[error("actor has no access to this project workspace")]
    Forbidden,
    #[error("project changed concurrently, retry with fresh state")]
    Conflict,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("attachment upload failed: {0}")]
    FileStore(FileStoreError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SubmissionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::ProjectNotFound,
            other => Self::Repository(other),
        }
    }
}
