use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::workflows::identity::{ActorContext, ActorRole};
use crate::workflows::outbound::{dispatch, Notification, Notifier, RelatedEntity};
use crate::workflows::projects::domain::{
    CompanyId, ProjectId, ProjectStatus, StudentId, UserId, ValidationError,
};
use crate::workflows::projects::record::{ProjectError, ProjectRecord};
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

use super::domain::{
    ApplicationDraft, ApplicationError, ApplicationId, ApplicationRecord, ApplicationStats,
    StudentSnapshot,
};
use super::repository::{stats_for, ApplicationRepository};

/// Reason stamped on competing applications when one is accepted.
pub const COMPETING_REJECTION_REASON: &str =
    "Another candidate has been selected for this project";

const REJECTION_REASON_MIN: usize = 10;
const REJECTION_REASON_MAX: usize = 500;

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Coordinates the application lifecycle: intake, shortlisting, and the
/// accept-one/reject-the-rest selection decision.
pub struct SelectionCoordinator<P, A, N> {
    projects: Arc<P>,
    applications: Arc<A>,
    notifier: Arc<N>,
}

impl<P, A, N> SelectionCoordinator<P, A, N>
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(projects: Arc<P>, applications: Arc<A>, notifier: Arc<N>) -> Self {
        Self {
            projects,
            applications,
            notifier,
        }
    }

    /// Submit a new application for an open project.
    ///
    /// The snapshot carries the student's display data as the profile
    /// service reported it at apply time; it is stored verbatim.
    pub fn apply(
        &self,
        student: StudentId,
        project_id: &ProjectId,
        draft: ApplicationDraft,
        snapshot: StudentSnapshot,
    ) -> Result<ApplicationRecord, SelectionError> {
        draft.validate()?;

        let project = self
            .projects
            .fetch(project_id)?
            .ok_or(SelectionError::ProjectNotFound)?;
        if project.status != ProjectStatus::Open {
            return Err(SelectionError::ProjectNotOpen {
                current: project.status.label(),
            });
        }

        if self
            .applications
            .active_for(&student, project_id)?
            .is_some()
        {
            return Err(SelectionError::AlreadyApplied);
        }

        let now = Utc::now();
        let record = ApplicationRecord::new(
            next_application_id(),
            project_id.clone(),
            student,
            project.company.clone(),
            draft,
            snapshot,
            now,
        );
        let stored = self.applications.insert(record)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                company_user(&project.company),
                ActorRole::Company,
                format!("New application received for \"{}\"", project.title),
                "application_received",
                Some(RelatedEntity::Application(stored.id.clone())),
            ),
        );

        Ok(stored)
    }

    /// Move a pending application onto the shortlist.
    pub fn shortlist(
        &self,
        application_id: &ApplicationId,
        actor: &ActorContext,
    ) -> Result<ApplicationRecord, SelectionError> {
        let mut application = self.load(application_id)?;
        let project = self.owned_project(&application.project, actor)?;

        application.shortlist(Utc::now())?;
        let stored = self.applications.update(application)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                student_user(&stored.student),
                ActorRole::Student,
                format!(
                    "Congratulations! Your application for \"{}\" has been shortlisted",
                    project.title
                ),
                "application_shortlisted",
                Some(RelatedEntity::Application(stored.id.clone())),
            ),
        );

        Ok(stored)
    }

    /// Accept one application and reject every competing one.
    ///
    /// The project write claims the assignment through the repository's
    /// version check, so a concurrent approval of a sibling application
    /// trips `Conflict` before any application record changes.
    pub fn approve(
        &self,
        application_id: &ApplicationId,
        actor: &ActorContext,
    ) -> Result<ApplicationRecord, SelectionError> {
        let mut application = self.load(application_id)?;
        let mut project = self.owned_project(&application.project, actor)?;

        if !application.status.is_open_for_decision() {
            return Err(SelectionError::Application(
                ApplicationError::InvalidTransition {
                    current: application.status.label(),
                    required: "pending or shortlisted",
                },
            ));
        }
        if project.assigned_student.is_some() {
            return Err(SelectionError::ProjectAssigned);
        }

        let now = Utc::now();
        project.assign_to(application.student.clone())?;
        let project = self.projects.update(project)?;

        application.accept(now)?;
        let winner = self.applications.update(application)?;

        let mut rejected = Vec::new();
        for mut competitor in self.applications.open_for_project(&winner.project)? {
            if competitor.id == winner.id {
                continue;
            }
            competitor.reject(COMPETING_REJECTION_REASON.to_string(), now)?;
            rejected.push(self.applications.update(competitor)?);
        }

        info!(
            project = %project.id.0,
            winner = %winner.id.0,
            rejected = rejected.len(),
            "project assigned"
        );

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                student_user(&winner.student),
                ActorRole::Student,
                format!(
                    "Your application has been accepted. You are assigned to \"{}\"",
                    project.title
                ),
                "application_accepted",
                Some(RelatedEntity::Application(winner.id.clone())),
            ),
        );
        for loser in &rejected {
            dispatch(
                self.notifier.as_ref(),
                Notification::new(
                    student_user(&loser.student),
                    ActorRole::Student,
                    format!(
                        "Your application was not selected for \"{}\"",
                        project.title
                    ),
                    "application_rejected",
                    Some(RelatedEntity::Application(loser.id.clone())),
                ),
            );
        }
        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                company_user(&project.company),
                ActorRole::Company,
                format!(
                    "Project \"{}\" assigned to {}",
                    project.title, winner.snapshot.name
                ),
                "project_assigned",
                Some(RelatedEntity::Project(project.id.clone())),
            ),
        );

        Ok(winner)
    }

    /// Reject a single application with a company-supplied reason.
    pub fn reject(
        &self,
        application_id: &ApplicationId,
        actor: &ActorContext,
        reason: String,
    ) -> Result<ApplicationRecord, SelectionError> {
        let trimmed = reason.trim();
        if trimmed.len() < REJECTION_REASON_MIN || trimmed.len() > REJECTION_REASON_MAX {
            return Err(SelectionError::Validation(ValidationError::ReasonLength {
                field: "rejection reason",
                min: REJECTION_REASON_MIN,
                max: REJECTION_REASON_MAX,
            }));
        }

        let mut application = self.load(application_id)?;
        let project = self.owned_project(&application.project, actor)?;

        application.reject(trimmed.to_string(), Utc::now())?;
        let stored = self.applications.update(application)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                student_user(&stored.student),
                ActorRole::Student,
                format!(
                    "Your application for \"{}\" has been rejected. Reason: {trimmed}",
                    project.title
                ),
                "application_rejected",
                Some(RelatedEntity::Application(stored.id.clone())),
            ),
        );

        Ok(stored)
    }

    /// Student pulls an application back, freeing the reapply slot.
    pub fn withdraw(
        &self,
        application_id: &ApplicationId,
        actor: &ActorContext,
    ) -> Result<ApplicationRecord, SelectionError> {
        let mut application = self.load(application_id)?;
        let student = actor.as_student().ok_or(SelectionError::Forbidden)?;
        if application.student != student {
            return Err(SelectionError::Forbidden);
        }

        application.withdraw(Utc::now())?;
        Ok(self.applications.update(application)?)
    }

    /// Fetch one application; visible to its student, the owning company,
    /// and admins.
    pub fn get(
        &self,
        application_id: &ApplicationId,
        actor: &ActorContext,
    ) -> Result<ApplicationRecord, SelectionError> {
        let application = self.load(application_id)?;
        let allowed = actor.is_admin()
            || actor.as_student().as_ref() == Some(&application.student)
            || actor.as_company().as_ref() == Some(&application.company);
        if !allowed {
            return Err(SelectionError::Forbidden);
        }
        Ok(application)
    }

    /// All applications for one of the company's projects.
    pub fn for_project(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
    ) -> Result<Vec<ApplicationRecord>, SelectionError> {
        self.owned_project(project_id, actor)?;
        Ok(self.applications.for_project(project_id)?)
    }

    /// Dashboard counts for the calling student.
    pub fn stats(&self, actor: &ActorContext) -> Result<ApplicationStats, SelectionError> {
        let student = actor.as_student().ok_or(SelectionError::Forbidden)?;
        let records = self.applications.for_student(&student)?;
        Ok(stats_for(&records))
    }

    fn load(&self, id: &ApplicationId) -> Result<ApplicationRecord, SelectionError> {
        self.applications
            .fetch(id)?
            .ok_or(SelectionError::ApplicationNotFound)
    }

    fn owned_project(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
    ) -> Result<ProjectRecord, SelectionError> {
        let project = self
            .projects
            .fetch(project_id)?
            .ok_or(SelectionError::ProjectNotFound)?;
        let company = actor.as_company().ok_or(SelectionError::Forbidden)?;
        if project.company != company {
            return Err(SelectionError::Forbidden);
        }
        Ok(project)
    }
}

/// User-level ids mirror the profile ids in this deployment; the identity
/// provider guarantees the mapping.
fn student_user(student: &StudentId) -> UserId {
    UserId(student.0.clone())
}

fn company_user(company: &CompanyId) -> UserId {
    UserId(company.0.clone())
}

/// Error raised by the selection coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("application not found")]
    ApplicationNotFound,
    #[error("project not found")]
    ProjectNotFound,
    #[error("actor does not own this project")]
    Forbidden,
    #[error("an active application for this project already exists")]
    AlreadyApplied,
    #[error("project is not accepting applications (current status: {current})")]
    ProjectNotOpen { current: &'static str },
    #[error("this project has already been assigned to a student")]
    ProjectAssigned,
    #[error("assignment raced with a concurrent selection, retry with fresh state")]
    Conflict,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SelectionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::ApplicationNotFound,
            other => Self::Repository(other),
        }
    }
}
