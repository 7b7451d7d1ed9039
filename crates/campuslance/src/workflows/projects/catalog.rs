use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::workflows::identity::ActorContext;
use crate::workflows::projects::domain::{ProjectDraft, ProjectId, ValidationError};
use crate::workflows::projects::record::{ProjectError, ProjectRecord};
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

const CANCEL_REASON_MIN: usize = 10;
const CANCEL_REASON_MAX: usize = 500;

static PROJECT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_project_id() -> ProjectId {
    let id = PROJECT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProjectId(format!("proj-{id:06}"))
}

/// Company-facing project publication and management.
pub struct ProjectCatalog<P> {
    projects: Arc<P>,
    default_max_revisions: u32,
}

impl<P> ProjectCatalog<P>
where
    P: ProjectRepository + 'static,
{
    pub fn new(projects: Arc<P>, default_max_revisions: u32) -> Self {
        Self {
            projects,
            default_max_revisions,
        }
    }

    /// Publish a new project in the open state.
    pub fn create(
        &self,
        actor: &ActorContext,
        draft: ProjectDraft,
    ) -> Result<ProjectRecord, CatalogError> {
        let company = actor.as_company().ok_or(CatalogError::Forbidden)?;

        let record = ProjectRecord::create(
            next_project_id(),
            company,
            draft,
            self.default_max_revisions,
            Utc::now(),
        )?;
        let stored = self.projects.insert(record)?;
        info!(project = %stored.id.0, "project published");
        Ok(stored)
    }

    /// Public read of one project.
    pub fn get(&self, project_id: &ProjectId) -> Result<ProjectRecord, CatalogError> {
        self.projects
            .fetch(project_id)?
            .ok_or(CatalogError::NotFound)
    }

    /// The open project board.
    pub fn open_projects(&self) -> Result<Vec<ProjectRecord>, CatalogError> {
        let mut projects = self.projects.open()?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    /// Company withdraws a project before any work is delivered.
    pub fn cancel(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        reason: String,
    ) -> Result<ProjectRecord, CatalogError> {
        let trimmed = reason.trim();
        if trimmed.len() < CANCEL_REASON_MIN || trimmed.len() > CANCEL_REASON_MAX {
            return Err(CatalogError::Validation(ValidationError::ReasonLength {
                field: "cancellation reason",
                min: CANCEL_REASON_MIN,
                max: CANCEL_REASON_MAX,
            }));
        }

        let mut project = self.get(project_id)?;
        let company = actor.as_company().ok_or(CatalogError::Forbidden)?;
        if project.company != company {
            return Err(CatalogError::Forbidden);
        }

        project.cancel(trimmed.to_string(), Utc::now())?;
        Ok(self.projects.update(project)?)
    }
}

/// Error raised by the project catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("project not found")]
    NotFound,
    #[error("actor does not own this project")]
    Forbidden,
    #[error("project changed concurrently, retry with fresh state")]
    Conflict,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
