//! Project publication, assignment, and delivery workflows.

pub mod applications;
pub mod catalog;
pub mod domain;
pub mod expiry;
pub mod record;
pub mod repository;
pub mod router;
pub mod submissions;

pub use catalog::{CatalogError, ProjectCatalog};
pub use domain::{
    CompanyId, ProjectCategory, ProjectDraft, ProjectDuration, ProjectId, ProjectStatus,
    StudentId, Submission, SubmissionStatus, UserId, ValidationError,
};
pub use expiry::{ExpirySweeper, SweepReport};
pub use record::{ProjectError, ProjectRecord};
pub use repository::{ProjectRepository, RepositoryError};
pub use router::project_router;
