use chrono::{DateTime, Utc};

use super::domain::ProjectId;
use super::record::ProjectRecord;

/// Storage abstraction for project aggregates.
///
/// `update` is a compare-and-swap on `ProjectRecord::version`: when the
/// stored version differs from the one the caller read, the write fails with
/// `Conflict` and nothing is modified. Implementations bump the version on
/// every successful write and return the stored record.
pub trait ProjectRepository: Send + Sync {
    fn insert(&self, record: ProjectRecord) -> Result<ProjectRecord, RepositoryError>;
    fn update(&self, record: ProjectRecord) -> Result<ProjectRecord, RepositoryError>;
    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError>;
    /// Projects currently accepting applications.
    fn open(&self) -> Result<Vec<ProjectRecord>, RepositoryError>;
    /// Open projects whose deadline passed without an assignee.
    fn expired_open(&self, now: DateTime<Utc>) -> Result<Vec<ProjectRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
