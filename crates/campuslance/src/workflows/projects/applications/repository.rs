use crate::workflows::projects::domain::{ProjectId, StudentId};
use crate::workflows::projects::repository::RepositoryError;

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStats, ApplicationStatus};

/// Storage abstraction for application records.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;

    /// The student's non-withdrawn application for a project, if any.
    /// Backs the one-active-application-per-(student, project) invariant.
    fn active_for(
        &self,
        student: &StudentId,
        project: &ProjectId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;

    fn for_project(&self, project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError>;

    /// Applications still open for a company decision (pending/shortlisted).
    fn open_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;

    fn for_student(&self, student: &StudentId) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Aggregate counts for a student's dashboard.
pub fn stats_for(records: &[ApplicationRecord]) -> ApplicationStats {
    let mut stats = ApplicationStats::default();
    for record in records {
        if !record.status.is_active() {
            continue;
        }
        stats.total += 1;
        match record.status {
            ApplicationStatus::Pending => stats.pending += 1,
            ApplicationStatus::Shortlisted => stats.shortlisted += 1,
            ApplicationStatus::Accepted => stats.accepted += 1,
            ApplicationStatus::Rejected => stats.rejected += 1,
            _ => {}
        }
    }
    stats
}
