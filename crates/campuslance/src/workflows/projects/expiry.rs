use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::workflows::identity::ActorRole;
use crate::workflows::outbound::{dispatch, Notification, Notifier, RelatedEntity};
use crate::workflows::projects::domain::{ProjectId, UserId};
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

use super::applications::repository::ApplicationRepository;

/// Reason stamped on applications rejected by the expiry cascade.
pub const EXPIRY_REJECTION_REASON: &str = "Project closed - deadline expired";

/// Outcome summary of one sweep run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub projects_closed: usize,
    pub applications_rejected: usize,
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub project_id: ProjectId,
    pub error: String,
}

/// Scheduled job that force-closes open projects whose deadline elapsed
/// without an assignment, cascading rejection to their open applications.
///
/// Safe to re-run: already-closed projects drop out of the `open` filter,
/// and a failure on one project is recorded and skipped, never aborting the
/// rest of the sweep.
pub struct ExpirySweeper<P, A, N> {
    projects: Arc<P>,
    applications: Arc<A>,
    notifier: Arc<N>,
}

impl<P, A, N> ExpirySweeper<P, A, N>
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

    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, RepositoryError> {
        let expired = self.projects.expired_open(now)?;
        let mut report = SweepReport::default();

        for mut project in expired {
            let project_id = project.id.clone();
            if let Err(err) = project.close_expired(now) {
                // Raced with an assignment or another sweep; leave it alone.
                warn!(project = %project_id.0, %err, "expiry close skipped");
                continue;
            }

            let project = match self.projects.update(project) {
                Ok(updated) => updated,
                Err(err) => {
                    warn!(project = %project_id.0, %err, "expiry close write failed");
                    report.failures.push(SweepFailure {
                        project_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            report.projects_closed += 1;

            dispatch(
                self.notifier.as_ref(),
                Notification::new(
                    UserId(project.company.0.clone()),
                    ActorRole::Company,
                    format!(
                        "Your project \"{}\" was auto-closed because the deadline passed without an assignment",
                        project.title
                    ),
                    "project_auto_closed",
                    Some(RelatedEntity::Project(project.id.clone())),
                ),
            );

            let open_applications = match self.applications.open_for_project(&project.id) {
                Ok(applications) => applications,
                Err(err) => {
                    warn!(project = %project.id.0, %err, "expiry cascade lookup failed");
                    report.failures.push(SweepFailure {
                        project_id: project.id.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            for mut application in open_applications {
                if let Err(err) = application.reject(EXPIRY_REJECTION_REASON.to_string(), now) {
                    warn!(application = %application.id.0, %err, "expiry rejection skipped");
                    continue;
                }
                match self.applications.update(application) {
                    Ok(rejected) => {
                        report.applications_rejected += 1;
                        dispatch(
                            self.notifier.as_ref(),
                            Notification::new(
                                UserId(rejected.student.0.clone()),
                                ActorRole::Student,
                                format!(
                                    "The project \"{}\" you applied for was closed because its deadline expired",
                                    project.title
                                ),
                                "application_rejected",
                                Some(RelatedEntity::Application(rejected.id.clone())),
                            ),
                        );
                    }
                    Err(err) => {
                        warn!(project = %project.id.0, %err, "expiry rejection write failed");
                        report.failures.push(SweepFailure {
                            project_id: project.id.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            closed = report.projects_closed,
            rejected = report.applications_rejected,
            failures = report.failures.len(),
            "expiry sweep finished"
        );
        Ok(report)
    }
}
