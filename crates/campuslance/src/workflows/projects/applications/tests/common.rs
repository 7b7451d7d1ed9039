use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::workflows::outbound::{Notification, Notifier, NotifyError};
use crate::workflows::projects::applications::domain::{
    ApplicationDraft, ApplicationId, ApplicationRecord, ApplicationStatus, EstimatedTime,
    StudentSnapshot,
};
use crate::workflows::projects::applications::repository::ApplicationRepository;
use crate::workflows::projects::applications::router::application_router;
use crate::workflows::projects::applications::selection::SelectionCoordinator;
use crate::workflows::projects::domain::{
    CompanyId, ProjectCategory, ProjectDraft, ProjectDuration, ProjectId, ProjectStatus,
    StudentId,
};
use crate::workflows::projects::record::ProjectRecord;
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

pub(super) fn project_draft() -> ProjectDraft {
    ProjectDraft {
        title: "Realtime dashboard".to_string(),
        description: "Build a realtime analytics dashboard for our ops team.".to_string(),
        category: ProjectCategory::FullStack,
        required_skills: vec!["rust".to_string(), "typescript".to_string()],
        budget_min: 500,
        budget_max: 1000,
        duration: ProjectDuration::OneMonth,
        deadline: Utc::now() + Duration::days(30),
    }
}

pub(super) fn application_draft() -> ApplicationDraft {
    ApplicationDraft {
        cover_letter: "I have shipped three dashboards like this one and can start right away."
            .to_string(),
        proposed_price: 800,
        estimated_time: EstimatedTime::ThreeToFourWeeks,
    }
}

pub(super) fn snapshot(name: &str) -> StudentSnapshot {
    StudentSnapshot {
        name: name.to_string(),
        college: "State Engineering College".to_string(),
        city: "Pune".to_string(),
        skills: vec!["rust".to_string()],
        resume_url: Some(format!("https://files.local/resumes/{name}.pdf")),
        captured_at: Utc::now(),
    }
}

pub(super) fn company() -> CompanyId {
    CompanyId("co-1".to_string())
}

pub(super) fn seed_project(projects: &MemoryProjects) -> ProjectRecord {
    seed_project_for(projects, company())
}

pub(super) fn seed_project_for(projects: &MemoryProjects, company: CompanyId) -> ProjectRecord {
    static PROJECT_SEED: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
    let seq = PROJECT_SEED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let record = ProjectRecord::create(
        ProjectId(format!("seed-proj-{seq:04}")),
        company,
        project_draft(),
        2,
        Utc::now(),
    )
    .expect("valid draft");
    projects.insert(record).expect("seed project")
}

pub(super) type TestCoordinator =
    SelectionCoordinator<MemoryProjects, MemoryApplications, MemoryNotifier>;

pub(super) fn build_coordinator() -> (
    TestCoordinator,
    Arc<MemoryProjects>,
    Arc<MemoryApplications>,
    Arc<MemoryNotifier>,
) {
    let projects = Arc::new(MemoryProjects::default());
    let applications = Arc::new(MemoryApplications::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let coordinator =
        SelectionCoordinator::new(projects.clone(), applications.clone(), notifier.clone());
    (coordinator, projects, applications, notifier)
}

pub(super) fn router_with(coordinator: TestCoordinator) -> axum::Router {
    application_router(Arc::new(coordinator))
}

#[derive(Default, Clone)]
pub(super) struct MemoryProjects {
    records: Arc<Mutex<HashMap<ProjectId, ProjectRecord>>>,
}

impl ProjectRepository for MemoryProjects {
    fn insert(&self, record: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, mut record: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn open(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|p| p.status == ProjectStatus::Open)
            .cloned()
            .collect())
    }

    fn expired_open(&self, now: DateTime<Utc>) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|p| {
                p.status == ProjectStatus::Open
                    && p.deadline < now
                    && p.assigned_student.is_none()
            })
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplications {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active_for(
        &self,
        student: &StudentId,
        project: &ProjectId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|a| a.student == *student && a.project == *project && a.status.is_active())
            .cloned())
    }

    fn for_project(&self, project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|a| a.project == *project)
            .cloned()
            .collect())
    }

    fn open_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|a| a.project == *project && a.status.is_open_for_decision())
            .cloned()
            .collect())
    }

    fn for_student(&self, student: &StudentId) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|a| a.student == *student)
            .cloned()
            .collect())
    }
}

impl MemoryApplications {
    /// Force-store a record, bypassing invariants, for dormant-state tests.
    pub(super) fn put(&self, record: ApplicationRecord) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.id.clone(), record);
    }

    pub(super) fn statuses_for(&self, project: &ProjectId) -> Vec<ApplicationStatus> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .filter(|a| a.project == *project)
            .map(|a| a.status)
            .collect()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
