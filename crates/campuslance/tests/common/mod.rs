//! Shared in-memory collaborators for the integration suites. Each suite
//! compiles its own copy, so unused fixtures are expected.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use campuslance::workflows::outbound::{
    AdminAudience, FileStore, FileStoreError, GatewayError, GatewayOrder, Notification, Notifier,
    NotifyError, PaymentGateway, StoredFileRef,
};
use campuslance::workflows::payments::{
    CompanySpend, EarningsLedger, PaymentCoordinator, PaymentId, PaymentRecord, PaymentRepository,
    PaymentStatus, StudentEarnings,
};
use campuslance::workflows::projects::applications::{
    ApplicationDraft, ApplicationId, ApplicationRecord, ApplicationRepository, EstimatedTime,
    SelectionCoordinator, StudentSnapshot,
};
use campuslance::workflows::projects::record::ProjectRecord;
use campuslance::workflows::projects::submissions::{
    AttachmentUpload, WorkSubmission, WorkSubmissionCoordinator,
};
use campuslance::workflows::projects::{
    CompanyId, ProjectCatalog, ProjectCategory, ProjectDraft, ProjectDuration, ProjectId,
    ProjectRepository, ProjectStatus, RepositoryError, StudentId, UserId,
};

pub const FEE_PERCENT: u64 = 7;
pub const MAX_REVISIONS: u32 = 2;

#[derive(Default, Clone)]
pub struct MemoryProjects {
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
pub struct MemoryApplications {
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

#[derive(Default, Clone)]
pub struct MemoryPayments {
    records: Arc<Mutex<HashMap<PaymentId, PaymentRecord>>>,
}

impl MemoryPayments {
    pub fn count(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl PaymentRepository for MemoryPayments {
    fn insert(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_order(&self, order_ref: &str) -> Result<Option<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|p| p.gateway_order_id.as_deref() == Some(order_ref))
            .cloned())
    }

    fn find_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().find(|p| p.project == *project).cloned())
    }

    fn pending_releases(&self) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<PaymentRecord> = guard
            .values()
            .filter(|p| p.status == PaymentStatus::ReadyForRelease)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    fn released(&self) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|p| p.status == PaymentStatus::Released)
            .cloned()
            .collect())
    }

    fn for_student(&self, student: &StudentId) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|p| p.student == *student)
            .cloned()
            .collect())
    }

    fn for_company(&self, company: &CompanyId) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|p| p.company == *company)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct LedgerState {
    students: HashMap<StudentId, StudentEarnings>,
    companies: HashMap<CompanyId, CompanySpend>,
}

#[derive(Default, Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl EarningsLedger for MemoryLedger {
    fn add_pending(&self, student: &StudentId, net_amount: u64) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("ledger mutex poisoned");
        guard
            .students
            .entry(student.clone())
            .or_default()
            .pending_payments += net_amount;
        Ok(())
    }

    fn settle_release(
        &self,
        student: &StudentId,
        net_amount: u64,
        company: &CompanyId,
        gross_amount: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("ledger mutex poisoned");
        let earnings = guard.students.entry(student.clone()).or_default();
        earnings.pending_payments = earnings.pending_payments.saturating_sub(net_amount);
        earnings.total_earned += net_amount;
        earnings.completed_projects += 1;
        let spend = guard.companies.entry(company.clone()).or_default();
        spend.total_spent += gross_amount;
        spend.payments_made += 1;
        Ok(())
    }

    fn remove_pending(&self, student: &StudentId, amount: u64) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("ledger mutex poisoned");
        let earnings = guard.students.entry(student.clone()).or_default();
        earnings.pending_payments = earnings.pending_payments.saturating_sub(amount);
        Ok(())
    }

    fn student_earnings(&self, student: &StudentId) -> Result<StudentEarnings, RepositoryError> {
        let guard = self.state.lock().expect("ledger mutex poisoned");
        Ok(guard.students.get(student).copied().unwrap_or_default())
    }

    fn company_spend(&self, company: &CompanyId) -> Result<CompanySpend, RepositoryError> {
        let guard = self.state.lock().expect("ledger mutex poisoned");
        Ok(guard.companies.get(company).copied().unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<Mutex<bool>>,
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        if *self.fail.lock().expect("notifier mutex poisoned") {
            return Err(NotifyError::Transport("induced outage".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

impl MemoryNotifier {
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().expect("notifier mutex poisoned") = failing;
    }
}

/// Gateway double: `configured=false` behaves like missing credentials;
/// otherwise the literal signature "valid" verifies.
pub struct StubGateway {
    pub configured: bool,
}

impl PaymentGateway for StubGateway {
    fn create_order(
        &self,
        amount: u64,
        project: &ProjectId,
        _student: &StudentId,
    ) -> Result<GatewayOrder, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        Ok(GatewayOrder {
            order_ref: format!("order-{}-{amount}", project.0),
            currency: "INR".to_string(),
        })
    }

    fn verify_signature(
        &self,
        _order_ref: &str,
        _payment_ref: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        Ok(signature == "valid")
    }
}

#[derive(Default, Clone)]
pub struct MemoryFiles;

impl FileStore for MemoryFiles {
    fn store(
        &self,
        name: &str,
        _content: &[u8],
        folder: &str,
    ) -> Result<StoredFileRef, FileStoreError> {
        let public_id = format!("{folder}/{name}");
        Ok(StoredFileRef {
            url: format!("https://cdn.test/{public_id}"),
            public_id,
        })
    }
}

pub type Selection = SelectionCoordinator<MemoryProjects, MemoryApplications, MemoryNotifier>;
pub type Escrow =
    PaymentCoordinator<MemoryProjects, MemoryPayments, StubGateway, MemoryLedger, MemoryNotifier>;
pub type Workspace = WorkSubmissionCoordinator<
    MemoryProjects,
    MemoryPayments,
    StubGateway,
    MemoryLedger,
    MemoryNotifier,
    MemoryFiles,
>;

pub struct Stack {
    pub projects: Arc<MemoryProjects>,
    pub applications: Arc<MemoryApplications>,
    pub payments: Arc<MemoryPayments>,
    pub notifier: Arc<MemoryNotifier>,
    pub catalog: ProjectCatalog<MemoryProjects>,
    pub selection: Selection,
    pub escrow: Arc<Escrow>,
    pub workspace: Workspace,
}

pub fn build_stack(gateway_configured: bool) -> Stack {
    let projects = Arc::new(MemoryProjects::default());
    let applications = Arc::new(MemoryApplications::default());
    let payments = Arc::new(MemoryPayments::default());
    let ledger = Arc::new(MemoryLedger::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let gateway = Arc::new(StubGateway {
        configured: gateway_configured,
    });
    let files = Arc::new(MemoryFiles);
    let admins = AdminAudience::new(vec![UserId("admin-1".to_string())]);

    let catalog = ProjectCatalog::new(projects.clone(), MAX_REVISIONS);
    let selection =
        SelectionCoordinator::new(projects.clone(), applications.clone(), notifier.clone());
    let escrow = Arc::new(PaymentCoordinator::new(
        projects.clone(),
        payments.clone(),
        gateway,
        ledger,
        notifier.clone(),
        admins.clone(),
        FEE_PERCENT,
    ));
    let workspace = WorkSubmissionCoordinator::new(
        projects.clone(),
        escrow.clone(),
        files,
        notifier.clone(),
        admins,
    );

    Stack {
        projects,
        applications,
        payments,
        notifier,
        catalog,
        selection,
        escrow,
        workspace,
    }
}

pub fn draft() -> ProjectDraft {
    ProjectDraft {
        title: "Analytics pipeline".to_string(),
        description: "Build the ingestion and reporting pipeline.".to_string(),
        category: ProjectCategory::DataScience,
        required_skills: vec!["rust".to_string()],
        budget_min: 500,
        budget_max: 1000,
        duration: ProjectDuration::OneMonth,
        deadline: Utc::now() + Duration::days(30),
    }
}

pub fn application_draft() -> ApplicationDraft {
    ApplicationDraft {
        cover_letter: "I have shipped three comparable data pipelines and can start this week."
            .to_string(),
        proposed_price: 800,
        estimated_time: EstimatedTime::ThreeToFourWeeks,
    }
}

pub fn snapshot(name: &str) -> StudentSnapshot {
    StudentSnapshot {
        name: name.to_string(),
        college: "State Engineering College".to_string(),
        city: "Pune".to_string(),
        skills: vec!["rust".to_string()],
        resume_url: None,
        captured_at: Utc::now(),
    }
}

pub fn delivery(message: &str) -> WorkSubmission {
    WorkSubmission {
        attachments: vec![AttachmentUpload {
            name: "build.zip".to_string(),
            content: b"artifact".to_vec(),
        }],
        links: vec!["https://git.test/repo".to_string()],
        message: message.to_string(),
    }
}
