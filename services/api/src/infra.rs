use std::collections::HashMap;
use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use campuslance::workflows::outbound::{
    AdminAudience, FileStore, FileStoreError, GatewayError, GatewayOrder, Notification, Notifier,
    NotifyError, PaymentGateway, StoredFileRef,
};
use campuslance::workflows::payments::{
    CompanySpend, EarningsLedger, PaymentId, PaymentRecord, PaymentRepository, PaymentStatus,
    StudentEarnings,
};
use campuslance::workflows::projects::applications::{
    ApplicationId, ApplicationRecord, ApplicationRepository,
};
use campuslance::workflows::projects::{
    CompanyId, ProjectId, ProjectRepository, ProjectStatus, RepositoryError, StudentId, UserId,
};
use campuslance::workflows::projects::record::ProjectRecord;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProjectRepository {
    records: Arc<Mutex<HashMap<ProjectId, ProjectRecord>>>,
}

impl ProjectRepository for InMemoryProjectRepository {
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
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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
pub(crate) struct InMemoryPaymentRepository {
    records: Arc<Mutex<HashMap<PaymentId, PaymentRecord>>>,
}

impl PaymentRepository for InMemoryPaymentRepository {
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
pub(crate) struct InMemoryEarningsLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl EarningsLedger for InMemoryEarningsLedger {
    fn add_pending(&self, student: &StudentId, net_amount: u64) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("ledger mutex poisoned");
        let earnings = guard.students.entry(student.clone()).or_default();
        earnings.pending_payments += net_amount;
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

/// Records every notification and echoes it to the log. Stands in for the
/// real push/email transport, which lives outside this service.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        debug!(
            user = %notification.user.0,
            kind = %notification.kind,
            "notification dispatched"
        );
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

/// Gateway stub keyed off environment configuration. Without credentials it
/// reports `NotConfigured`, which the payment flow degrades around by
/// persisting pending records with no correlation ids.
pub(crate) struct EnvPaymentGateway {
    key_secret: Option<String>,
    counter: Mutex<u64>,
}

impl EnvPaymentGateway {
    pub(crate) fn from_env() -> Self {
        Self {
            key_secret: env::var("GATEWAY_KEY_SECRET").ok().filter(|s| !s.is_empty()),
            counter: Mutex::new(0),
        }
    }

    pub(crate) fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            key_secret: Some(secret.into()),
            counter: Mutex::new(0),
        }
    }

    pub(crate) fn expected_signature(secret: &str, order_ref: &str, payment_ref: &str) -> String {
        format!("sig-{order_ref}-{payment_ref}-{secret}")
    }
}

impl PaymentGateway for EnvPaymentGateway {
    fn create_order(
        &self,
        amount: u64,
        project: &ProjectId,
        _student: &StudentId,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.key_secret.is_none() {
            return Err(GatewayError::NotConfigured);
        }
        let mut counter = self.counter.lock().expect("gateway mutex poisoned");
        *counter += 1;
        Ok(GatewayOrder {
            order_ref: format!("order-{}-{}-{amount}", project.0, counter),
            currency: "INR".to_string(),
        })
    }

    fn verify_signature(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<bool, GatewayError> {
        let secret = self.key_secret.as_deref().ok_or(GatewayError::NotConfigured)?;
        Ok(signature == Self::expected_signature(secret, order_ref, payment_ref))
    }
}

/// File store stub: keeps nothing, hands back deterministic references the
/// way the CDN adapter would.
#[derive(Default, Clone)]
pub(crate) struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn store(
        &self,
        name: &str,
        _content: &[u8],
        folder: &str,
    ) -> Result<StoredFileRef, FileStoreError> {
        let public_id = format!("{folder}/{name}");
        Ok(StoredFileRef {
            url: format!("https://cdn.campuslance.local/{public_id}"),
            public_id,
        })
    }
}

/// Admin recipients come from configuration, never from a "first user with
/// role=admin" query.
pub(crate) fn admin_audience_from_env() -> AdminAudience {
    let recipients = env::var("ADMIN_USER_IDS")
        .unwrap_or_else(|_| "admin-ops".to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| UserId(s.to_string()))
        .collect();
    AdminAudience::new(recipients)
}
