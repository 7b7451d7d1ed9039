use serde::{Deserialize, Serialize};

use crate::workflows::projects::domain::{CompanyId, ProjectId, StudentId};
use crate::workflows::projects::repository::RepositoryError;

use super::domain::{PaymentId, PaymentRecord};

/// Storage abstraction for payment records.
pub trait PaymentRepository: Send + Sync {
    fn insert(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError>;
    fn update(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError>;
    fn fetch(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, RepositoryError>;

    /// Lookup by the external gateway order reference.
    fn find_by_order(&self, order_ref: &str) -> Result<Option<PaymentRecord>, RepositoryError>;

    /// The project's payment, if one exists (at most one per project).
    fn find_by_project(
        &self,
        project: &ProjectId,
    ) -> Result<Option<PaymentRecord>, RepositoryError>;

    /// Payments awaiting an admin release, oldest first.
    fn pending_releases(&self) -> Result<Vec<PaymentRecord>, RepositoryError>;

    /// Fully released payments (platform revenue aggregation).
    fn released(&self) -> Result<Vec<PaymentRecord>, RepositoryError>;

    fn for_student(&self, student: &StudentId) -> Result<Vec<PaymentRecord>, RepositoryError>;
    fn for_company(&self, company: &CompanyId) -> Result<Vec<PaymentRecord>, RepositoryError>;
}

/// Student-side earnings aggregate. Pending amounts are net-of-fee; the
/// total moves from pending to earned on release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentEarnings {
    pub total_earned: u64,
    pub pending_payments: u64,
    pub completed_projects: u64,
}

/// Company-side spend aggregate, tracked in gross amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySpend {
    pub total_spent: u64,
    pub payments_made: u64,
}

/// Aggregate bookkeeping updated alongside payment transitions.
pub trait EarningsLedger: Send + Sync {
    /// Capture/settlement credits the student's pending balance (net).
    fn add_pending(&self, student: &StudentId, net_amount: u64) -> Result<(), RepositoryError>;

    /// Release moves net from pending to earned and books the gross amount
    /// against the company.
    fn settle_release(
        &self,
        student: &StudentId,
        net_amount: u64,
        company: &CompanyId,
        gross_amount: u64,
    ) -> Result<(), RepositoryError>;

    /// Refund claws back pending credit (saturating at zero).
    fn remove_pending(&self, student: &StudentId, amount: u64) -> Result<(), RepositoryError>;

    fn student_earnings(&self, student: &StudentId) -> Result<StudentEarnings, RepositoryError>;
    fn company_spend(&self, company: &CompanyId) -> Result<CompanySpend, RepositoryError>;
}
