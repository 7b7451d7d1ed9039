use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::workflows::identity::{ActorContext, ActorRole};
use crate::workflows::outbound::{
    dispatch, AdminAudience, GatewayError, GatewayOrder, Notification, Notifier, PaymentGateway,
    RelatedEntity,
};
use crate::workflows::projects::domain::{ProjectId, StudentId, UserId, ValidationError};
use crate::workflows::projects::record::{ProjectError, ProjectRecord};
use crate::workflows::projects::repository::{ProjectRepository, RepositoryError};

use super::domain::{PaymentError, PaymentId, PaymentRecord, PaymentStatus, ReleaseMethod};
use super::repository::{CompanySpend, EarningsLedger, PaymentRepository, StudentEarnings};

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_payment_id() -> PaymentId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentId(format!("pay-{id:06}"))
}

/// Result of a company-initiated order creation. `gateway_order` is absent
/// when the gateway is unavailable; the payment record persists regardless
/// so an admin can follow up manually.
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    pub payment: PaymentRecord,
    pub gateway_order: Option<GatewayOrder>,
}

/// Per-id outcome report for a bulk release.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReleaseReport {
    pub released: Vec<PaymentId>,
    pub failures: Vec<BulkReleaseFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReleaseFailure {
    pub payment_id: PaymentId,
    pub error: String,
}

/// Student earnings read model: ledger aggregate plus recent payments.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsView {
    pub earnings: StudentEarnings,
    pub recent_payments: Vec<PaymentRecord>,
}

/// Company spend read model.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyPaymentsView {
    pub spend: CompanySpend,
    pub payments: Vec<PaymentRecord>,
}

/// Coordinates the escrow flow: order creation, gateway capture, settlement
/// on work approval, and admin release/refund, reconciling the earnings
/// ledger on every money movement.
pub struct PaymentCoordinator<P, Y, G, L, N> {
    projects: Arc<P>,
    payments: Arc<Y>,
    gateway: Arc<G>,
    ledger: Arc<L>,
    notifier: Arc<N>,
    admins: AdminAudience,
    fee_percent: u64,
}

impl<P, Y, G, L, N> PaymentCoordinator<P, Y, G, L, N>
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        projects: Arc<P>,
        payments: Arc<Y>,
        gateway: Arc<G>,
        ledger: Arc<L>,
        notifier: Arc<N>,
        admins: AdminAudience,
        fee_percent: u64,
    ) -> Self {
        Self {
            projects,
            payments,
            gateway,
            ledger,
            notifier,
            admins,
            fee_percent,
        }
    }

    /// Company-initiated escrow order. The fee split is snapshotted from the
    /// project budget now and never recomputed.
    pub fn create_order(
        &self,
        project_id: &ProjectId,
        actor: &ActorContext,
        student_override: Option<StudentId>,
    ) -> Result<OrderOutcome, PaymentFlowError> {
        let mut project = self
            .projects
            .fetch(project_id)?
            .ok_or(PaymentFlowError::ProjectNotFound)?;
        let company = actor.as_company().ok_or(PaymentFlowError::Forbidden)?;
        if project.company != company {
            return Err(PaymentFlowError::Forbidden);
        }
        if project.payment.is_some() {
            return Err(PaymentFlowError::PaymentExists);
        }

        let student = student_override
            .or_else(|| project.assigned_student.clone())
            .ok_or(PaymentFlowError::Validation(
                ValidationError::NoAssignedStudent,
            ))?;

        let amount = project.settlement_amount();
        let now = Utc::now();
        let mut payment = PaymentRecord::new(
            next_payment_id(),
            project.id.clone(),
            project.company.clone(),
            student,
            amount,
            self.fee_percent,
            now,
        );

        // A gateway outage must not lose the order: keep the record pending
        // with no correlation ids and let an admin follow up.
        let gateway_order = match self
            .gateway
            .create_order(amount, &project.id, &payment.student)
        {
            Ok(order) => {
                payment.gateway_order_id = Some(order.order_ref.clone());
                Some(order)
            }
            Err(err) => {
                warn!(project = %project.id.0, %err, "gateway order creation failed");
                None
            }
        };

        let payment = self.payments.insert(payment)?;
        project.link_payment(payment.id.clone(), amount)?;
        project.set_payment_status(PaymentStatus::Pending);
        self.projects.update(project)?;

        Ok(OrderOutcome {
            payment,
            gateway_order,
        })
    }

    /// Gateway callback: verify the signature and capture the escrow.
    pub fn verify_and_capture(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
        actor: &ActorContext,
    ) -> Result<PaymentRecord, PaymentFlowError> {
        let mut payment = self
            .payments
            .find_by_order(order_ref)?
            .ok_or(PaymentFlowError::PaymentNotFound)?;

        let now = Utc::now();
        let valid = self
            .gateway
            .verify_signature(order_ref, payment_ref, signature)
            .map_err(PaymentFlowError::Gateway)?;

        if !valid {
            payment.fail(
                Some(actor.id.clone()),
                "Signature verification failed",
                now,
            )?;
            self.payments.update(payment)?;
            return Err(PaymentFlowError::InvalidSignature);
        }

        payment.capture(
            Some(payment_ref.to_string()),
            Some(signature.to_string()),
            Some(actor.id.clone()),
            now,
        )?;
        let payment = self.payments.update(payment)?;

        self.mirror_project(&payment, PaymentStatus::Captured, false);
        self.ledger.add_pending(&payment.student, payment.net_amount)?;

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(payment.student.0.clone()),
                ActorRole::Student,
                "Escrow payment received for your project".to_string(),
                "payment_received",
                Some(RelatedEntity::Payment(payment.id.clone())),
            ),
        );

        Ok(payment)
    }

    /// Settlement hook run when work is approved.
    ///
    /// Idempotent: a project that already carries a payment past `Captured`
    /// is left untouched, so retrying an approval never duplicates records.
    /// Returns the refreshed project alongside the payment it acted on.
    pub fn settle_approval(
        &self,
        mut project: ProjectRecord,
        actor: &UserId,
    ) -> Result<(ProjectRecord, Option<PaymentRecord>), PaymentFlowError> {
        let now = Utc::now();
        let existing = match project.payment.as_ref() {
            Some(id) => self.payments.fetch(id)?,
            None => self.payments.find_by_project(&project.id)?,
        };

        match existing {
            Some(mut payment) if payment.status == PaymentStatus::Captured => {
                payment.mark_ready(
                    Some(actor.clone()),
                    "Marked ready after work approval",
                    now,
                )?;
                let payment = self.payments.update(payment)?;
                project.set_payment_status(PaymentStatus::ReadyForRelease);
                let project = self.projects.update(project)?;
                self.notify_release_pending(&payment);
                Ok((project, Some(payment)))
            }
            Some(payment) => {
                info!(
                    payment = %payment.id.0,
                    status = payment.status.label(),
                    "settlement skipped, payment already advanced"
                );
                Ok((project, Some(payment)))
            }
            None => {
                let student = project
                    .assigned_student
                    .clone()
                    .ok_or(PaymentFlowError::Validation(
                        ValidationError::NoAssignedStudent,
                    ))?;
                let amount = project.settlement_amount();
                let payment = PaymentRecord::new_ready_for_release(
                    next_payment_id(),
                    project.id.clone(),
                    project.company.clone(),
                    student,
                    amount,
                    self.fee_percent,
                    actor.clone(),
                    now,
                );
                let payment = self.payments.insert(payment)?;

                project.link_payment(payment.id.clone(), amount)?;
                project.set_payment_status(PaymentStatus::ReadyForRelease);
                let project = self.projects.update(project)?;

                self.ledger.add_pending(&payment.student, payment.net_amount)?;
                self.notify_release_pending(&payment);
                Ok((project, Some(payment)))
            }
        }
    }

    /// Admin releases a held payment to the student.
    pub fn release(
        &self,
        payment_id: &PaymentId,
        actor: &ActorContext,
        method: ReleaseMethod,
        notes: String,
    ) -> Result<PaymentRecord, PaymentFlowError> {
        if !actor.is_admin() {
            return Err(PaymentFlowError::Forbidden);
        }

        let mut payment = self
            .payments
            .fetch(payment_id)?
            .ok_or(PaymentFlowError::PaymentNotFound)?;

        let now = Utc::now();
        payment.release(actor.id.clone(), method, notes, now)?;
        let payment = self.payments.update(payment)?;

        // Net to the student, gross against the company; the two totals
        // intentionally differ by the platform fee.
        self.ledger.settle_release(
            &payment.student,
            payment.net_amount,
            &payment.company,
            payment.amount,
        )?;

        self.mirror_project(&payment, PaymentStatus::Released, true);

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(payment.student.0.clone()),
                ActorRole::Student,
                format!("Payment of {} released to you", payment.net_amount),
                "payment_released",
                Some(RelatedEntity::Payment(payment.id.clone())),
            ),
        );
        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(payment.company.0.clone()),
                ActorRole::Company,
                format!("Escrow payment of {} released", payment.amount),
                "payment_released",
                Some(RelatedEntity::Payment(payment.id.clone())),
            ),
        );

        Ok(payment)
    }

    /// Admin refunds a payment back to the company.
    pub fn refund(
        &self,
        payment_id: &PaymentId,
        actor: &ActorContext,
        reason: String,
        amount: Option<u64>,
    ) -> Result<PaymentRecord, PaymentFlowError> {
        if !actor.is_admin() {
            return Err(PaymentFlowError::Forbidden);
        }

        let mut payment = self
            .payments
            .fetch(payment_id)?
            .ok_or(PaymentFlowError::PaymentNotFound)?;

        let now = Utc::now();
        let refunded = payment.refund(actor.id.clone(), reason, amount, now)?;
        let payment = self.payments.update(payment)?;

        self.ledger.remove_pending(&payment.student, refunded)?;
        self.mirror_project(&payment, PaymentStatus::Refunded, false);

        dispatch(
            self.notifier.as_ref(),
            Notification::new(
                UserId(payment.company.0.clone()),
                ActorRole::Company,
                format!("Refund of {refunded} processed"),
                "payment_refunded",
                Some(RelatedEntity::Payment(payment.id.clone())),
            ),
        );

        Ok(payment)
    }

    /// Release a batch; one failing payment never aborts the rest.
    pub fn bulk_release(
        &self,
        payment_ids: &[PaymentId],
        actor: &ActorContext,
        method: ReleaseMethod,
    ) -> Result<BulkReleaseReport, PaymentFlowError> {
        if !actor.is_admin() {
            return Err(PaymentFlowError::Forbidden);
        }

        let mut report = BulkReleaseReport::default();
        for payment_id in payment_ids {
            match self.release(payment_id, actor, method, String::new()) {
                Ok(payment) => report.released.push(payment.id),
                Err(err) => {
                    warn!(payment = %payment_id.0, %err, "bulk release entry failed");
                    report.failures.push(BulkReleaseFailure {
                        payment_id: payment_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn student_earnings(&self, actor: &ActorContext) -> Result<EarningsView, PaymentFlowError> {
        let student = actor.as_student().ok_or(PaymentFlowError::Forbidden)?;
        let earnings = self.ledger.student_earnings(&student)?;
        let mut recent_payments = self.payments.for_student(&student)?;
        recent_payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_payments.truncate(10);
        Ok(EarningsView {
            earnings,
            recent_payments,
        })
    }

    pub fn company_payments(
        &self,
        actor: &ActorContext,
    ) -> Result<CompanyPaymentsView, PaymentFlowError> {
        let company = actor.as_company().ok_or(PaymentFlowError::Forbidden)?;
        let spend = self.ledger.company_spend(&company)?;
        let mut payments = self.payments.for_company(&company)?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(CompanyPaymentsView { spend, payments })
    }

    pub fn pending_releases(
        &self,
        actor: &ActorContext,
    ) -> Result<Vec<PaymentRecord>, PaymentFlowError> {
        if !actor.is_admin() {
            return Err(PaymentFlowError::Forbidden);
        }
        Ok(self.payments.pending_releases()?)
    }

    /// Sum of platform fees over released payments.
    pub fn platform_revenue(&self, actor: &ActorContext) -> Result<u64, PaymentFlowError> {
        if !actor.is_admin() {
            return Err(PaymentFlowError::Forbidden);
        }
        let released = self.payments.released()?;
        Ok(released.iter().map(|p| p.platform_fee).sum())
    }

    /// Update the project's denormalized payment mirror. The mirror is not
    /// authoritative, so a stale project write is logged and dropped rather
    /// than failing the money movement that already persisted.
    fn mirror_project(&self, payment: &PaymentRecord, status: PaymentStatus, complete: bool) {
        let result = self
            .projects
            .fetch(&payment.project)
            .and_then(|maybe| match maybe {
                Some(mut project) => {
                    project.set_payment_status(status);
                    if complete {
                        project.force_complete(Utc::now());
                    }
                    self.projects.update(project).map(|_| ())
                }
                None => Ok(()),
            });
        if let Err(err) = result {
            warn!(project = %payment.project.0, %err, "payment mirror update failed");
        }
    }

    fn notify_release_pending(&self, payment: &PaymentRecord) {
        self.admins.broadcast(
            self.notifier.as_ref(),
            &format!(
                "Payment release pending for project {} ({} net to student)",
                payment.project.0, payment.net_amount
            ),
            "payment_release_pending",
            Some(RelatedEntity::Payment(payment.id.clone())),
        );
    }
}

/// Error raised by the payment coordinator.
#[derive(Debug, thiserror::Error)]
pub enum PaymentFlowError {
    #[error("project not found")]
    ProjectNotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("actor is not allowed to manage this payment")]
    Forbidden,
    #[error("project already has a payment")]
    PaymentExists,
    #[error("invalid payment signature")]
    InvalidSignature,
    #[error("payment update raced with a concurrent change, retry with fresh state")]
    Conflict,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("payment gateway error: {0}")]
    Gateway(GatewayError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PaymentFlowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::PaymentNotFound,
            other => Self::Repository(other),
        }
    }
}
