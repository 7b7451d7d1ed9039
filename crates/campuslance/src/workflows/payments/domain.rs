use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::workflows::projects::domain::PaymentId;
use crate::workflows::projects::domain::{CompanyId, ProjectId, StudentId, UserId, ValidationError};

/// Escrow lifecycle states. Transitions only move forward, except that
/// `Refunded` is reachable from most non-pending states and `Failed` only
/// from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Captured,
    ReadyForRelease,
    Released,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Captured => "captured",
            PaymentStatus::ReadyForRelease => "ready_for_release",
            PaymentStatus::Released => "released",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Released | PaymentStatus::Refunded | PaymentStatus::Failed
        )
    }
}

/// How a release reached the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMethod {
    GatewayPayout,
    ManualTransfer,
}

impl ReleaseMethod {
    pub const fn label(self) -> &'static str {
        match self {
            ReleaseMethod::GatewayPayout => "gateway_payout",
            ReleaseMethod::ManualTransfer => "manual_transfer",
        }
    }
}

/// Append-only audit entry on a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub action: String,
    pub actor: Option<UserId>,
    pub at: DateTime<Utc>,
    pub notes: String,
}

/// Gross amount split. Rounds the fee to the nearest unit.
pub fn platform_fee(amount: u64, fee_percent: u64) -> u64 {
    (amount * fee_percent + 50) / 100
}

const REFUND_REASON_MIN: usize = 5;
const REFUND_REASON_MAX: usize = 500;

/// Transition failures raised by the payment state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("payment not allowed to move. Current status: {current}, required: {required}")]
    InvalidTransition {
        current: &'static str,
        required: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One escrow transaction tied to a project.
///
/// `net_amount` is computed once at creation and never recomputed: student
/// earnings settle on the net amount while company spend tracks the gross
/// amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub project: ProjectId,
    pub company: CompanyId,
    pub student: StudentId,

    pub amount: u64,
    pub platform_fee: u64,
    pub net_amount: u64,
    pub status: PaymentStatus,

    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,

    pub created_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,

    pub released_by: Option<UserId>,
    pub release_method: Option<ReleaseMethod>,
    pub release_notes: Option<String>,

    pub refund_reason: Option<String>,
    pub refunded_by: Option<UserId>,
    pub refund_amount: Option<u64>,

    pub transaction_history: Vec<TransactionEntry>,
}

impl PaymentRecord {
    pub fn new(
        id: PaymentId,
        project: ProjectId,
        company: CompanyId,
        student: StudentId,
        amount: u64,
        fee_percent: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let fee = platform_fee(amount, fee_percent);
        let mut record = Self {
            id,
            project,
            company,
            student,
            amount,
            platform_fee: fee,
            net_amount: amount - fee,
            status: PaymentStatus::Pending,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            created_at: now,
            captured_at: None,
            released_at: None,
            refunded_at: None,
            released_by: None,
            release_method: None,
            release_notes: None,
            refund_reason: None,
            refunded_by: None,
            refund_amount: None,
            transaction_history: Vec::new(),
        };
        record.log("created", None, "Payment record created", now);
        record
    }

    /// Settlement path: approval itself is the trust signal, so the record
    /// is born directly in `ReadyForRelease`, skipping pending/captured.
    pub fn new_ready_for_release(
        id: PaymentId,
        project: ProjectId,
        company: CompanyId,
        student: StudentId,
        amount: u64,
        fee_percent: u64,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(id, project, company, student, amount, fee_percent, now);
        record.status = PaymentStatus::ReadyForRelease;
        record.captured_at = Some(now);
        record.log(
            "ready_for_release",
            Some(actor),
            "Auto-created after work approval",
            now,
        );
        record
    }

    fn log(&mut self, action: &str, actor: Option<UserId>, notes: &str, now: DateTime<Utc>) {
        self.transaction_history.push(TransactionEntry {
            action: action.to_string(),
            actor,
            at: now,
            notes: notes.to_string(),
        });
    }

    fn require_status(
        &self,
        required: PaymentStatus,
        required_label: &'static str,
    ) -> Result<(), PaymentError> {
        if self.status == required {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition {
                current: self.status.label(),
                required: required_label,
            })
        }
    }

    /// Gateway confirmed the charge.
    pub fn capture(
        &mut self,
        gateway_payment_id: Option<String>,
        gateway_signature: Option<String>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.require_status(PaymentStatus::Pending, "pending")?;
        self.status = PaymentStatus::Captured;
        self.captured_at = Some(now);
        if self.gateway_payment_id.is_none() {
            self.gateway_payment_id = gateway_payment_id;
        }
        if self.gateway_signature.is_none() {
            self.gateway_signature = gateway_signature;
        }
        self.log("captured", actor, "Payment captured", now);
        Ok(())
    }

    pub fn mark_ready(
        &mut self,
        actor: Option<UserId>,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.require_status(PaymentStatus::Captured, "captured")?;
        self.status = PaymentStatus::ReadyForRelease;
        self.log("ready_for_release", actor, notes, now);
        Ok(())
    }

    pub fn release(
        &mut self,
        admin: UserId,
        method: ReleaseMethod,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.require_status(PaymentStatus::ReadyForRelease, "ready_for_release")?;
        self.status = PaymentStatus::Released;
        self.released_at = Some(now);
        self.released_by = Some(admin.clone());
        self.release_method = Some(method);
        self.release_notes = Some(notes.clone());
        let notes = if notes.is_empty() {
            "Payment released".to_string()
        } else {
            notes
        };
        self.log("released", Some(admin), &notes, now);
        Ok(())
    }

    pub fn refund(
        &mut self,
        admin: UserId,
        reason: String,
        amount: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<u64, PaymentError> {
        if !matches!(
            self.status,
            PaymentStatus::Captured
                | PaymentStatus::ReadyForRelease
                | PaymentStatus::Failed
                | PaymentStatus::Released
        ) {
            return Err(PaymentError::InvalidTransition {
                current: self.status.label(),
                required: "captured, ready_for_release, failed, or released",
            });
        }

        let trimmed = reason.trim();
        if trimmed.len() < REFUND_REASON_MIN || trimmed.len() > REFUND_REASON_MAX {
            return Err(ValidationError::ReasonLength {
                field: "refund reason",
                min: REFUND_REASON_MIN,
                max: REFUND_REASON_MAX,
            }
            .into());
        }

        let refund_amount = amount.unwrap_or(self.amount);
        if refund_amount > self.amount {
            return Err(ValidationError::RefundExceedsOriginal {
                requested: refund_amount,
                original: self.amount,
            }
            .into());
        }

        self.status = PaymentStatus::Refunded;
        self.refunded_at = Some(now);
        self.refunded_by = Some(admin.clone());
        self.refund_reason = Some(trimmed.to_string());
        self.refund_amount = Some(refund_amount);
        let notes = format!("Refunded {refund_amount} - {trimmed}");
        self.log("refunded", Some(admin), &notes, now);
        Ok(refund_amount)
    }

    /// Gateway verification failed; only a pending charge can fail.
    pub fn fail(
        &mut self,
        actor: Option<UserId>,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.require_status(PaymentStatus::Pending, "pending")?;
        self.status = PaymentStatus::Failed;
        self.log("failed", actor, notes, now);
        Ok(())
    }
}
