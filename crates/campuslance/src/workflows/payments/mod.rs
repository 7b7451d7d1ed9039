//! Escrow-style payment records and settlement coordination.

pub mod coordinator;
pub mod domain;
pub mod repository;
pub mod router;

pub use coordinator::{BulkReleaseReport, OrderOutcome, PaymentCoordinator, PaymentFlowError};
pub use domain::{
    platform_fee, PaymentError, PaymentId, PaymentRecord, PaymentStatus, ReleaseMethod,
    TransactionEntry,
};
pub use repository::{CompanySpend, EarningsLedger, PaymentRepository, StudentEarnings};
pub use router::payment_router;
