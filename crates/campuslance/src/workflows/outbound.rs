//! Outbound collaborator boundaries.
//!
//! Notifications, the payment gateway, and the file store are external
//! systems. The coordinators depend on these traits only; delivery internals
//! live in the service shell. Notification dispatch is best-effort: a
//! transport failure is logged and swallowed so it can never roll back a
//! state transition that already persisted.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::identity::ActorRole;
use super::projects::domain::{ApplicationId, PaymentId, ProjectId, StudentId, UserId};

/// Entity a notification points back at, for client-side deep links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum RelatedEntity {
    Project(ProjectId),
    Application(ApplicationId),
    Payment(PaymentId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user: UserId,
    pub role: ActorRole,
    pub message: String,
    pub kind: String,
    pub related: Option<RelatedEntity>,
}

impl Notification {
    pub fn new(
        user: UserId,
        role: ActorRole,
        message: impl Into<String>,
        kind: &str,
        related: Option<RelatedEntity>,
    ) -> Self {
        Self {
            user,
            role,
            message: message.into(),
            kind: kind.to_string(),
            related,
        }
    }
}

/// Trait describing the outbound notification hook.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Best-effort send. Failures are logged, never propagated.
pub fn dispatch<N: Notifier + ?Sized>(notifier: &N, notification: Notification) {
    let kind = notification.kind.clone();
    if let Err(err) = notifier.notify(notification) {
        warn!(%kind, %err, "notification dropped");
    }
}

/// Explicit admin recipient list, replacing any "first user with role=admin"
/// lookup. Broadcasts are best-effort like every other notification.
#[derive(Debug, Clone, Default)]
pub struct AdminAudience {
    recipients: Vec<UserId>,
}

impl AdminAudience {
    pub fn new(recipients: Vec<UserId>) -> Self {
        Self { recipients }
    }

    pub fn broadcast<N: Notifier + ?Sized>(
        &self,
        notifier: &N,
        message: &str,
        kind: &str,
        related: Option<RelatedEntity>,
    ) {
        for recipient in &self.recipients {
            dispatch(
                notifier,
                Notification::new(
                    recipient.clone(),
                    ActorRole::Admin,
                    message,
                    kind,
                    related.clone(),
                ),
            );
        }
    }
}

/// Order handle returned by the external payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_ref: String,
    pub currency: String,
}

/// Payment gateway boundary. A missing or misconfigured gateway degrades
/// gracefully: order creation still persists a pending payment record.
pub trait PaymentGateway: Send + Sync {
    fn create_order(
        &self,
        amount: u64,
        project: &ProjectId,
        student: &StudentId,
    ) -> Result<GatewayOrder, GatewayError>;

    fn verify_signature(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<bool, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("payment gateway unavailable: {0}")]
    Transport(String),
}

/// Reference to a stored attachment. The core never holds raw bytes beyond
/// the upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileRef {
    pub url: String,
    pub public_id: String,
}

/// Attachment storage boundary (CDN/object store).
pub trait FileStore: Send + Sync {
    fn store(
        &self,
        name: &str,
        content: &[u8],
        folder: &str,
    ) -> Result<StoredFileRef, FileStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("file store unavailable: {0}")]
    Transport(String),
    #[error("file '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
}
