//! Audit Trail
//!
//! Append-only record of every mutation, with opaque JSON before/after
//! snapshots. Blocking events land here with their fault attribution and are
//! the input to the timeline-extension calculation; entries are never updated
//! or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened, in the audit vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    StepUpdated,
    Submitted,
    StatusChangedToPendingClient,
    StatusChangedToBlocked,
    PaymentReleased,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::StepUpdated => "STEP_UPDATED",
            Self::Submitted => "SUBMITTED",
            Self::StatusChangedToPendingClient => "STATUS_CHANGED_TO_PENDING_CLIENT",
            Self::StatusChangedToBlocked => "STATUS_CHANGED_TO_BLOCKED",
            Self::PaymentReleased => "PAYMENT_RELEASED",
            Self::Deleted => "DELETED",
        }
    }

    /// Blocking events extend the delivery timeline; everything else does not.
    pub fn is_blocking_event(&self) -> bool {
        matches!(
            self,
            Self::StatusChangedToPendingClient | Self::StatusChangedToBlocked
        )
    }
}

/// One write-once audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub client_id: Uuid,
    pub table_name: String,
    pub record_id: Uuid,
    pub action: AuditAction,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        client_id: Uuid,
        table_name: impl Into<String>,
        record_id: Uuid,
        action: AuditAction,
        changed_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            table_name: table_name.into(),
            record_id,
            action,
            old_value: None,
            new_value: None,
            changed_by,
            changed_at: Utc::now(),
        }
    }

    pub fn with_snapshots(
        mut self,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }
}
