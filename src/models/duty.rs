//! Duty Records and Dispatch Outcomes
//!
//! Ephemeral per-run shapes: the duty rows attached to a recipient, the
//! rendered document, run outcomes, and the delivery audit record.

use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::NaiveDate;

use crate::models::person::Recipient;

/// One rendered-duty row: derived per (assignment, person), never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRecord {
    pub date: NaiveDate,
    /// Preformatted clock-time range ("9:30:00 AM – 12:30:00 PM").
    pub time: String,
    pub venue: Option<String>,
    pub hall: Option<String>,
    pub floor: Option<String>,
}

/// All duty records for one person within one run, in assignment
/// processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientBundle {
    pub recipient: Recipient,
    pub duties: Vec<DutyRecord>,
}

/// A complete rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDocument {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Summary of a bulk notification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRunOutcome {
    pub assignments_selected: usize,
    pub recipients_notified: usize,
    pub failures: usize,
    /// True only when every send succeeded and the contributing set was
    /// committed in one update.
    pub flags_committed: bool,
}

/// Client-facing outcome of the single-recipient path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SingleSendOutcome {
    Sent { recipient_name: String },
    /// The identifier matched neither a staff nor a student record.
    UnknownIdentifier,
    /// The person has no duties inside the requested window.
    NoDuties,
    /// The person record is missing or has no contact address.
    MissingContact,
}

/// Delivery attempt status for the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl DeliveryStatus {
    /// Parse from a database string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            _ => Self::Failed,
        }
    }
}

/// Per-recipient delivery audit record. Best-effort: writing it never
/// affects the run outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub qid: String,
    pub to_address: String,
    pub subject: String,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub attempted_at: String,
}

impl DeliveryLogEntry {
    /// Create a new audit record stamped with the current time.
    pub fn new(
        qid: &str,
        to_address: &str,
        subject: &str,
        status: DeliveryStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            qid: qid.to_string(),
            to_address: to_address.to_string(),
            subject: subject.to_string(),
            status,
            error,
            attempted_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
