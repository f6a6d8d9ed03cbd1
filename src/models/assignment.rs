//! Duty Assignment Models
//!
//! Assignments and the reference data (halls, venues) they point at.
//! Assignments are created by the scheduling system; this service only
//! flips their delivery-state flags.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled invigilation duty: a date/time window, a hall, a venue,
/// and the set of assigned people (by QID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyAssignment {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Person keys assigned to this duty.
    pub qids: Vec<String>,
    pub hall_id: String,
    pub venue_id: String,
    pub mail_sent: bool,
    pub force_resend: bool,
    pub mail_sent_at: Option<DateTime<Utc>>,
}

impl DutyAssignment {
    /// Whether this assignment is eligible for bulk notification.
    pub fn needs_notification(&self) -> bool {
        !self.mail_sent || self.force_resend
    }
}

/// Examination hall reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hall {
    pub id: String,
    pub name: String,
    pub floor: String,
}

/// Examination venue reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
}

/// Inclusive date window for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Reject inverted windows before any lookup runs.
    pub fn validate(&self) -> Result<(), String> {
        if self.from > self.to {
            return Err(format!(
                "invalid date range: {} is after {}",
                self.from, self.to
            ));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}
