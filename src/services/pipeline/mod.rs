//! Duty Notification Pipeline
//!
//! Selects pending duty assignments, fans their person lists out into
//! per-person duty bundles (memoizing every lookup per run), renders one
//! notification document per person, and dispatches with all-or-nothing
//! delivery-flag reconciliation.

mod aggregator;
mod dispatcher;
mod renderer;
mod resolvers;


pub use dispatcher::{DutyNotifier, SenderIdentity};
pub use renderer::render;

use chrono::{DateTime, Utc};

use crate::models::{DateRange, DeliveryLogEntry, DutyAssignment, Hall, PersonRecord, Venue};
use crate::utils::error::AppResult;

/// Read/write surface the pipeline consumes from the data store.
///
/// Implemented by `storage::Database` and by test fakes. All methods are
/// synchronous; the pipeline issues them sequentially within a run.
pub trait DutyStore: Send + Sync {
    /// Assignments in the window still awaiting notification
    /// (`mail_sent` false or `force_resend` set), in processing order.
    fn pending_assignments(&self, range: &DateRange) -> AppResult<Vec<DutyAssignment>>;

    /// Assignments in the window naming the given person, with no
    /// delivery-flag filtering.
    fn assignments_for_person(
        &self,
        range: &DateRange,
        qid: &str,
    ) -> AppResult<Vec<DutyAssignment>>;

    fn hall(&self, id: &str) -> AppResult<Option<Hall>>;

    fn venue(&self, id: &str) -> AppResult<Option<Venue>>;

    fn person(&self, qid: &str) -> AppResult<Option<PersonRecord>>;

    /// Staff employee identifier for a person, if a staff sub-record exists.
    fn staff_eid(&self, qid: &str) -> AppResult<Option<String>>;

    /// Student hall-ticket number for a person, if a student sub-record exists.
    fn student_htno(&self, qid: &str) -> AppResult<Option<String>>;

    fn qid_by_eid(&self, eid: &str) -> AppResult<Option<String>>;

    fn qid_by_htno(&self, htno: &str) -> AppResult<Option<String>>;

    /// Mark every listed assignment delivered in ONE set-scoped update:
    /// `mail_sent = true`, `mail_sent_at = sent_at`, `force_resend = false`.
    fn mark_mail_sent(&self, ids: &[String], sent_at: DateTime<Utc>) -> AppResult<()>;

    /// Record a delivery attempt in the audit log. Best-effort; the
    /// default implementation drops the entry so fakes need not care.
    fn record_delivery(&self, _entry: &DeliveryLogEntry) -> AppResult<()> {
        Ok(())
    }
}
