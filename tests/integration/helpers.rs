//! Shared fixtures: seeded in-memory database, recording fake transport,
//! and a call-counting store wrapper for memoization assertions.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use invigil_notify::models::{
    DateRange, DeliveryLogEntry, DutyAssignment, Hall, PersonRecord, Role, Venue,
};
use invigil_notify::services::mailer::{MailError, MailTransport, OutboundEmail};
use invigil_notify::services::pipeline::{DutyNotifier, DutyStore, SenderIdentity};
use invigil_notify::storage::Database;
use invigil_notify::utils::error::AppResult;

/// Build an assignment on the given date (09:30–12:30 UTC) naming the
/// given people, with delivery flags clear.
pub fn assignment_on(id: &str, date: &str, qids: &[&str]) -> DutyAssignment {
    let date: NaiveDate = date.parse().unwrap();
    DutyAssignment {
        id: id.to_string(),
        date,
        start_time: date.and_hms_opt(9, 30, 0).unwrap().and_utc(),
        end_time: date.and_hms_opt(12, 30, 0).unwrap().and_utc(),
        qids: qids.iter().map(|q| q.to_string()).collect(),
        hall_id: "h1".to_string(),
        venue_id: "v1".to_string(),
        mail_sent: false,
        force_resend: false,
        mail_sent_at: None,
    }
}

pub fn range(from: &str, to: &str) -> DateRange {
    DateRange::new(from.parse().unwrap(), to.parse().unwrap())
}

/// Fresh in-memory database with one hall and one venue seeded.
pub fn seeded_db() -> Database {
    let db = Database::new_in_memory().unwrap();
    db.insert_hall(&Hall {
        id: "h1".to_string(),
        name: "Hall A".to_string(),
        floor: "2".to_string(),
    })
    .unwrap();
    db.insert_venue(&Venue {
        id: "v1".to_string(),
        name: "Main Block".to_string(),
    })
    .unwrap();
    db
}

pub fn seed_person(db: &Database, qid: &str, name: &str, mail: Option<&str>, role: Role) {
    db.insert_person(&PersonRecord {
        qid: qid.to_string(),
        name: name.to_string(),
        mail: mail.map(str::to_string),
        role,
    })
    .unwrap();
}

pub fn seed_student(db: &Database, qid: &str, htno: &str) {
    db.insert_student_detail(qid, htno).unwrap();
}

pub fn seed_staff(db: &Database, qid: &str, eid: &str) {
    db.insert_staff_detail(qid, eid).unwrap();
}

/// Recording transport with per-address failure injection.
#[derive(Default)]
pub struct FakeTransport {
    pub sent: Mutex<Vec<OutboundEmail>>,
    pub fail_addresses: HashSet<String>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_addresses: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|email| email.to.clone())
            .collect()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if self.fail_addresses.contains(&email.to) {
            return Err(MailError::Rejected(
                "simulated transport failure".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Store wrapper counting person/hall/venue lookups, for verifying the
/// at-most-one-resolution-per-key-per-run invariant.
pub struct CountingStore {
    inner: Database,
    pub person_lookups: AtomicUsize,
    pub hall_lookups: AtomicUsize,
    pub venue_lookups: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            person_lookups: AtomicUsize::new(0),
            hall_lookups: AtomicUsize::new(0),
            venue_lookups: AtomicUsize::new(0),
        }
    }
}

impl DutyStore for CountingStore {
    fn pending_assignments(&self, range: &DateRange) -> AppResult<Vec<DutyAssignment>> {
        self.inner.pending_assignments(range)
    }

    fn assignments_for_person(
        &self,
        range: &DateRange,
        qid: &str,
    ) -> AppResult<Vec<DutyAssignment>> {
        self.inner.assignments_for_person(range, qid)
    }

    fn hall(&self, id: &str) -> AppResult<Option<Hall>> {
        self.hall_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.hall(id)
    }

    fn venue(&self, id: &str) -> AppResult<Option<Venue>> {
        self.venue_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.venue(id)
    }

    fn person(&self, qid: &str) -> AppResult<Option<PersonRecord>> {
        self.person_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.person(qid)
    }

    fn staff_eid(&self, qid: &str) -> AppResult<Option<String>> {
        self.inner.staff_eid(qid)
    }

    fn student_htno(&self, qid: &str) -> AppResult<Option<String>> {
        self.inner.student_htno(qid)
    }

    fn qid_by_eid(&self, eid: &str) -> AppResult<Option<String>> {
        self.inner.qid_by_eid(eid)
    }

    fn qid_by_htno(&self, htno: &str) -> AppResult<Option<String>> {
        self.inner.qid_by_htno(htno)
    }

    fn mark_mail_sent(&self, ids: &[String], sent_at: DateTime<Utc>) -> AppResult<()> {
        self.inner.mark_mail_sent(ids, sent_at)
    }

    fn record_delivery(&self, entry: &DeliveryLogEntry) -> AppResult<()> {
        self.inner.record_delivery(entry)
    }
}

/// Wire a notifier over the given collaborators.
pub fn notifier_with(
    store: Arc<dyn DutyStore>,
    transport: Arc<dyn MailTransport>,
) -> DutyNotifier {
    DutyNotifier::new(
        store,
        transport,
        SenderIdentity {
            address: "examcell@mahindrauniversity.edu.in".to_string(),
            display_name: "Examination Cell".to_string(),
        },
    )
}
