//! Bulk Dispatch & Reconciliation Tests
//!
//! Cover fan-out correctness, memoized resolution, and the all-or-nothing
//! batch commit of delivery flags.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use invigil_notify::models::{DeliveryStatus, Role};
use invigil_notify::services::pipeline::DutyStore;

use crate::helpers::*;

#[tokio::test]
async fn test_person_in_two_assignments_receives_one_two_row_mail() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("q1@x.edu"), Role::Student);
    seed_student(&db, "Q1", "2025A7");
    db.insert_assignment(&assignment_on("inv-1", "2025-10-01", &["Q1"]))
        .unwrap();
    db.insert_assignment(&assignment_on("inv-2", "2025-10-03", &["Q1"]))
        .unwrap();

    let transport = Arc::new(FakeTransport::new());
    let notifier = notifier_with(Arc::new(db.clone()), transport.clone());

    let outcome = notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    assert_eq!(outcome.assignments_selected, 2);
    assert_eq!(outcome.recipients_notified, 1);
    assert_eq!(outcome.failures, 0);
    assert!(outcome.flags_committed);

    // Exactly one notification, with one duty row per assignment.
    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "q1@x.edu");
    assert_eq!(sent[0].html_body.matches("<tr><td>").count(), 2);
    assert!(sent[0].html_body.contains("(HTNO: 2025A7)"));

    for id in ["inv-1", "inv-2"] {
        let assignment = db.assignment(id).unwrap().unwrap();
        assert!(assignment.mail_sent, "{} should be marked sent", id);
        assert!(!assignment.force_resend);
        assert!(assignment.mail_sent_at.is_some());
    }
}

#[tokio::test]
async fn test_partial_failure_keeps_whole_batch_pending() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("asha@x.edu"), Role::Student);
    seed_person(&db, "Q2", "Vikram Iyer", Some("vikram@x.edu"), Role::Staff);
    db.insert_assignment(&assignment_on("inv-1", "2025-10-01", &["Q1"]))
        .unwrap();
    db.insert_assignment(&assignment_on("inv-2", "2025-10-02", &["Q2"]))
        .unwrap();

    let transport = Arc::new(FakeTransport::failing(&["vikram@x.edu"]));
    let notifier = notifier_with(Arc::new(db.clone()), transport.clone());

    let window = range("2025-10-01", "2025-10-05");
    let outcome = notifier.send_bulk(window).await.unwrap();

    assert_eq!(outcome.recipients_notified, 1);
    assert_eq!(outcome.failures, 1);
    assert!(!outcome.flags_committed);
    assert_eq!(transport.sent_to(), vec!["asha@x.edu".to_string()]);

    // No flags changed: a re-run selects the identical eligible set,
    // including the assignment whose recipient already got mail.
    let reselected = db.pending_assignments(&window).unwrap();
    let ids: Vec<&str> = reselected.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2"]);

    // A clean re-run delivers to everyone and commits.
    let retry_transport = Arc::new(FakeTransport::new());
    let retry_notifier = notifier_with(Arc::new(db.clone()), retry_transport.clone());
    let retry_outcome = retry_notifier.send_bulk(window).await.unwrap();

    assert_eq!(retry_outcome.recipients_notified, 2);
    assert!(retry_outcome.flags_committed);
    assert!(db.pending_assignments(&window).unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_contact_blocks_sole_contributor_commit() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("asha@x.edu"), Role::Student);
    seed_person(&db, "Q2", "No Mail", None, Role::Other);
    db.insert_assignment(&assignment_on("inv-1", "2025-10-01", &["Q1", "Q2"]))
        .unwrap();

    let transport = Arc::new(FakeTransport::new());
    let notifier = notifier_with(Arc::new(db.clone()), transport.clone());

    let outcome = notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    // The resolvable person still got their mail...
    assert_eq!(transport.sent_to(), vec!["asha@x.edu".to_string()]);
    // ...but the missing contact counts as a failure, so the assignment
    // (sole contributor to the batch) stays pending.
    assert_eq!(outcome.failures, 1);
    assert!(!outcome.flags_committed);
    let assignment = db.assignment("inv-1").unwrap().unwrap();
    assert!(!assignment.mail_sent);
    assert!(assignment.mail_sent_at.is_none());
}

#[tokio::test]
async fn test_resolution_happens_once_per_key_per_run() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("asha@x.edu"), Role::Student);
    seed_student(&db, "Q1", "2025A7");
    seed_person(&db, "Q2", "Vikram Iyer", Some("vikram@x.edu"), Role::Staff);
    seed_staff(&db, "Q2", "E-1042");
    for (id, date) in [
        ("inv-1", "2025-10-01"),
        ("inv-2", "2025-10-02"),
        ("inv-3", "2025-10-03"),
    ] {
        db.insert_assignment(&assignment_on(id, date, &["Q1", "Q2"]))
            .unwrap();
    }

    let store = Arc::new(CountingStore::new(db));
    let transport = Arc::new(FakeTransport::new());
    let notifier = notifier_with(store.clone(), transport);

    notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    // Two people, one hall key, one venue key across six (assignment,
    // person) pairs: each key resolved exactly once.
    assert_eq!(store.person_lookups.load(Ordering::SeqCst), 2);
    assert_eq!(store.hall_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(store.venue_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_force_resend_reselects_and_is_cleared_on_commit() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("asha@x.edu"), Role::Student);
    let mut resend = assignment_on("inv-1", "2025-10-01", &["Q1"]);
    resend.mail_sent = true;
    resend.force_resend = true;
    db.insert_assignment(&resend).unwrap();

    let transport = Arc::new(FakeTransport::new());
    let notifier = notifier_with(Arc::new(db.clone()), transport.clone());

    let outcome = notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    assert_eq!(outcome.assignments_selected, 1);
    assert_eq!(transport.sent.lock().unwrap().len(), 1);

    let assignment = db.assignment("inv-1").unwrap().unwrap();
    assert!(assignment.mail_sent);
    assert!(!assignment.force_resend);
}

#[tokio::test]
async fn test_empty_selection_terminates_as_noop() {
    let db = seeded_db();
    let transport = Arc::new(FakeTransport::new());
    let notifier = notifier_with(Arc::new(db), transport.clone());

    let outcome = notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    assert_eq!(outcome.assignments_selected, 0);
    assert!(!outcome.flags_committed);
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delivery_log_records_every_attempt() {
    let db = seeded_db();
    seed_person(&db, "Q1", "Asha Rao", Some("asha@x.edu"), Role::Student);
    seed_person(&db, "Q2", "Vikram Iyer", Some("vikram@x.edu"), Role::Staff);
    db.insert_assignment(&assignment_on("inv-1", "2025-10-01", &["Q1", "Q2"]))
        .unwrap();

    let transport = Arc::new(FakeTransport::failing(&["vikram@x.edu"]));
    let notifier = notifier_with(Arc::new(db.clone()), transport);

    notifier
        .send_bulk(range("2025-10-01", "2025-10-05"))
        .await
        .unwrap();

    let log = db.delivery_log().unwrap();
    assert_eq!(log.len(), 2);
    let failed: Vec<_> = log
        .iter()
        .filter(|entry| entry.status == DeliveryStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].to_address, "vikram@x.edu");
    assert!(failed[0].error.as_deref().unwrap_or_default().contains("simulated"));
}
