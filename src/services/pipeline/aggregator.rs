//! Duty Fan-out & Aggregation
//!
//! Expands the selection set into per-person duty records, merging records
//! for the same person across assignments so each person is notified once.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{DutyAssignment, DutyRecord, RecipientBundle};

use super::resolvers::{IdentityResolver, ReferenceResolver};
use super::DutyStore;

/// Result of fanning a selection set out into per-person bundles.
pub(crate) struct Aggregation {
    /// Bundles in first-seen recipient order.
    pub bundles: Vec<RecipientBundle>,
    /// Assignments that contributed at least one sendable recipient, in
    /// processing order.
    pub contributing_ids: Vec<String>,
    /// Distinct person keys that failed to resolve to a usable contact.
    pub unresolved: usize,
}

/// Fan the selection set out into recipient bundles.
///
/// Resolvers are created here and dropped on return, which scopes every
/// memo cache to exactly one run. Every (assignment, person) pair where
/// the person resolves yields exactly one duty record in that person's
/// bundle.
pub(crate) fn aggregate(store: &dyn DutyStore, assignments: &[DutyAssignment]) -> Aggregation {
    let mut identities = IdentityResolver::new(store);
    let mut references = ReferenceResolver::new(store);

    let mut bundles: Vec<RecipientBundle> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut contributing_ids: Vec<String> = Vec::new();
    let mut unresolved: HashSet<String> = HashSet::new();

    for assignment in assignments {
        let record = build_duty_record(assignment, &mut references);
        let mut contributed = false;

        for qid in &assignment.qids {
            match identities.resolve(qid) {
                Some(recipient) => {
                    let slot = match index.get(qid) {
                        Some(&slot) => slot,
                        None => {
                            bundles.push(RecipientBundle {
                                recipient,
                                duties: Vec::new(),
                            });
                            index.insert(qid.clone(), bundles.len() - 1);
                            bundles.len() - 1
                        }
                    };
                    bundles[slot].duties.push(record.clone());
                    contributed = true;
                }
                None => {
                    unresolved.insert(qid.clone());
                }
            }
        }

        if contributed {
            contributing_ids.push(assignment.id.clone());
        }
    }

    Aggregation {
        bundles,
        contributing_ids,
        unresolved: unresolved.len(),
    }
}

/// Construct the rendered-duty row for one assignment. Shared by the bulk
/// fan-out and the single-recipient path.
pub(crate) fn build_duty_record(
    assignment: &DutyAssignment,
    references: &mut ReferenceResolver<'_>,
) -> DutyRecord {
    let hall = references.hall(&assignment.hall_id);
    let venue = references.venue(&assignment.venue_id);

    DutyRecord {
        date: assignment.date,
        time: format_time_range(assignment.start_time, assignment.end_time),
        venue: venue.map(|v| v.name),
        hall: hall.as_ref().map(|h| h.name.clone()),
        floor: hall.map(|h| h.floor),
    }
}

/// Clock-time range for the duty table, en dash separated.
pub(crate) fn format_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{} – {}",
        start.format("%-I:%M:%S %p"),
        end.format("%-I:%M:%S %p")
    )
}
