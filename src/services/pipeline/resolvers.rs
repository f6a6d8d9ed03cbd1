//! Per-Run Lookup Resolvers
//!
//! Identity and reference lookups memoized for the lifetime of one
//! pipeline run. The caches are owned by the run and dropped with it, so
//! one run can never read another run's cache.
//!
//! Point-lookup store failures degrade to "absent" rather than aborting
//! the run; only the top-level selection query is allowed to abort.

use std::collections::HashMap;

use crate::models::{ExternalId, Hall, Recipient, Role, Venue};
use crate::utils::error::AppResult;

use super::DutyStore;

/// Identifier sub-lookups tolerate store failures as "absent".
fn tolerate_absent(qid: &str, result: AppResult<Option<String>>) -> Option<String> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(qid, error = %e, "identifier sub-lookup failed, using fallback");
            None
        }
    }
}

/// Resolves person keys to sendable recipients, at most once per key.
///
/// Negative results are cached too: a person with a missing record or
/// missing contact address is looked up once and excluded from dispatch
/// for the rest of the run.
pub(crate) struct IdentityResolver<'a> {
    store: &'a dyn DutyStore,
    cache: HashMap<String, Option<Recipient>>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a dyn DutyStore) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Resolve a person key to a recipient, `None` meaning unresolvable.
    pub fn resolve(&mut self, qid: &str) -> Option<Recipient> {
        if let Some(cached) = self.cache.get(qid) {
            return cached.clone();
        }
        let resolved = self.resolve_uncached(qid);
        self.cache.insert(qid.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, qid: &str) -> Option<Recipient> {
        let record = match self.store.person(qid) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(qid, "person record not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(qid, error = %e, "person lookup failed, treating as absent");
                return None;
            }
        };

        let mail = match record.mail {
            Some(mail) if !mail.is_empty() => mail,
            _ => {
                tracing::warn!(qid, "contact address missing, excluding from dispatch");
                return None;
            }
        };

        Some(Recipient {
            qid: qid.to_string(),
            name: record.name,
            mail,
            external_id: self.external_id(qid, record.role),
        })
    }

    /// Role-specific external identifier, falling back to the generic QID
    /// label when no sub-record exists or the role carries none.
    fn external_id(&self, qid: &str, role: Role) -> ExternalId {
        let role_specific = match role {
            Role::Staff => tolerate_absent(qid, self.store.staff_eid(qid)).map(ExternalId::eid),
            Role::Student => {
                tolerate_absent(qid, self.store.student_htno(qid)).map(ExternalId::htno)
            }
            Role::Other => None,
        };
        role_specific.unwrap_or_else(|| ExternalId::generic(qid))
    }

    /// How many distinct keys this run has resolved so far.
    #[cfg(test)]
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }
}

/// Resolves hall and venue keys for rendering, at most once per key.
/// Missing or failing references resolve to `None` and render blank.
pub(crate) struct ReferenceResolver<'a> {
    store: &'a dyn DutyStore,
    halls: HashMap<String, Option<Hall>>,
    venues: HashMap<String, Option<Venue>>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(store: &'a dyn DutyStore) -> Self {
        Self {
            store,
            halls: HashMap::new(),
            venues: HashMap::new(),
        }
    }

    pub fn hall(&mut self, id: &str) -> Option<Hall> {
        if !self.halls.contains_key(id) {
            let hall = match self.store.hall(id) {
                Ok(hall) => hall,
                Err(e) => {
                    tracing::warn!(hall_id = id, error = %e, "hall lookup failed, rendering blank");
                    None
                }
            };
            self.halls.insert(id.to_string(), hall);
        }
        self.halls.get(id).cloned().flatten()
    }

    pub fn venue(&mut self, id: &str) -> Option<Venue> {
        if !self.venues.contains_key(id) {
            let venue = match self.store.venue(id) {
                Ok(venue) => venue,
                Err(e) => {
                    tracing::warn!(venue_id = id, error = %e, "venue lookup failed, rendering blank");
                    None
                }
            };
            self.venues.insert(id.to_string(), venue);
        }
        self.venues.get(id).cloned().flatten()
    }
}
