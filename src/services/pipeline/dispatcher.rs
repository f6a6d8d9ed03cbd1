//! Dispatch & Reconciliation Controller
//!
//! Sends one notification per aggregated recipient and commits the batch
//! delivery flags in a single set-scoped update, only when every send in
//! the batch succeeded. Partial success is never partially committed: any
//! failure leaves the whole eligible set pending for the next run.

use std::sync::Arc;

use chrono::Utc;

use crate::models::{
    BulkRunOutcome, DateRange, DeliveryLogEntry, DeliveryStatus, DutyRecord, ExternalId,
    NotificationDocument, Recipient, RecipientBundle, SingleSendOutcome,
};
use crate::services::mailer::{MailError, MailTransport, OutboundEmail};
use crate::utils::error::{AppError, AppResult};

use super::aggregator::{aggregate, build_duty_record};
use super::renderer::render;
use super::resolvers::ReferenceResolver;
use super::DutyStore;

/// Sender identity stamped on every outbound message.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub address: String,
    pub display_name: String,
}

impl SenderIdentity {
    fn from_header(&self) -> String {
        format!("\"{}\" <{}>", self.display_name, self.address)
    }
}

/// Pipeline controller.
///
/// Holds the injected store and transport collaborators; every run builds
/// its own resolver caches, so concurrent runs never share state.
pub struct DutyNotifier {
    store: Arc<dyn DutyStore>,
    transport: Arc<dyn MailTransport>,
    sender: SenderIdentity,
}

impl DutyNotifier {
    pub fn new(
        store: Arc<dyn DutyStore>,
        transport: Arc<dyn MailTransport>,
        sender: SenderIdentity,
    ) -> Self {
        Self {
            store,
            transport,
            sender,
        }
    }

    /// Bulk path: notify every person with pending duties in the window.
    ///
    /// A selection-query error aborts the run; per-recipient failures are
    /// recorded and never stop the remaining recipients. Flags are
    /// committed only on a fully clean batch.
    pub async fn send_bulk(&self, range: DateRange) -> AppResult<BulkRunOutcome> {
        range.validate().map_err(AppError::validation)?;
        tracing::info!(from = %range.from, to = %range.to, "bulk notification run started");

        let assignments = self.store.pending_assignments(&range)?;
        if assignments.is_empty() {
            tracing::info!("no pending duty assignments in range");
            return Ok(BulkRunOutcome::default());
        }

        let aggregation = aggregate(self.store.as_ref(), &assignments);
        let mut failures = aggregation.unresolved;
        let mut notified = 0usize;

        for bundle in &aggregation.bundles {
            let document = render(bundle);
            match self.deliver(&bundle.recipient, &document).await {
                Ok(()) => {
                    notified += 1;
                    tracing::info!(to = %bundle.recipient.mail, "duty notification sent");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(to = %bundle.recipient.mail, error = %e, "duty notification failed");
                }
            }
        }

        let mut flags_committed = false;
        if failures == 0 && !aggregation.contributing_ids.is_empty() {
            self.store
                .mark_mail_sent(&aggregation.contributing_ids, Utc::now())?;
            flags_committed = true;
            tracing::info!(
                assignments = aggregation.contributing_ids.len(),
                "delivery flags committed"
            );
        } else if failures > 0 {
            tracing::warn!(failures, "failures recorded, delivery flags left untouched");
        }

        Ok(BulkRunOutcome {
            assignments_selected: assignments.len(),
            recipients_notified: notified,
            failures,
            flags_committed,
        })
    }

    /// Single path: notify one person located by external identifier.
    ///
    /// Tries the staff index first, then the student index; the matched
    /// index decides the rendered identifier label. Performs no flag
    /// reconciliation.
    pub async fn send_single(
        &self,
        id_value: &str,
        range: DateRange,
    ) -> AppResult<SingleSendOutcome> {
        range.validate().map_err(AppError::validation)?;
        if id_value.trim().is_empty() {
            return Err(AppError::validation("identifier value is required"));
        }

        let (qid, external_id) = match self.lookup_identifier(id_value) {
            Some(hit) => hit,
            None => return Ok(SingleSendOutcome::UnknownIdentifier),
        };

        let record = match self.store.person(&qid) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(SingleSendOutcome::MissingContact),
            Err(e) => {
                tracing::warn!(qid = %qid, error = %e, "person lookup failed, treating as absent");
                return Ok(SingleSendOutcome::MissingContact);
            }
        };
        let mail = match record.mail {
            Some(mail) if !mail.is_empty() => mail,
            _ => return Ok(SingleSendOutcome::MissingContact),
        };

        let assignments = self.store.assignments_for_person(&range, &qid)?;
        if assignments.is_empty() {
            return Ok(SingleSendOutcome::NoDuties);
        }

        let mut references = ReferenceResolver::new(self.store.as_ref());
        let duties: Vec<DutyRecord> = assignments
            .iter()
            .map(|assignment| build_duty_record(assignment, &mut references))
            .collect();

        let bundle = RecipientBundle {
            recipient: Recipient {
                qid,
                name: record.name,
                mail,
                external_id,
            },
            duties,
        };

        let document = render(&bundle);
        self.deliver(&bundle.recipient, &document)
            .await
            .map_err(|e| AppError::mail(e.to_string()))?;

        tracing::info!(to = %bundle.recipient.mail, "individual duty notification sent");
        Ok(SingleSendOutcome::Sent {
            recipient_name: bundle.recipient.name,
        })
    }

    /// Send one rendered document and record the attempt in the audit log.
    async fn deliver(
        &self,
        recipient: &Recipient,
        document: &NotificationDocument,
    ) -> Result<(), MailError> {
        let email = OutboundEmail {
            from: self.sender.from_header(),
            to: recipient.mail.clone(),
            subject: document.subject.clone(),
            html_body: document.html_body.clone(),
            text_body: document.text_body.clone(),
        };

        let result = self.transport.send(&email).await;

        let entry = match &result {
            Ok(()) => DeliveryLogEntry::new(
                &recipient.qid,
                &recipient.mail,
                &document.subject,
                DeliveryStatus::Success,
                None,
            ),
            Err(e) => DeliveryLogEntry::new(
                &recipient.qid,
                &recipient.mail,
                &document.subject,
                DeliveryStatus::Failed,
                Some(e.to_string()),
            ),
        };
        // Audit must never change the run outcome.
        if let Err(e) = self.store.record_delivery(&entry) {
            tracing::warn!(error = %e, "failed to record delivery audit entry");
        }

        result
    }

    /// Resolve an external identifier to a person key: EID first, HTNO
    /// second. Index lookup failures degrade to "absent".
    fn lookup_identifier(&self, id_value: &str) -> Option<(String, ExternalId)> {
        match self.store.qid_by_eid(id_value) {
            Ok(Some(qid)) => return Some((qid, ExternalId::eid(id_value.to_string()))),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "staff identifier lookup failed, treating as absent")
            }
        }
        match self.store.qid_by_htno(id_value) {
            Ok(Some(qid)) => Some((qid, ExternalId::htno(id_value.to_string()))),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "student identifier lookup failed, treating as absent");
                None
            }
        }
    }
}
