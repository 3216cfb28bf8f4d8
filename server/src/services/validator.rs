use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::admission::{classify, AdmissionWindow, Decision, DenialReason};
use crate::store::{bounded, TicketStore};
use crate::utils::error::AppError;

/// Admits scanned tickets, each at most once.
#[derive(Clone)]
pub struct TicketValidator {
    store: Arc<dyn TicketStore>,
    window: AdmissionWindow,
    timeout: Duration,
}

impl TicketValidator {
    pub fn new(store: Arc<dyn TicketStore>, window: AdmissionWindow, timeout: Duration) -> Self {
        Self {
            store,
            window,
            timeout,
        }
    }

    /// Decides whether `ticket_id` boards now.
    ///
    /// The store's conditional update is the only place a ticket is
    /// admitted, and it is attempted exactly once per call. When it
    /// changes nothing, a read-only probe names the reason; the probe can
    /// refine the explanation but never turn a refusal into an admission.
    pub async fn validate(&self, ticket_id: &str) -> Result<Decision, AppError> {
        let admitted = bounded(self.timeout, self.store.try_admit(ticket_id, self.window)).await?;
        if admitted {
            info!(ticket_id, "Ticket accepted");
            return Ok(Decision::Accepted);
        }

        let probe = bounded(self.timeout, self.store.probe(ticket_id)).await?;
        let reason = classify(probe, self.window);
        if reason == DenialReason::TimeError {
            error!(ticket_id, "Stored departure could not be evaluated");
        } else {
            debug!(ticket_id, reason = reason.as_str(), "Ticket denied");
        }
        Ok(Decision::Denied(reason))
    }
}
