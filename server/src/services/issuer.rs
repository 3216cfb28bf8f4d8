use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::{Booking, Ticket, TicketId};
use crate::store::{bounded, StoreError, TicketStore};
use crate::utils::error::AppError;

/// A run of collisions this long means the id space or the unique index is
/// broken, not bad luck.
pub const MAX_ID_ATTEMPTS: usize = 5;

type IdSource = Arc<dyn Fn() -> TicketId + Send + Sync>;

/// Writes new tickets.
#[derive(Clone)]
pub struct TicketIssuer {
    store: Arc<dyn TicketStore>,
    timeout: Duration,
    next_id: IdSource,
}

impl TicketIssuer {
    pub fn new(store: Arc<dyn TicketStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            next_id: Arc::new(TicketId::generate),
        }
    }

    /// Replaces the random id source; used to force collisions in tests.
    pub fn with_id_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> TicketId + Send + Sync + 'static,
    {
        self.next_id = Arc::new(source);
        self
    }

    /// Inserts one unused ticket for `booking` under a fresh id, drawing a
    /// new id whenever the store reports a collision.
    pub async fn issue(&self, booking: &Booking) -> Result<Ticket, AppError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let new_ticket = booking.with_id((self.next_id)());
            match bounded(self.timeout, self.store.insert(&new_ticket)).await {
                Ok(ticket) => {
                    info!(ticket_id = %ticket.ticket_id, "Ticket issued");
                    return Ok(ticket);
                }
                Err(StoreError::DuplicateTicketId) => {
                    warn!(
                        ticket_id = %new_ticket.ticket_id,
                        attempt,
                        "Ticket id collision, drawing a new id"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(format!(
            "no unused ticket id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTicketStore;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn booking() -> Booking {
        Booking {
            name: "Afrin".to_string(),
            start_place: "Katpadi".to_string(),
            destination: "Kochi".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            travel_time: NaiveTime::from_hms_opt(10, 59, 0).unwrap(),
        }
    }

    fn issuer(store: &MemoryTicketStore) -> TicketIssuer {
        TicketIssuer::new(Arc::new(store.clone()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_issue_writes_one_unused_row() {
        let store = MemoryTicketStore::new();
        let ticket = issuer(&store).issue(&booking()).await.unwrap();

        assert!(TicketId::is_well_formed(&ticket.ticket_id));
        assert!(!ticket.used);
        assert_eq!(ticket.name, "Afrin");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_issued_ids_are_distinct() {
        let store = MemoryTicketStore::new();
        let issuer = issuer(&store);
        let mut ids = HashSet::new();
        for _ in 0..100 {
            ids.insert(issuer.issue(&booking()).await.unwrap().ticket_id);
        }
        assert_eq!(ids.len(), 100);
        assert_eq!(store.len().await, 100);
    }

    #[tokio::test]
    async fn test_collision_is_retried_with_fresh_id() {
        let store = MemoryTicketStore::new();
        let taken = TicketId::parse("T-AAA0000").unwrap();
        store.insert(&booking().with_id(taken.clone())).await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let issuer = issuer(&store).with_id_source(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                TicketId::parse("T-AAA0000").unwrap()
            } else {
                TicketId::parse("T-BBB1111").unwrap()
            }
        });

        let ticket = issuer.issue(&booking()).await.unwrap();
        assert_eq!(ticket.ticket_id, "T-BBB1111");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_persistent_collisions_give_up() {
        let store = MemoryTicketStore::new();
        store
            .insert(&booking().with_id(TicketId::parse("T-AAA0000").unwrap()))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let issuer = issuer(&store).with_id_source(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            TicketId::parse("T-AAA0000").unwrap()
        });

        let err = issuer.issue(&booking()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ID_ATTEMPTS);
        assert_eq!(store.len().await, 1);
    }
}
