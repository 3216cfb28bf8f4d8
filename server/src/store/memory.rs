use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime, Utc};
use tokio::sync::Mutex;

use super::{StoreError, TicketProbe, TicketStore};
use crate::models::{NewTicket, Ticket};
use crate::services::admission::{floor_seconds, AdmissionWindow};

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Default)]
struct Rows {
    next_id: i64,
    by_ticket_id: HashMap<String, Ticket>,
}

/// In-process ticket store for tests and database-less development.
///
/// Every operation holds one lock for its whole duration, which gives the
/// admission update the same all-or-nothing behaviour as a single SQL
/// statement. The clock stands in for the database's `LOCALTIMESTAMP`.
#[derive(Clone)]
pub struct MemoryTicketStore {
    rows: Arc<Mutex<Rows>>,
    clock: Clock,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::with_clock(|| Local::now().naive_local())
    }

    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        Self {
            rows: Arc::new(Mutex::new(Rows::default())),
            clock: Arc::new(clock),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.by_ticket_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Exact, not rounded: the window is compared at full precision.
    fn until_departure(&self, ticket: &Ticket) -> Duration {
        ticket.departure_instant() - (self.clock)()
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.by_ticket_id.contains_key(ticket.ticket_id.as_str()) {
            return Err(StoreError::DuplicateTicketId);
        }

        rows.next_id += 1;
        let row = Ticket {
            id: rows.next_id,
            ticket_id: ticket.ticket_id.to_string(),
            name: ticket.name.clone(),
            start_place: ticket.start_place.clone(),
            destination: ticket.destination.clone(),
            travel_date: ticket.travel_date,
            travel_time: ticket.travel_time,
            used: false,
            created_at: Utc::now(),
        };
        rows.by_ticket_id.insert(row.ticket_id.clone(), row.clone());
        Ok(row)
    }

    async fn try_admit(
        &self,
        ticket_id: &str,
        window: AdmissionWindow,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        let Some(ticket) = rows.by_ticket_id.get_mut(ticket_id) else {
            return Ok(false);
        };
        if ticket.used {
            return Ok(false);
        }

        if !window.admits(self.until_departure(ticket)) {
            return Ok(false);
        }

        ticket.used = true;
        Ok(true)
    }

    async fn probe(&self, ticket_id: &str) -> Result<Option<TicketProbe>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.by_ticket_id.get(ticket_id).map(|ticket| TicketProbe {
            used: ticket.used,
            seconds_until_departure: Some(floor_seconds(self.until_departure(ticket))),
        }))
    }

    async fn find(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self.rows.lock().await.by_ticket_id.get(ticket_id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
