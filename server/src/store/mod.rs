//! Ticket persistence.
//!
//! The store is the only shared mutable state in the service. Every
//! correctness-critical step is a single store operation: the admission
//! update in particular must test `used = false` and the departure window
//! and flip `used` as one atomic statement, so that concurrent scans of the
//! same code cannot both succeed.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTicket, Ticket};
use crate::services::admission::AdmissionWindow;

pub mod memory;
pub mod postgres;

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The generated `ticket_id` is already taken. Callers retry with a
    /// fresh id.
    #[error("ticket id already exists")]
    DuplicateTicketId,

    #[error("store call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only snapshot used to explain a refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketProbe {
    pub used: bool,
    /// Seconds from the store's clock to departure; negative once departed.
    /// `None` when the stored departure cannot be evaluated.
    pub seconds_until_departure: Option<i64>,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Inserts a new ticket with `used = false`.
    ///
    /// Fails with [`StoreError::DuplicateTicketId`] if the id is taken.
    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError>;

    /// Atomically marks the ticket used if it exists, is unused and departs
    /// within `window` of the store's current time. Returns whether a row
    /// was updated.
    async fn try_admit(&self, ticket_id: &str, window: AdmissionWindow)
        -> Result<bool, StoreError>;

    /// Never mutates.
    async fn probe(&self, ticket_id: &str) -> Result<Option<TicketProbe>, StoreError>;

    async fn find(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Runs one store call under `limit`. A statement cut off here either
/// committed or did not; there is no intermediate row state to clean up.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}
