use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Connection;

use super::{StoreError, TicketProbe, TicketStore};
use crate::config::DatabaseConfig;
use crate::models::{NewTicket, Ticket};
use crate::services::admission::AdmissionWindow;

const TICKET_COLUMNS: &str =
    "id, ticket_id, name, start_place, destination, travel_date, travel_time, used, created_at";

/// `tickets` table in PostgreSQL.
///
/// Each call borrows a pooled connection for a single statement; the
/// connection goes back to the pool when the statement future completes or
/// is dropped.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateTicketId,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError> {
        let sql = format!(
            "INSERT INTO tickets (ticket_id, name, start_place, destination, travel_date, travel_time)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TICKET_COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket.ticket_id.as_str())
            .bind(&ticket.name)
            .bind(&ticket.start_place)
            .bind(&ticket.destination)
            .bind(ticket.travel_date)
            .bind(ticket.travel_time)
            .fetch_one(&self.pool)
            .await
            .map_err(insert_error)
    }

    async fn try_admit(
        &self,
        ticket_id: &str,
        window: AdmissionWindow,
    ) -> Result<bool, StoreError> {
        // Existence, the used flag and the window are all tested by the same
        // statement that flips the flag, against the database clock.
        let result = sqlx::query(
            "UPDATE tickets
             SET used = TRUE
             WHERE ticket_id = $1
               AND used = FALSE
               AND (travel_date + travel_time) - LOCALTIMESTAMP
                   BETWEEN INTERVAL '0 seconds' AND make_interval(secs => $2)",
        )
        .bind(ticket_id)
        .bind(window.seconds() as f64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn probe(&self, ticket_id: &str) -> Result<Option<TicketProbe>, StoreError> {
        let row: Option<(bool, Option<i64>)> = sqlx::query_as(
            "SELECT used,
                    FLOOR(EXTRACT(EPOCH FROM (travel_date + travel_time) - LOCALTIMESTAMP))::BIGINT
             FROM tickets
             WHERE ticket_id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(used, seconds_until_departure)| TicketProbe {
            used,
            seconds_until_departure,
        }))
    }

    async fn find(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1");
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }
}
