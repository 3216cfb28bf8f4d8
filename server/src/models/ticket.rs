use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

const TICKET_ID_PREFIX: &str = "T-";
const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8; 10] = b"0123456789";

/// Column width of `tickets.ticket_id`.
pub const MAX_TICKET_ID_LEN: usize = 50;

/// Human-transcribable ticket code, `T-` followed by three letters and four
/// digits, e.g. `T-ABC1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Draws a fresh id from the operating system's CSPRNG. Ids must not be
    /// guessable: knowing one is enough to board.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let mut id = String::with_capacity(TICKET_ID_PREFIX.len() + 7);
        id.push_str(TICKET_ID_PREFIX);
        for _ in 0..3 {
            id.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
        }
        for _ in 0..4 {
            id.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
        }
        Self(id)
    }

    /// Accepts only codes of the generated shape.
    pub fn parse(candidate: &str) -> Option<Self> {
        Self::is_well_formed(candidate).then(|| Self(candidate.to_string()))
    }

    pub fn is_well_formed(candidate: &str) -> bool {
        let Some(body) = candidate.strip_prefix(TICKET_ID_PREFIX) else {
            return false;
        };
        let bytes = body.as_bytes();
        bytes.len() == 7
            && bytes[..3].iter().all(u8::is_ascii_uppercase)
            && bytes[3..].iter().all(u8::is_ascii_digit)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A persisted ticket row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub ticket_id: String,
    pub name: String,
    pub start_place: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub travel_time: NaiveTime,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Scheduled departure in the deployment's local time.
    pub fn departure_instant(&self) -> NaiveDateTime {
        self.travel_date.and_time(self.travel_time)
    }
}

/// A validated booking, ready to be written with `used = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub ticket_id: TicketId,
    pub name: String,
    pub start_place: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub travel_time: NaiveTime,
}

impl NewTicket {
    pub fn departure_instant(&self) -> NaiveDateTime {
        self.travel_date.and_time(self.travel_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..1000 {
            let id = TicketId::generate();
            assert!(TicketId::is_well_formed(id.as_str()), "bad id {id}");
        }
    }

    #[test]
    fn test_generated_ids_vary() {
        let ids: HashSet<TicketId> = (0..200).map(|_| TicketId::generate()).collect();
        // 200 draws from ~1.76e8 codes; a handful of repeats would mean a broken source.
        assert!(ids.len() >= 199);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(TicketId::is_well_formed("T-ABC1234"));
        assert!(!TicketId::is_well_formed("T-abc1234"));
        assert!(!TicketId::is_well_formed("T-AB12345"));
        assert!(!TicketId::is_well_formed("X-ABC1234"));
        assert!(!TicketId::is_well_formed("T-ABC123"));
        assert!(!TicketId::is_well_formed(""));
    }

    #[test]
    fn test_departure_instant_combines_date_and_time() {
        let ticket = NewTicket {
            ticket_id: TicketId::generate(),
            name: "Afrin".to_string(),
            start_place: "Katpadi".to_string(),
            destination: "Kochi".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            travel_time: NaiveTime::from_hms_opt(10, 59, 0).unwrap(),
        };
        assert_eq!(
            ticket.departure_instant().to_string(),
            "2025-12-01 10:59:00"
        );
    }
}
