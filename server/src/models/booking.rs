use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ticket::{NewTicket, TicketId};
use crate::utils::error::AppError;

/// Body of `POST /book`. Every field is optional on the wire so the first
/// absent one can be named in the error.
#[derive(Debug, Default, Deserialize)]
pub struct BookingRequest {
    pub name: Option<String>,
    pub start_place: Option<String>,
    pub destination: Option<String>,
    pub travel_date: Option<String>,
    pub travel_time: Option<String>,
}

/// Booking input that passed boundary checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub name: String,
    pub start_place: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub travel_time: NaiveTime,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<Booking, AppError> {
        let name = required("name", &self.name)?;
        let start_place = required("start_place", &self.start_place)?;
        let destination = required("destination", &self.destination)?;
        let travel_date = required("travel_date", &self.travel_date)?;
        let travel_time = required("travel_time", &self.travel_time)?;

        let travel_date = NaiveDate::parse_from_str(travel_date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("Invalid travel_date".to_string()))?;
        let travel_time = parse_time(travel_time)
            .ok_or_else(|| AppError::Validation("Invalid travel_time".to_string()))?;

        Ok(Booking {
            name: name.to_string(),
            start_place: start_place.to_string(),
            destination: destination.to_string(),
            travel_date,
            travel_time,
        })
    }
}

impl Booking {
    pub fn with_id(&self, ticket_id: TicketId) -> NewTicket {
        NewTicket {
            ticket_id,
            name: self.name.clone(),
            start_place: self.start_place.clone(),
            destination: self.destination.clone(),
            travel_date: self.travel_date,
            travel_time: self.travel_time,
        }
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, AppError> {
    let value = value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing {field}")))?;

    // Postgres text cannot hold NUL.
    if value.contains('\0') {
        return Err(AppError::Validation(format!("Invalid {field}")));
    }
    Ok(value)
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub ticket_id: String,
    pub qr_url: String,
}
