pub mod booking;
pub mod ticket;
pub mod validation;

pub use booking::{Booking, BookingRequest, BookingResponse};
pub use ticket::{NewTicket, Ticket, TicketId};
pub use validation::{ValidateRequest, ValidateResponse};
