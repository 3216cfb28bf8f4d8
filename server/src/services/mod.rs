pub mod admission;
pub mod issuer;
pub mod validator;

pub use admission::{AdmissionWindow, Decision, DecisionResponse, DenialReason};
pub use issuer::TicketIssuer;
pub use validator::TicketValidator;
