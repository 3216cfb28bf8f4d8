pub mod health;
pub mod tickets;

pub use health::{db_ping, health_check};
pub use tickets::{book, qr_image, validate};
