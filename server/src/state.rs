use std::sync::Arc;

use crate::config::Config;
use crate::services::{AdmissionWindow, TicketIssuer, TicketValidator};
use crate::store::TicketStore;

/// Shared by every handler; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TicketStore>,
    pub issuer: TicketIssuer,
    pub validator: TicketValidator,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TicketStore>) -> Self {
        let window = AdmissionWindow::from_minutes(config.window_minutes);
        let issuer = TicketIssuer::new(store.clone(), config.store_timeout);
        let validator = TicketValidator::new(store.clone(), window, config.store_timeout);

        Self {
            config: Arc::new(config),
            store,
            issuer,
            validator,
        }
    }

    pub fn qr_url(&self, ticket_id: &str) -> String {
        format!("{}/qr/{}.png", self.config.server.public_base_url, ticket_id)
    }
}
