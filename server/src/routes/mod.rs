use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{book, db_ping, health_check, qr_image, validate};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = create_cors_layer(&state.config);
    let security_headers = create_security_headers_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/db-ping", get(db_ping))
        .route("/book", post(book))
        .route("/qr/:file", get(qr_image))
        .route("/validate", post(validate))
        .with_state(state)
        .layer(security_headers)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
