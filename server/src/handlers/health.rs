use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use tracing::error;

use crate::state::AppState;
use crate::store::bounded;
use crate::utils::response::{success, with_status};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
}

/// Liveness only; never touches the store.
pub async fn health_check() -> Response {
    success(HealthPayload { status: "ok" })
}

#[derive(Serialize)]
struct DbPingPayload {
    db: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
}

pub async fn db_ping(State(state): State<AppState>) -> Response {
    match bounded(state.config.store_timeout, state.store.ping()).await {
        Ok(()) => success(DbPingPayload {
            db: "ok",
            msg: None,
        }),
        Err(e) => {
            error!(error = ?e, "Store ping failed");
            let msg = if state.config.expose_internal_errors {
                e.to_string()
            } else {
                "ticket store unreachable".to_string()
            };
            with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                DbPingPayload {
                    db: "error",
                    msg: Some(msg),
                },
            )
        }
    }
}
