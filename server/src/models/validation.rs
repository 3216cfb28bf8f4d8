use serde::{Deserialize, Serialize};

use super::ticket::MAX_TICKET_ID_LEN;
use crate::utils::error::AppError;

/// Body of `POST /validate`, as sent by a gate scanner.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    pub ticket_id: Option<String>,
}

impl ValidateRequest {
    /// Boundary check only: any id that fits the column goes to the store,
    /// so unknown codes come back as `not found` rather than `invalid`.
    pub fn ticket_id(&self) -> Result<&str, AppError> {
        let id = self
            .ticket_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("Missing ticket_id".to_string()))?;

        if id.chars().count() > MAX_TICKET_ID_LEN || id.contains('\0') {
            return Err(AppError::Validation("Invalid ticket_id".to_string()));
        }
        Ok(id)
    }
}

/// Body returned by `POST /validate` for every decision.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidateResponse {
    pub valid: bool,
    pub ticket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mins_until_departure: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mins_after_departure: Option<i64>,
}
