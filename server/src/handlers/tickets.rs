use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;

use crate::models::{BookingRequest, BookingResponse, TicketId, ValidateRequest};
use crate::render::render_png;
use crate::services::DecisionResponse;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Scanners and the booking form are lenient about what they send: the body
/// is read as JSON whatever its `Content-Type`, an empty body counts as `{}`,
/// and anything unreadable is a plain 400.
fn json_body<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
}

pub async fn book(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let booking = json_body::<BookingRequest>(&body)?.validate()?;
    let ticket = state.issuer.issue(&booking).await?;

    Ok(success(BookingResponse {
        qr_url: state.qr_url(&ticket.ticket_id),
        ticket_id: ticket.ticket_id,
    }))
}

/// `GET /qr/{ticket_id}.png`. Rendering depends on the path alone; the
/// ticket need not exist.
pub async fn qr_image(Path(file): Path<String>) -> Result<Response, AppError> {
    let ticket_id = file
        .strip_suffix(".png")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::NotFound(format!("No image at '{file}'")))?;

    let png = render_png(ticket_id)?;
    // Arbitrary path text must not end up inside a header.
    let filename = if TicketId::is_well_formed(ticket_id) {
        format!("{ticket_id}.png")
    } else {
        "ticket.png".to_string()
    };
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        png,
    )
        .into_response())
}

pub async fn validate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ValidateRequest = json_body(&body)?;
    let ticket_id = request.ticket_id()?;
    let decision = state.validator.validate(ticket_id).await?;

    Ok(DecisionResponse {
        ticket_id: ticket_id.to_string(),
        decision,
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_reads_as_empty_object() {
        let request: ValidateRequest = json_body(&Bytes::from_static(b" \n")).unwrap();
        assert!(request.ticket_id.is_none());
    }

    #[test]
    fn test_malformed_body_is_a_validation_error() {
        let err = json_body::<BookingRequest>(&Bytes::from_static(b"{\"name\":")).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("Invalid JSON body")));
    }
}
