//! Admission policy: when a ticket may be validated, and how a refused
//! validation is explained.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Duration;

use crate::models::ValidateResponse;
use crate::store::TicketProbe;
use crate::utils::response::with_status;

/// The interval `[departure - minutes, departure]` during which a ticket
/// may be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionWindow {
    minutes: i64,
}

/// Where a moment falls relative to a ticket's admission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    TooEarly,
    Open,
    Departed,
}

impl AdmissionWindow {
    pub const DEFAULT_MINUTES: i64 = 20;
    /// One day. Longer windows are rejected by configuration.
    pub const MAX_MINUTES: i64 = 24 * 60;

    /// `minutes` is clamped to `0..=MAX_MINUTES`.
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            minutes: minutes.clamp(0, Self::MAX_MINUTES),
        }
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn seconds(&self) -> i64 {
        self.minutes * 60
    }

    /// Both ends are inclusive: exactly `minutes` before departure and the
    /// departure second itself are admitted.
    pub fn position(&self, seconds_until_departure: i64) -> WindowPosition {
        if seconds_until_departure < 0 {
            WindowPosition::Departed
        } else if seconds_until_departure > self.seconds() {
            WindowPosition::TooEarly
        } else {
            WindowPosition::Open
        }
    }

    /// Same predicate as the database's interval comparison, at full
    /// precision: half a second after departure is already departed.
    pub fn position_at(&self, until_departure: Duration) -> WindowPosition {
        if until_departure < Duration::zero() {
            WindowPosition::Departed
        } else if until_departure > Duration::seconds(self.seconds()) {
            WindowPosition::TooEarly
        } else {
            WindowPosition::Open
        }
    }

    pub fn admits(&self, until_departure: Duration) -> bool {
        self.position_at(until_departure) == WindowPosition::Open
    }
}

/// Whole seconds rounded toward negative infinity, matching
/// `FLOOR(EXTRACT(EPOCH FROM ...))` on the database side.
pub fn floor_seconds(delta: Duration) -> i64 {
    let truncated = delta.num_seconds();
    if delta < Duration::seconds(truncated) {
        truncated - 1
    } else {
        truncated
    }
}

impl Default for AdmissionWindow {
    fn default() -> Self {
        Self::from_minutes(Self::DEFAULT_MINUTES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    NotFound,
    AlreadyUsed,
    TooEarly {
        minutes_until_departure: i64,
        window_minutes: i64,
    },
    AfterDeparture {
        minutes_since_departure: i64,
    },
    /// The stored departure could not be evaluated. Insert-time parsing
    /// makes this unreachable for rows written by the issuer.
    TimeError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Denied(DenialReason),
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotFound => "not found",
            DenialReason::AlreadyUsed => "already used",
            DenialReason::TooEarly { .. } => "too early",
            DenialReason::AfterDeparture { .. } => "after departure",
            DenialReason::TimeError => "time error",
        }
    }
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Decision::Accepted => StatusCode::OK,
            Decision::Denied(DenialReason::NotFound) => StatusCode::NOT_FOUND,
            Decision::Denied(DenialReason::AlreadyUsed) => StatusCode::CONFLICT,
            Decision::Denied(DenialReason::TooEarly { .. })
            | Decision::Denied(DenialReason::AfterDeparture { .. }) => StatusCode::FORBIDDEN,
            Decision::Denied(DenialReason::TimeError) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response_body(&self, ticket_id: &str) -> ValidateResponse {
        let mut body = ValidateResponse {
            valid: self.is_accepted(),
            ticket_id: ticket_id.to_string(),
            reason: None,
            mins_until_departure: None,
            window_minutes: None,
            mins_after_departure: None,
        };

        if let Decision::Denied(reason) = self {
            body.reason = Some(reason.as_str().to_string());
            match reason {
                DenialReason::TooEarly {
                    minutes_until_departure,
                    window_minutes,
                } => {
                    body.mins_until_departure = Some(*minutes_until_departure);
                    body.window_minutes = Some(*window_minutes);
                }
                DenialReason::AfterDeparture {
                    minutes_since_departure,
                } => {
                    body.mins_after_departure = Some(*minutes_since_departure);
                }
                _ => {}
            }
        }
        body
    }
}

/// Explains why the admission update touched no row.
///
/// `probe` is read after the update, so it may reflect a concurrent
/// validation or a clock that moved on. A probe that still looks admissible
/// means the window opened between the two statements; the update's refusal
/// stands and is reported as too early.
pub fn classify(probe: Option<TicketProbe>, window: AdmissionWindow) -> DenialReason {
    let Some(probe) = probe else {
        return DenialReason::NotFound;
    };
    if probe.used {
        return DenialReason::AlreadyUsed;
    }
    let Some(seconds) = probe.seconds_until_departure else {
        return DenialReason::TimeError;
    };

    match window.position(seconds) {
        WindowPosition::Departed => DenialReason::AfterDeparture {
            minutes_since_departure: -seconds / 60,
        },
        WindowPosition::TooEarly | WindowPosition::Open => DenialReason::TooEarly {
            minutes_until_departure: seconds / 60,
            window_minutes: window.minutes(),
        },
    }
}

/// A decision about one ticket, ready to send back to the scanner.
pub struct DecisionResponse {
    pub ticket_id: String,
    pub decision: Decision,
}

impl IntoResponse for DecisionResponse {
    fn into_response(self) -> Response {
        with_status(
            self.decision.status_code(),
            self.decision.to_response_body(&self.ticket_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: AdmissionWindow = AdmissionWindow { minutes: 20 };

    fn unused(seconds: i64) -> Option<TicketProbe> {
        Some(TicketProbe {
            used: false,
            seconds_until_departure: Some(seconds),
        })
    }

    #[test]
    fn test_window_boundaries() {
        assert_eq!(WINDOW.position(20 * 60), WindowPosition::Open);
        assert_eq!(WINDOW.position(20 * 60 + 1), WindowPosition::TooEarly);
        assert_eq!(WINDOW.position(0), WindowPosition::Open);
        assert_eq!(WINDOW.position(-1), WindowPosition::Departed);
        assert!(WINDOW.admits(Duration::minutes(5)));
    }

    #[test]
    fn test_sub_second_boundaries() {
        let half = Duration::milliseconds(500);
        assert_eq!(WINDOW.position_at(-half), WindowPosition::Departed);
        assert_eq!(
            WINDOW.position_at(Duration::seconds(1200) + half),
            WindowPosition::TooEarly
        );
        assert_eq!(WINDOW.position_at(Duration::zero()), WindowPosition::Open);
        assert_eq!(
            WINDOW.position_at(Duration::seconds(1200)),
            WindowPosition::Open
        );
    }

    #[test]
    fn test_floor_seconds() {
        assert_eq!(floor_seconds(Duration::milliseconds(-500)), -1);
        assert_eq!(floor_seconds(Duration::milliseconds(1500)), 1);
        assert_eq!(floor_seconds(Duration::seconds(-3)), -3);
        assert_eq!(floor_seconds(Duration::zero()), 0);
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let window = AdmissionWindow::from_minutes(i64::MAX / 2);
        assert_eq!(window.minutes(), AdmissionWindow::MAX_MINUTES);
        assert_eq!(window.position(0), WindowPosition::Open);
        assert_eq!(AdmissionWindow::from_minutes(-5).minutes(), 0);
    }

    #[test]
    fn test_default_window_is_twenty_minutes() {
        assert_eq!(AdmissionWindow::default(), WINDOW);
        assert_eq!(WINDOW.seconds(), 1200);
    }

    #[test]
    fn test_classify_missing_row() {
        assert_eq!(classify(None, WINDOW), DenialReason::NotFound);
    }

    #[test]
    fn test_classify_used_wins_over_window() {
        let probe = Some(TicketProbe {
            used: true,
            seconds_until_departure: Some(-3600),
        });
        assert_eq!(classify(probe, WINDOW), DenialReason::AlreadyUsed);
    }

    #[test]
    fn test_classify_too_early() {
        assert_eq!(
            classify(unused(2 * 3600 + 30), WINDOW),
            DenialReason::TooEarly {
                minutes_until_departure: 120,
                window_minutes: 20
            }
        );
    }

    #[test]
    fn test_classify_after_departure() {
        assert_eq!(
            classify(unused(-(5 * 60 + 10)), WINDOW),
            DenialReason::AfterDeparture {
                minutes_since_departure: 5
            }
        );
        assert_eq!(
            classify(unused(-1), WINDOW),
            DenialReason::AfterDeparture {
                minutes_since_departure: 0
            }
        );
    }

    #[test]
    fn test_classify_unevaluable_departure() {
        let probe = Some(TicketProbe {
            used: false,
            seconds_until_departure: None,
        });
        assert_eq!(classify(probe, WINDOW), DenialReason::TimeError);
    }

    #[test]
    fn test_classify_window_opened_after_update() {
        assert_eq!(
            classify(unused(20 * 60), WINDOW),
            DenialReason::TooEarly {
                minutes_until_departure: 20,
                window_minutes: 20
            }
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Decision::Accepted.status_code(), StatusCode::OK);
        assert_eq!(
            Decision::Denied(DenialReason::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Decision::Denied(DenialReason::AlreadyUsed).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Decision::Denied(DenialReason::AfterDeparture {
                minutes_since_departure: 3
            })
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Decision::Denied(DenialReason::TimeError).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_body_for_too_early() {
        let decision = Decision::Denied(DenialReason::TooEarly {
            minutes_until_departure: 45,
            window_minutes: 20,
        });
        let body = decision.to_response_body("T-ABC1234");
        assert!(!body.valid);
        assert_eq!(body.reason.as_deref(), Some("too early"));
        assert_eq!(body.mins_until_departure, Some(45));
        assert_eq!(body.window_minutes, Some(20));
        assert_eq!(body.mins_after_departure, None);
    }

    #[test]
    fn test_response_body_for_accepted() {
        let body = Decision::Accepted.to_response_body("T-ABC1234");
        assert!(body.valid);
        assert_eq!(body.reason, None);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"valid": true, "ticket_id": "T-ABC1234"})
        );
    }
}
