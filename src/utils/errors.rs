/*!
 * Error Taxonomy
 *
 * A single `EngineError` enum is the one place HTTP status codes are
 * decided. Every other module returns `Result<T, EngineError>` and never
 * touches `StatusCode` directly. Policy/validation rejections are expected
 * results and carry a best-effort `suggestions` payload; infrastructure and
 * invariant failures carry no suggestions and are logged at `error`.
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Best-effort remediation hints attached to policy/admission rejections.
/// Every field is computed without holding the coordinator lock and may be
/// empty if no alternative could be found cheaply.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Suggestions {
    /// Other start times (minutes since midnight) that would be bookable.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_start_minutes: Vec<u16>,
    /// Other barbers with availability for the same request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_barber_ids: Vec<uuid::Uuid>,
    /// The next calendar date with at least the requested duration free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_date: Option<chrono::NaiveDate>,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.alternative_start_minutes.is_empty()
            && self.alternative_barber_ids.is_empty()
            && self.next_available_date.is_none()
    }
}

/// Stable machine-readable error code, taxonomy per the scheduling core's
/// error handling design.
#[derive(Debug, Clone)]
pub enum EngineError {
    // Input / validation
    InvalidRequest(String),
    UnknownService(uuid::Uuid),
    UnknownAddOn(uuid::Uuid),
    UnknownBarber(uuid::Uuid),
    UnknownAppointment(uuid::Uuid),

    // Policy / admission
    OutsideBookingWindow,
    DayOff,
    BarberOffline,
    QueueFull(Suggestions),
    LunchConflict,
    WorkingHoursExceeded,
    SlotNotAvailable(Suggestions),

    // State machine
    InvalidTransition {
        from: crate::models::AppointmentStatus,
        to: crate::models::AppointmentStatus,
    },

    // Concurrency
    VersionConflict,
    Timeout,

    // Infrastructure
    RepositoryUnavailable(String),
    NotFound(String),
    Internal(String),
}

impl EngineError {
    /// The stable machine code surfaced in the response envelope and used
    /// by clients for programmatic dispatch.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::UnknownService(_) => "UnknownService",
            Self::UnknownAddOn(_) => "UnknownAddOn",
            Self::UnknownBarber(_) => "UnknownBarber",
            Self::UnknownAppointment(_) => "UnknownAppointment",
            Self::OutsideBookingWindow => "OutsideBookingWindow",
            Self::DayOff => "DayOff",
            Self::BarberOffline => "BarberOffline",
            Self::QueueFull(_) => "QueueFull",
            Self::LunchConflict => "LunchConflict",
            Self::WorkingHoursExceeded => "WorkingHoursExceeded",
            Self::SlotNotAvailable(_) => "SlotNotAvailable",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::VersionConflict => "VersionConflict",
            Self::Timeout => "Timeout",
            Self::RepositoryUnavailable(_) => "RepositoryUnavailable",
            Self::NotFound(_) => "NotFound",
            Self::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownService(_)
            | Self::UnknownAddOn(_)
            | Self::UnknownBarber(_)
            | Self::UnknownAppointment(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::OutsideBookingWindow
            | Self::DayOff
            | Self::BarberOffline
            | Self::QueueFull(_)
            | Self::LunchConflict
            | Self::WorkingHoursExceeded
            | Self::SlotNotAvailable(_)
            | Self::InvalidTransition { .. }
            | Self::VersionConflict => StatusCode::CONFLICT,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Best-effort suggestions payload, present only on the variants that carry one.
    pub fn suggestions(&self) -> Option<&Suggestions> {
        match self {
            Self::QueueFull(s) | Self::SlotNotAvailable(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::UnknownService(id) => write!(f, "unknown service: {id}"),
            Self::UnknownAddOn(id) => write!(f, "unknown add-on: {id}"),
            Self::UnknownBarber(id) => write!(f, "unknown barber: {id}"),
            Self::UnknownAppointment(id) => write!(f, "unknown appointment: {id}"),
            Self::OutsideBookingWindow => write!(f, "outside the bookable window"),
            Self::DayOff => write!(f, "barber is off on this date"),
            Self::BarberOffline => write!(f, "barber is offline"),
            Self::QueueFull(_) => write!(f, "queue is full"),
            Self::LunchConflict => write!(f, "interval crosses the lunch break"),
            Self::WorkingHoursExceeded => write!(f, "interval falls outside working hours"),
            Self::SlotNotAvailable(_) => write!(f, "slot is not available"),
            Self::InvalidTransition { from, to } => {
                write!(f, "cannot transition from {from:?} to {to:?}")
            }
            Self::VersionConflict => write!(f, "version conflict"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::RepositoryUnavailable(msg) => write!(f, "repository unavailable: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::error!(error = ?err, "repository unavailable");
                Self::RepositoryUnavailable(err.to_string())
            }
            other => {
                tracing::error!(error = ?other, "unexpected repository error");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!(code = self.code(), %self, "request failed"),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                tracing::error!(code = self.code(), %self, "request failed")
            }
            _ => tracing::warn!(code = self.code(), %self, "request rejected"),
        }

        let status = self.status();
        let suggestions = self.suggestions().cloned();
        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
            "suggestions": suggestions,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_policy_rejections_to_conflict() {
        assert_eq!(EngineError::DayOff.status(), StatusCode::CONFLICT);
        assert_eq!(EngineError::LunchConflict.status(), StatusCode::CONFLICT);
        assert_eq!(EngineError::VersionConflict.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn maps_infrastructure_errors() {
        assert_eq!(
            EngineError::RepositoryUnavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(EngineError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            EngineError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn maps_not_found_variants() {
        assert_eq!(
            EngineError::UnknownAppointment(uuid::Uuid::nil()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(EngineError::OutsideBookingWindow.code(), "OutsideBookingWindow");
        assert_eq!(EngineError::QueueFull(Suggestions::default()).code(), "QueueFull");
    }
}
