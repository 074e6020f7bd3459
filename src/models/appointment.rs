/*!
 * Appointment Data Model
 *
 * The Appointment is the central row of the scheduling core. Every field
 * here is authoritative over the persisted layout described for the
 * Repository; DTOs below are the shapes exposed across the HTTP boundary.
 */

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Whether an appointment occupies a committed start time or a queue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Scheduled,
    Queue,
}

/// Urgency of a queue appointment; also usable as a tie-break for display.
///
/// Ordered from most to least urgent so `priority.rank()` sorts correctly
/// without a second lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Lower rank sorts first: urgent < high < normal < low.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Lifecycle status of an appointment. See the state machine in
/// `AppointmentStatus::can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Ongoing,
    Done,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Whether a transition from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, Ongoing)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (Ongoing, Done)
        )
    }

    /// Whether this status counts toward the active timeline (affects conflict
    /// detection, queue contiguity, and capacity accounting).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Ongoing
        )
    }

    /// Whether this status is terminal (no further transitions are possible).
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Done | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

/// Optional sub-record present when a customer books on behalf of someone else.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FriendBlock {
    pub friend_name: String,
    pub friend_phone: Option<String>,
    pub friend_email: Option<String>,
    /// The account that made the booking, when it differs from the subject.
    pub primary_customer_id: Option<Uuid>,
}

/// The central scheduling row: one appointment, scheduled or queued,
/// belonging to exactly one `(barber_id, service_date)` timeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub barber_id: Uuid,
    /// Null when booked for a friend with only contact details on file.
    pub customer_id: Option<Uuid>,
    pub service_date: NaiveDate,
    pub appointment_kind: AppointmentKind,
    /// Required iff `appointment_kind == Scheduled`.
    pub start_time: Option<NaiveTime>,
    /// Required iff `appointment_kind == Queue`.
    pub queue_position: Option<i32>,
    pub priority: Priority,
    pub status: AppointmentStatus,
    pub total_duration_min: i32,
    /// Ordered list of service ids; order is preserved for display only and
    /// never read by the timing engine (durations are summed regardless of order).
    pub service_ids: Vec<Uuid>,
    pub addon_ids: Vec<Uuid>,
    pub total_price: i64,
    pub notes: String,
    pub friend_name: Option<String>,
    pub friend_phone: Option<String>,
    pub friend_email: Option<String>,
    pub primary_customer_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub version: i32,
}

impl Appointment {
    /// Minutes-since-midnight view of `start_time`, when scheduled.
    pub fn start_minute(&self) -> Option<u16> {
        self.start_time.map(|t| (t.hour() * 60 + t.minute()) as u16)
    }

    pub fn end_minute(&self) -> Option<u16> {
        self.start_minute().map(|s| s + self.total_duration_min as u16)
    }

    pub fn friend_block(&self) -> Option<FriendBlock> {
        self.friend_name.clone().map(|friend_name| FriendBlock {
            friend_name,
            friend_phone: self.friend_phone.clone(),
            friend_email: self.friend_email.clone(),
            primary_customer_id: self.primary_customer_id,
        })
    }
}

/// Request body for `POST /book`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookRequest {
    pub barber_id: Uuid,
    pub service_date: NaiveDate,
    pub kind: AppointmentKind,
    /// Required iff `kind == Scheduled`; an `"HH:MM"` local time-of-day.
    pub start_time: Option<String>,
    #[validate(length(min = 1, message = "at least one service is required"))]
    pub service_ids: Vec<Uuid>,
    #[validate(length(max = 10, message = "too many add-ons"))]
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    #[serde(default)]
    pub priority: Priority,
    pub customer_id: Option<Uuid>,
    pub friend_block: Option<FriendBlock>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: String,
    pub idempotency_key: String,
}

/// Response body for `POST /book`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingResult {
    pub appointment_id: Uuid,
    pub kind: AppointmentKind,
    pub start_time: Option<String>,
    pub queue_position: Option<i32>,
    pub estimated_start_time: String,
    pub estimated_end_time: String,
    pub version: i32,
}

/// Request body for `POST /status/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransitionStatusRequest {
    pub new_status: AppointmentStatus,
    pub expected_version: i32,
}

/// Request body for `POST /priority/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePriorityRequest {
    pub new_priority: Priority,
    pub expected_version: i32,
}

/// Request body for `POST /queue/{id}/move`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MoveQueuePositionRequest {
    #[validate(range(min = 1, message = "position must be at least 1"))]
    pub new_position: i32,
    pub expected_version: i32,
}

/// Request body for `POST /cancel/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelRequest {
    pub expected_version: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_follow_state_machine() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(NoShow));
        assert!(Confirmed.can_transition_to(Ongoing));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(Ongoing.can_transition_to(Done));

        assert!(!Pending.can_transition_to(Ongoing));
        assert!(!Pending.can_transition_to(Done));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Ongoing.can_transition_to(Cancelled));
    }

    #[test]
    fn active_statuses() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(AppointmentStatus::Ongoing.is_active());
        assert!(!AppointmentStatus::Done.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
        assert!(!AppointmentStatus::NoShow.is_active());
    }

    #[test]
    fn priority_ranks_most_urgent_first() {
        let mut priorities = vec![Priority::Low, Priority::Urgent, Priority::Normal, Priority::High];
        priorities.sort_by_key(|p| p.rank());
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::High, Priority::Normal, Priority::Low]
        );
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
        let json = serde_json::to_string(&AppointmentKind::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
    }
}
