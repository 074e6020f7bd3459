/*!
 * Repository
 *
 * The persistence seam the engine depends on (§6 of the design). Expressed
 * as an object-safe async trait so the Booking Coordinator, Query Facade and
 * tests depend only on the interface, never on a concrete store. The trait
 * guarantees read-your-writes within a single coordinator operation but
 * makes no linearizability promise across `(barber_id, service_date)` keys —
 * that promise is the in-process coordinator lock's job (`engine::coordinator`).
 */

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::{AddOn, Appointment, AppointmentKind, AppointmentStatus, Barber, Priority, Service};
use crate::utils::Result;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Everything needed to construct a brand-new row. `id`, `created_at`,
/// `updated_at` and `version` are assigned by the repository at insert time.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub barber_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub service_date: NaiveDate,
    pub appointment_kind: AppointmentKind,
    pub start_time: Option<NaiveTime>,
    pub queue_position: Option<i32>,
    pub priority: Priority,
    pub status: AppointmentStatus,
    pub total_duration_min: i32,
    pub service_ids: Vec<Uuid>,
    pub addon_ids: Vec<Uuid>,
    pub total_price: i64,
    pub notes: String,
    pub friend_name: Option<String>,
    pub friend_phone: Option<String>,
    pub friend_email: Option<String>,
    pub primary_customer_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

/// A partial update to an existing row. Every field is a plain `Option` for
/// "leave unchanged" (`None`) vs. "set to" (`Some(_)`), except the two
/// fields an operation may need to *clear* (`start_time`, `queue_position`),
/// which use a double `Option` so "unchanged" and "set to null" are distinct.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub appointment_kind: Option<AppointmentKind>,
    pub start_time: Option<Option<NaiveTime>>,
    pub queue_position: Option<Option<i32>>,
    pub priority: Option<Priority>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.appointment_kind.is_none()
            && self.start_time.is_none()
            && self.queue_position.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }
}

/// Repository interface the engine requires. No method assumes a particular
/// backing store; `PostgresRepository` and `MemoryRepository` both implement it.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Snapshot of appointments for one `(barber, date)`, ordered by
    /// `(kind asc: scheduled<queue, start_time asc, queue_position asc)`.
    async fn list_appointments(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        statuses: &[AppointmentStatus],
    ) -> Result<Vec<Appointment>>;

    async fn get_services(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Service>>;
    async fn get_addons(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AddOn>>;

    async fn get_barber(&self, id: Uuid) -> Result<Barber>;
    async fn list_active_barbers(&self) -> Result<Vec<Barber>>;

    async fn is_day_off(&self, barber_id: Uuid, date: NaiveDate) -> Result<bool>;

    /// Atomic w.r.t. other operations within the same `(barber, date)`
    /// logical lock (enforced by the caller holding the coordinator lock).
    async fn insert_appointment(&self, row: NewAppointment) -> Result<Appointment>;

    /// Fails with `EngineError::VersionConflict` if `expected_version` is stale.
    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: i32,
    ) -> Result<Appointment>;

    /// Bulk, transactional reassignment of `queue_position` values.
    async fn renumber_queue(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        mapping: &[(Uuid, i32)],
    ) -> Result<()>;

    /// Supports idempotent retries of `book`: a hit short-circuits admission
    /// and insertion entirely.
    async fn find_by_idempotency_key(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        key: &str,
    ) -> Result<Option<Appointment>>;

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment>;
}
