/*!
 * Catalog & Reference Models
 *
 * Service, AddOn, Barber and DayOff rows. These are treated as immutable
 * catalog/reference data during a booking — the engine resolves ids to
 * durations once at creation time and never re-reads the catalog for an
 * appointment that already exists.
 */

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable service offered by the shop.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub price: i64,
    pub active: bool,
}

/// An optional add-on attachable to a booking.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AddOn {
    pub id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub price: i64,
    pub active: bool,
}

/// Availability status of a barber, independent of any specific day's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "barber_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BarberStatus {
    Available,
    Busy,
    Offline,
}

impl BarberStatus {
    /// Whether a barber in this status can be booked at all. `Offline` barbers
    /// reject every booking attempt regardless of timeline capacity.
    pub fn is_bookable(&self) -> bool {
        !matches!(self, BarberStatus::Offline)
    }
}

/// A barber. The engine only consults `id` and `status` for availability
/// reasoning; `avg_rating`/`rating_count` are opaque pass-through used solely
/// as a tie-break in `find_alternatives`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Barber {
    pub id: Uuid,
    pub display_name: String,
    pub status: BarberStatus,
    pub avg_rating: f64,
    pub rating_count: i32,
}

/// A closed date range (inclusive on both ends) during which a barber is
/// unbookable. Read-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DayOff {
    pub barber_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl DayOff {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
