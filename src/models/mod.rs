/*!
 * Data Models Module
 *
 * The scheduling row (`Appointment`) and the read-mostly reference data it
 * is built from (`Service`, `AddOn`, `Barber`, `DayOff`).
 */

pub mod appointment;
pub mod catalog;

pub use appointment::{
    Appointment, AppointmentKind, AppointmentStatus, BookRequest, BookingResult,
    CancelRequest, ChangePriorityRequest, FriendBlock, MoveQueuePositionRequest, Priority,
    TransitionStatusRequest,
};
pub use catalog::{AddOn, Barber, BarberStatus, DayOff, Service};
