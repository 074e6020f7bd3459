/*!
 * HTTP Request Handlers Module
 *
 * Contains all HTTP request handlers for the API endpoints, plus the
 * shared `AppState` they extract. Handlers are a thin translation layer:
 * validate the request shape, call into the engine, map the result (or
 * `EngineError`) onto a response.
 */

pub mod appointments;

use std::sync::Arc;
use std::time::SystemTime;

use sqlx::PgPool;

use crate::engine::{BookingCoordinator, QueryFacade};

pub use appointments::{
    book, cancel, change_priority, get_alternatives, get_appointment, get_slots, health,
    move_queue_position, promote_queue_to_scheduled, transition_status,
};

/// Shared state handed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BookingCoordinator>,
    pub facade: Arc<QueryFacade>,
    pub pool: PgPool,
    pub start_time: SystemTime,
}
