/*!
 * API v1 Routes
 *
 * Defines all version 1 API routes and their handlers.
 */

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    book, cancel, change_priority, get_alternatives, get_appointment, get_slots, health,
    move_queue_position, promote_queue_to_scheduled, transition_status, AppState,
};

/// Create API v1 routes
///
/// # Arguments
///
/// * `state` - Application state containing the booking coordinator, query
///   facade and database pool
///
/// # Returns
///
/// Configured router for API v1
pub fn create_api_v1_routes(state: AppState) -> Router {
    Router::new()
        .route("/book", post(book))
        .route("/slots", get(get_slots))
        .route("/alternatives", get(get_alternatives))
        .route("/appointments/{id}", get(get_appointment))
        .route("/cancel/{id}", post(cancel))
        .route("/status/{id}", post(transition_status))
        .route("/priority/{id}", post(change_priority))
        .route("/queue/{id}/move", post(move_queue_position))
        .route("/queue/{id}/promote", post(promote_queue_to_scheduled))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::PolicyConfig;
    use crate::engine::{BookingCoordinator, CatalogCache, EventBus, QueryFacade};
    use crate::repository::MemoryRepository;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn test_app_state() -> AppState {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(SystemClock);
        let catalog = Arc::new(CatalogCache::new(repo.clone(), Duration::from_secs(60)));
        let events = Arc::new(EventBus::new(16));
        let policy = PolicyConfig::default();

        let coordinator = Arc::new(BookingCoordinator::new(
            repo.clone(),
            catalog.clone(),
            events,
            clock.clone(),
            policy.clone(),
        ));
        let facade = Arc::new(QueryFacade::new(repo, catalog, clock, policy));

        AppState {
            coordinator,
            facade,
            pool: sqlx::PgPool::connect_lazy("postgres://invalid/invalid")
                .expect("lazy pool construction never touches the network"),
            start_time: SystemTime::now(),
        }
    }

    #[test]
    fn create_api_v1_routes_builds_without_panicking() {
        let state = test_app_state();
        let _router = create_api_v1_routes(state);
    }
}
