/*!
 * Barbershop Scheduling Engine
 *
 * Main application entry point for the Axum-based REST API server.
 */

mod clock;
mod config;
mod db;
mod engine;
mod handlers;
mod middleware;
mod models;
mod repository;
mod routes;
mod time_math;
mod utils;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clock::SystemClock;
use config::Config;
use db::create_pool;
use engine::{BookingCoordinator, CatalogCache, EventBus, QueryFacade};
use handlers::AppState;
use middleware::cors::cors_from_env;
use repository::PostgresRepository;
use routes::create_api_v1_routes;

/// Catalog cache TTL. Services and add-ons change rarely; a minute of
/// staleness is an acceptable trade against re-querying on every booking.
const CATALOG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Event bus backlog per `(barber_id, service_date)` subscription.
const EVENT_BUS_CAPACITY: usize = 256;

/// API version info response
#[derive(Debug, Serialize, Deserialize)]
struct VersionResponse {
    name: String,
    version: String,
    rust_version: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && args[1] == "--health-check" {
        return perform_health_check().await;
    }

    let config = Config::from_env()?;
    init_tracing(&config.server.environment);

    tracing::info!("Starting Barbershop Scheduling Engine...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.server.environment);

    let pool = create_pool(&config.database).await?;
    tracing::info!("Database connection pool created successfully");

    let repository = Arc::new(PostgresRepository::new(pool.clone()));
    let clock = Arc::new(SystemClock);
    let catalog = Arc::new(CatalogCache::new(repository.clone(), CATALOG_CACHE_TTL));
    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));

    let coordinator = Arc::new(BookingCoordinator::new(
        repository.clone(),
        catalog.clone(),
        events,
        clock.clone(),
        config.policy.clone(),
    ));
    let facade = Arc::new(QueryFacade::new(repository, catalog, clock, config.policy.clone()));

    let start_time = std::time::SystemTime::now();
    let app_state = AppState {
        coordinator,
        facade,
        pool,
        start_time,
    };

    let app = create_app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("invalid server address");

    tracing::info!("HTTP server listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(environment: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug,axum::rejection=trace,sqlx=warn".into());

    if environment == "production" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Create the Axum application router
fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/version", get(version_handler))
        .nest("/api/v1", create_api_v1_routes(state))
        .layer(cors_from_env())
        .layer(TraceLayer::new_for_http())
}

/// Root handler - API information
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Barbershop Scheduling Engine",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": {
            "health": "/api/v1/health",
            "api_v1": "/api/v1"
        }
    }))
}

/// Version info handler
async fn version_handler() -> impl IntoResponse {
    let response = VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
    };

    Json(response)
}

/// Perform health check for Docker healthcheck
async fn perform_health_check() -> anyhow::Result<()> {
    let port = env::var("SERVER_PORT").unwrap_or_else(|_| "8000".to_string());
    let url = format!("http://127.0.0.1:{}/api/v1/health", port);

    let client = reqwest::Client::new();
    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            println!("Health check passed");
            std::process::exit(0);
        }
        Ok(response) => {
            eprintln!("Health check failed with status: {}", response.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}
