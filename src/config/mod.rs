/*!
 * Configuration Module
 *
 * Handles application configuration loading from environment variables
 * and provides structured access to configuration values.
 */

use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Scheduling policy configuration
    pub policy: PolicyConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
    /// Environment (development, production)
    pub environment: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout: Duration,
    /// Idle connection timeout in seconds
    pub idle_timeout: Duration,
    /// Maximum connection lifetime in seconds
    pub max_lifetime: Duration,
}

/// Scheduling policy configuration (see Capacity & Policy)
#[derive(Debug, Clone, Copy)]
pub struct PolicyConfig {
    /// Local start of the working day, in minutes since midnight
    pub working_start: u16,
    /// Local end of the working day, in minutes since midnight (exclusive)
    pub working_end: u16,
    /// Local start of the lunch interval, in minutes since midnight
    pub lunch_start: u16,
    /// Local end of the lunch interval, in minutes since midnight (exclusive)
    pub lunch_end: u16,
    /// Candidate grid step for availability slots, in minutes
    pub slot_granularity_min: u16,
    /// Minimum total service duration accepted by the booking coordinator
    pub min_service_duration_min: u16,
    /// Maximum number of active (pending/confirmed/ongoing) queue rows per (barber, date)
    pub max_active_queue: usize,
    /// Local time after which "today" becomes unbookable, in minutes since midnight
    pub same_day_cutoff: u16,
    /// Per-subscriber bounded event buffer size
    pub event_buffer_size: usize,
    /// Service/AddOn catalog cache refresh interval, in seconds
    pub catalog_refresh_ttl_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            working_start: 8 * 60,
            working_end: 17 * 60,
            lunch_start: 12 * 60,
            lunch_end: 13 * 60,
            slot_granularity_min: 30,
            min_service_duration_min: 30,
            max_active_queue: 15,
            same_day_cutoff: 16 * 60 + 30,
            event_buffer_size: 256,
            catalog_refresh_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to documented
    /// defaults for everything except the database connection string.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing
    /// or contain invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
                environment: std::env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string()),
            },

            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                acquire_timeout: Duration::from_secs(
                    std::env::var("DATABASE_ACQUIRE_TIMEOUT")
                        .unwrap_or_else(|_| "30".to_string())
                        .parse()
                        .unwrap_or(30),
                ),
                idle_timeout: Duration::from_secs(
                    std::env::var("DATABASE_IDLE_TIMEOUT")
                        .unwrap_or_else(|_| "600".to_string())
                        .parse()
                        .unwrap_or(600),
                ),
                max_lifetime: Duration::from_secs(
                    std::env::var("DATABASE_MAX_LIFETIME")
                        .unwrap_or_else(|_| "1800".to_string())
                        .parse()
                        .unwrap_or(1800),
                ),
            },

            policy: Self::load_policy_config(),
        };

        Ok(config)
    }

    fn load_policy_config() -> PolicyConfig {
        let defaults = PolicyConfig::default();

        let minutes_env = |key: &str, default: u16| -> u16 {
            std::env::var(key)
                .ok()
                .and_then(|v| parse_hhmm_or_int(&v))
                .unwrap_or(default)
        };

        PolicyConfig {
            working_start: minutes_env("WORKING_START", defaults.working_start),
            working_end: minutes_env("WORKING_END", defaults.working_end),
            lunch_start: minutes_env("LUNCH_START", defaults.lunch_start),
            lunch_end: minutes_env("LUNCH_END", defaults.lunch_end),
            slot_granularity_min: std::env::var("SLOT_GRANULARITY_MIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.slot_granularity_min),
            min_service_duration_min: std::env::var("MIN_SERVICE_DURATION_MIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_service_duration_min),
            max_active_queue: std::env::var("MAX_ACTIVE_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_active_queue),
            same_day_cutoff: minutes_env("SAME_DAY_CUTOFF", defaults.same_day_cutoff),
            event_buffer_size: std::env::var("EVENT_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.event_buffer_size),
            catalog_refresh_ttl_secs: std::env::var("CATALOG_REFRESH_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.catalog_refresh_ttl_secs),
        }
    }
}

/// Parses either a plain integer number of minutes or an "HH:MM" string.
fn parse_hhmm_or_int(value: &str) -> Option<u16> {
    if let Some((h, m)) = value.split_once(':') {
        let h: u16 = h.parse().ok()?;
        let m: u16 = m.parse().ok()?;
        Some(h * 60 + m)
    } else {
        value.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        std::env::remove_var("SERVER_HOST");
        std::env::remove_var("SERVER_PORT");

        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        assert_eq!(host, "0.0.0.0");
        assert_eq!(port, 8000);
    }

    #[test]
    fn test_policy_defaults() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.working_start, 480);
        assert_eq!(policy.working_end, 1020);
        assert_eq!(policy.lunch_start, 720);
        assert_eq!(policy.lunch_end, 780);
        assert_eq!(policy.same_day_cutoff, 990);
        assert_eq!(policy.max_active_queue, 15);
    }

    #[test]
    fn test_parse_hhmm_or_int() {
        assert_eq!(parse_hhmm_or_int("08:30"), Some(510));
        assert_eq!(parse_hhmm_or_int("510"), Some(510));
        assert_eq!(parse_hhmm_or_int("bogus"), None);
    }
}
