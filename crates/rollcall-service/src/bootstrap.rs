//! Environment configuration and tracing bootstrap.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_engine::EngineConfig;

/// Process-level configuration, read once at startup and injected
/// explicitly from there on.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Name of the access-granting role ("Member" unless overridden).
    pub privileged_role: String,
    /// PostgreSQL URL for the identity store; `None` selects the
    /// in-memory backend.
    pub database_url: Option<String>,
    /// Concurrency bound for roster-scan conversations.
    pub scan_concurrency: usize,
    /// Per-step reply deadline for scan-triggered conversations.
    pub scan_reply_timeout: Option<Duration>,
    /// Per-step reply deadline for event-triggered conversations.
    pub event_reply_timeout: Option<Duration>,
    /// How long a requested bulk wipe stays confirmable.
    pub wipe_confirmation_window: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            privileged_role: engine.privileged_role,
            database_url: None,
            scan_concurrency: engine.scan_concurrency,
            scan_reply_timeout: engine.scan_reply_timeout,
            event_reply_timeout: engine.event_reply_timeout,
            wipe_confirmation_window: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            privileged_role: std::env::var("ROLLCALL_PRIVILEGED_ROLE")
                .unwrap_or(defaults.privileged_role),
            database_url: std::env::var("ROLLCALL_DATABASE_URL").ok(),
            scan_concurrency: parse_count(
                std::env::var("ROLLCALL_SCAN_CONCURRENCY").ok(),
                defaults.scan_concurrency,
            ),
            scan_reply_timeout: parse_secs(
                std::env::var("ROLLCALL_SCAN_REPLY_TIMEOUT_SECS").ok(),
                defaults.scan_reply_timeout,
            ),
            event_reply_timeout: parse_secs(
                std::env::var("ROLLCALL_EVENT_REPLY_TIMEOUT_SECS").ok(),
                defaults.event_reply_timeout,
            ),
            wipe_confirmation_window: parse_secs(
                std::env::var("ROLLCALL_WIPE_CONFIRMATION_SECS").ok(),
                Some(defaults.wipe_confirmation_window),
            )
            .unwrap_or(defaults.wipe_confirmation_window),
        }
    }

    /// The engine slice of this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            privileged_role: self.privileged_role.clone(),
            event_reply_timeout: self.event_reply_timeout,
            scan_reply_timeout: self.scan_reply_timeout,
            scan_concurrency: self.scan_concurrency,
        }
    }
}

/// Parse a positive count, falling back on missing or unparsable input.
fn parse_count(value: Option<String>, default: usize) -> usize {
    value
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(default)
}

/// Parse a seconds value; `0` explicitly disables the deadline.
fn parse_secs(value: Option<String>, default: Option<Duration>) -> Option<Duration> {
    match value.and_then(|raw| raw.parse::<u64>().ok()) {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => default,
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rollcall=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
