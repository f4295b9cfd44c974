//! Engine configuration.

use std::time::Duration;

/// Tunables for enforcement and scanning. Injected explicitly wherever the
/// engine runs; there is no ambient global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the access-granting role whose holders are in policy scope.
    pub privileged_role: String,
    /// Per-step reply deadline for event-triggered conversations.
    /// `None` waits indefinitely, matching the join flow's behavior.
    pub event_reply_timeout: Option<Duration>,
    /// Per-step reply deadline for scan-triggered conversations. Bounded by
    /// default so a bulk scan always terminates.
    pub scan_reply_timeout: Option<Duration>,
    /// Maximum number of onboarding conversations a scan keeps open at once.
    pub scan_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            privileged_role: "Member".to_string(),
            event_reply_timeout: None,
            scan_reply_timeout: Some(Duration::from_secs(600)),
            scan_concurrency: 16,
        }
    }
}

impl EngineConfig {
    pub fn with_privileged_role(mut self, role: impl Into<String>) -> Self {
        self.privileged_role = role.into();
        self
    }

    pub fn with_scan_concurrency(mut self, scan_concurrency: usize) -> Self {
        self.scan_concurrency = scan_concurrency.max(1);
        self
    }
}
