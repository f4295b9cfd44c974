//! Bulk roster scans.
//!
//! A scan fans out one enforcement task per in-scope member, bounded by
//! the configured concurrency, and joins on all of them before reporting.
//! Per-member failures (including panics inside a task) are isolated:
//! they count as non-compliant and never abort the rest of the scan.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use rollcall_core::member::MemberProfile;

use crate::enforcer::{ComplianceEnforcer, Enforcement};

/// Aggregate counts for one roster scan. Bots are excluded entirely;
/// members lacking the privileged role are iterated but counted in no
/// bucket, so `total_scanned` always equals `compliant_count +
/// non_compliant_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_scanned: usize,
    pub compliant_count: usize,
    pub non_compliant_count: usize,
}

/// Categorical result of scanning exactly one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberScanOutcome {
    /// Non-human account; out of policy scope.
    Bot,
    /// Space owner; exempt and compliant.
    Owner,
    /// Does not hold the privileged role; out of policy scope.
    MissingRole,
    /// Non-compliant; an onboarding conversation ran (or was attempted).
    NonCompliant,
    /// Holds the role, passes every check.
    Compliant,
}

/// Applies the enforcer across a membership roster.
pub struct RosterScanner {
    enforcer: Arc<ComplianceEnforcer>,
}

impl RosterScanner {
    pub fn new(enforcer: Arc<ComplianceEnforcer>) -> Self {
        Self { enforcer }
    }

    /// Scan the full roster and wait for every spawned conversation to
    /// reach a terminal state.
    pub async fn scan(&self, members: Vec<MemberProfile>) -> ScanSummary {
        let config = self.enforcer.config();
        let role = config.privileged_role.clone();
        let reply_timeout = config.scan_reply_timeout;
        let slots = Arc::new(tokio::sync::Semaphore::new(config.scan_concurrency));

        info!(members = members.len(), role = %role, "roster scan started");

        let mut tasks = Vec::new();
        for profile in members {
            if profile.is_bot() {
                continue;
            }
            if !profile.is_owner && !profile.has_role(&role) {
                debug!(member = %profile.id, "no privileged role; out of policy scope");
                continue;
            }

            let enforcer = self.enforcer.clone();
            let slots = slots.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                matches!(
                    enforcer.enforce(&profile, reply_timeout).await,
                    Enforcement::ExemptOwner | Enforcement::AlreadyCompliant
                )
            }));
        }

        let mut summary = ScanSummary::default();
        for joined in join_all(tasks).await {
            match joined {
                Ok(true) => summary.compliant_count += 1,
                Ok(false) => summary.non_compliant_count += 1,
                Err(err) => {
                    error!(error = %err, "scan task aborted; member counted non-compliant");
                    summary.non_compliant_count += 1;
                }
            }
        }
        summary.total_scanned = summary.compliant_count + summary.non_compliant_count;

        info!(
            total = summary.total_scanned,
            compliant = summary.compliant_count,
            non_compliant = summary.non_compliant_count,
            "roster scan finished"
        );
        summary
    }

    /// Scan exactly one member and report where they landed.
    pub async fn scan_member(&self, profile: &MemberProfile) -> MemberScanOutcome {
        if profile.is_bot() {
            return MemberScanOutcome::Bot;
        }
        if profile.is_owner {
            return MemberScanOutcome::Owner;
        }
        if !profile.has_role(&self.enforcer.config().privileged_role) {
            return MemberScanOutcome::MissingRole;
        }

        match self
            .enforcer
            .enforce(profile, self.enforcer.config().scan_reply_timeout)
            .await
        {
            Enforcement::AlreadyCompliant => MemberScanOutcome::Compliant,
            _ => MemberScanOutcome::NonCompliant,
        }
    }
}
