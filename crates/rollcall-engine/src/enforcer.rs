//! Compliance enforcement entry points.
//!
//! One algorithm behind every trigger: member joins, privileged-role
//! grants, and roster scans all land in [`ComplianceEnforcer::enforce`].
//! Enforcement is best-effort, not transactional: a platform failure while
//! revoking the role or opening the private channel is logged and leaves
//! the member in whatever partial state resulted.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use rollcall_core::member::MemberProfile;
use rollcall_core::roles::role_newly_added;
use rollcall_platform::ChatPlatform;
use rollcall_protocol::{evaluate, ComplianceReason};
use rollcall_store::IdentityStore;

use crate::config::EngineConfig;
use crate::conversation::{ConversationOutcome, OnboardingConversation};
use crate::sessions::SessionRegistry;

/// What an enforcement call did, for the dispatcher and the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enforcement {
    /// Non-human account; never evaluated.
    SkippedBot,
    /// Space owner; always treated as compliant.
    ExemptOwner,
    /// Already compliant; repeated evaluation stays a no-op.
    AlreadyCompliant,
    /// A conversation is already open for this member; trigger ignored.
    SessionAlreadyOpen,
    /// A role change that did not newly grant the privileged role.
    Ignored,
    /// A conversation ran to the contained terminal outcome.
    Conversation(ConversationOutcome),
    /// A platform failure prevented or aborted enforcement; logged.
    Failed,
}

/// Orchestrates verdicts, demotion, and onboarding conversations.
pub struct ComplianceEnforcer {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<dyn IdentityStore>,
    config: EngineConfig,
    sessions: SessionRegistry,
}

impl ComplianceEnforcer {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn IdentityStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            platform,
            store,
            config,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// A member joined the space.
    pub async fn handle_member_joined(&self, profile: &MemberProfile) -> Enforcement {
        debug!(member = %profile.id, "member joined");
        self.enforce(profile, self.config.event_reply_timeout).await
    }

    /// A member's role set changed. Acts only when the privileged role was
    /// newly added; removals and unrelated grants are ignored.
    pub async fn handle_role_change(
        &self,
        before: &MemberProfile,
        after: &MemberProfile,
    ) -> Enforcement {
        if !role_newly_added(before, after, &self.config.privileged_role) {
            return Enforcement::Ignored;
        }
        debug!(member = %after.id, role = %self.config.privileged_role, "privileged role granted");
        self.enforce(after, self.config.event_reply_timeout).await
    }

    /// Evaluate one member and, when non-compliant, demote them and run an
    /// onboarding conversation bounded by `reply_timeout`.
    pub async fn enforce(
        &self,
        profile: &MemberProfile,
        reply_timeout: Option<Duration>,
    ) -> Enforcement {
        if profile.is_bot() {
            return Enforcement::SkippedBot;
        }
        if profile.is_owner {
            debug!(member = %profile.id, "owner exempt from compliance checks");
            return Enforcement::ExemptOwner;
        }

        let reason = match self.store.lookup(&profile.id).await {
            Ok(record) => {
                let verdict = evaluate(
                    profile.display_name.as_deref(),
                    record.is_some(),
                    profile.is_owner,
                );
                if verdict.compliant {
                    debug!(member = %profile.id, "member compliant; no action");
                    return Enforcement::AlreadyCompliant;
                }
                verdict.reason
            }
            Err(err) => {
                error!(member = %profile.id, error = %err, "identity lookup failed");
                ComplianceReason::LookupError
            }
        };

        self.demote_and_onboard(profile, reason, reply_timeout)
            .await
    }

    async fn demote_and_onboard(
        &self,
        profile: &MemberProfile,
        reason: ComplianceReason,
        reply_timeout: Option<Duration>,
    ) -> Enforcement {
        let Some(_session) = self.sessions.begin(&profile.id) else {
            info!(member = %profile.id, "onboarding already in progress; trigger ignored");
            return Enforcement::SessionAlreadyOpen;
        };

        let role = self.config.privileged_role.as_str();
        if profile.has_role(role) {
            if let Err(err) = self.platform.remove_role(&profile.id, role).await {
                error!(member = %profile.id, error = %err, "failed to revoke privileged role");
                return Enforcement::Failed;
            }
            info!(member = %profile.id, role = %role, reason = ?reason, "privileged role revoked");
        }

        let notice = reason.notice().unwrap_or("Compliance check failed");
        let conversation = OnboardingConversation::new(
            self.platform.as_ref(),
            self.store.as_ref(),
            profile.id.clone(),
            role,
            reply_timeout,
        );

        match conversation.run(notice).await {
            Ok(outcome) => {
                info!(member = %profile.id, outcome = ?outcome, "onboarding conversation ended");
                Enforcement::Conversation(outcome)
            }
            Err(err) => {
                error!(member = %profile.id, error = %err, "onboarding conversation failed");
                Enforcement::Failed
            }
        }
    }
}
