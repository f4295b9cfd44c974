//! The onboarding conversation state machine.
//!
//! A strictly sequential private dialog: prompt for first name, last name,
//! and registration id, one outstanding wait at a time, then rename the
//! member, persist the identity record, and re-grant the privileged role.
//! Permission denials and reply timeouts are state-machine inputs that end
//! the session in an observable terminal outcome; only transport-level
//! failures propagate as errors to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use rollcall_platform::{ChannelId, ChatPlatform, PlatformError};
use rollcall_protocol::{full_name, MemberId};
use rollcall_store::{IdentityRecord, IdentityStore};

pub const PROMPT_FIRST_NAME: &str = "What is your First Name?";
pub const PROMPT_LAST_NAME: &str = "What is your Last Name?";
pub const PROMPT_EXTERNAL_ID: &str =
    "What is your registration ID? (This will only be shared with the server administrators)";
pub const NOTICE_ABANDONED: &str =
    "No response received in time. Please contact an admin to finish onboarding.";
pub const NOTICE_RENAME_DENIED: &str =
    "I don't have permission to update your nickname. Please set it to \"FirstName LastName\" yourself and contact an admin.";
pub const NOTICE_STORE_FAILED: &str =
    "Something went wrong while saving your details. Please contact an admin.";
pub const NOTICE_ROLE_GRANT_DENIED: &str =
    "Your details are saved, but I couldn't restore your role. Please contact an admin.";
pub const NOTICE_SUCCESS: &str =
    "Thank you! Your information has been updated, and your access has been restored.";

/// Sequential dialog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationStep {
    AwaitingFirstName,
    AwaitingLastName,
    AwaitingExternalId,
    Completing,
}

/// How a conversation ended. Every variant is observable by the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationOutcome {
    /// Record persisted and confirmation sent. `role_restored` is false
    /// when the final role grant was denied; persistence still stands.
    Succeeded { role_restored: bool },
    /// The member stopped answering; nothing was persisted.
    Abandoned,
    /// The platform refused the rename; nothing was persisted and the
    /// member stays demoted.
    RenameDenied,
    /// The rename applied but the record write failed; the role was not
    /// re-granted.
    StoreFailed,
}

/// One in-flight onboarding dialog, owned by the enforcement call that
/// created it. Not persisted; destroyed on any terminal outcome.
pub struct OnboardingConversation<'a> {
    platform: &'a dyn ChatPlatform,
    store: &'a dyn IdentityStore,
    member: MemberId,
    privileged_role: &'a str,
    reply_timeout: Option<Duration>,
    session_id: Uuid,
    step: ConversationStep,
}

impl<'a> OnboardingConversation<'a> {
    pub fn new(
        platform: &'a dyn ChatPlatform,
        store: &'a dyn IdentityStore,
        member: MemberId,
        privileged_role: &'a str,
        reply_timeout: Option<Duration>,
    ) -> Self {
        Self {
            platform,
            store,
            member,
            privileged_role,
            reply_timeout,
            session_id: Uuid::new_v4(),
            step: ConversationStep::AwaitingFirstName,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Drive the dialog to a terminal outcome. `reason` is presented to the
    /// member verbatim as the cause of the solicitation.
    pub async fn run(mut self, reason: &str) -> Result<ConversationOutcome, PlatformError> {
        let channel = self.platform.open_private_channel(&self.member).await?;
        debug!(
            session = %self.session_id,
            member = %self.member,
            channel = %channel,
            "onboarding conversation opened"
        );

        self.platform
            .send_message(
                &channel,
                &format!("Your \"{}\" access needs attention: {reason}. Please provide your details.", self.privileged_role),
            )
            .await?;

        self.step = ConversationStep::AwaitingFirstName;
        let Some(first_name) = self.ask(&channel, PROMPT_FIRST_NAME).await? else {
            return self.abandon(&channel).await;
        };

        self.step = ConversationStep::AwaitingLastName;
        let Some(last_name) = self.ask(&channel, PROMPT_LAST_NAME).await? else {
            return self.abandon(&channel).await;
        };

        self.step = ConversationStep::AwaitingExternalId;
        let Some(external_id) = self.ask(&channel, PROMPT_EXTERNAL_ID).await? else {
            return self.abandon(&channel).await;
        };

        self.step = ConversationStep::Completing;
        self.complete(&channel, first_name, last_name, external_id)
            .await
    }

    /// Send one prompt and wait for the member's next message on the
    /// private channel. `Ok(None)` means the per-step deadline passed.
    async fn ask(
        &self,
        channel: &ChannelId,
        prompt: &str,
    ) -> Result<Option<String>, PlatformError> {
        self.platform.send_message(channel, prompt).await?;
        match self
            .platform
            .await_reply(channel, &self.member, self.reply_timeout)
            .await
        {
            Ok(answer) => Ok(Some(answer)),
            Err(PlatformError::Timeout) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn abandon(&self, channel: &ChannelId) -> Result<ConversationOutcome, PlatformError> {
        info!(
            session = %self.session_id,
            member = %self.member,
            step = ?self.step,
            "onboarding abandoned: reply deadline passed"
        );
        self.platform.send_message(channel, NOTICE_ABANDONED).await?;
        Ok(ConversationOutcome::Abandoned)
    }

    async fn complete(
        &self,
        channel: &ChannelId,
        first_name: String,
        last_name: String,
        external_id: String,
    ) -> Result<ConversationOutcome, PlatformError> {
        let display_name = full_name(&first_name, &last_name);

        match self
            .platform
            .set_display_name(&self.member, &display_name)
            .await
        {
            Ok(()) => {}
            Err(PlatformError::PermissionDenied(detail)) => {
                warn!(
                    session = %self.session_id,
                    member = %self.member,
                    detail = %detail,
                    "rename denied; nothing persisted"
                );
                self.platform
                    .send_message(channel, NOTICE_RENAME_DENIED)
                    .await?;
                return Ok(ConversationOutcome::RenameDenied);
            }
            Err(err) => return Err(err),
        }

        let record = IdentityRecord::new(self.member.clone(), first_name, last_name, external_id);
        if let Err(err) = self.store.upsert(record).await {
            warn!(
                session = %self.session_id,
                member = %self.member,
                error = %err,
                "identity record write failed; role not re-granted"
            );
            self.platform
                .send_message(channel, NOTICE_STORE_FAILED)
                .await?;
            return Ok(ConversationOutcome::StoreFailed);
        }

        if let Err(err) = self
            .platform
            .add_role(&self.member, self.privileged_role)
            .await
        {
            warn!(
                session = %self.session_id,
                member = %self.member,
                error = %err,
                "role re-grant failed; persistence stands"
            );
            self.platform
                .send_message(channel, NOTICE_ROLE_GRANT_DENIED)
                .await?;
            return Ok(ConversationOutcome::Succeeded {
                role_restored: false,
            });
        }

        self.platform.send_message(channel, NOTICE_SUCCESS).await?;
        info!(
            session = %self.session_id,
            member = %self.member,
            name = %display_name,
            "onboarding completed"
        );
        Ok(ConversationOutcome::Succeeded {
            role_restored: true,
        })
    }
}
