//! Chat-platform capability abstractions.
//!
//! The enforcement engine never talks to a concrete chat service. It
//! consumes the [`ChatPlatform`] trait: open a private channel, send a
//! message, wait for the member's next reply, rename, and mutate roles.
//! A live adapter implements this over the real transport; [`MockPlatform`]
//! implements it over queued replies and recorded actions for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollcall_core::member::MemberProfile;
use rollcall_protocol::MemberId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("timed out waiting for a reply")]
    Timeout,
    #[error("channel closed: {0}")]
    ChannelClosed(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("mock platform has no queued reply")]
    MockQueueEmpty,
}

/// Handle for a member's private channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compliance-relevant events delivered by the platform collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    MemberJoined(MemberProfile),
    RoleSetChanged {
        before: MemberProfile,
        after: MemberProfile,
    },
}

/// Abstract capability set consumed by the enforcement engine.
///
/// `remove_role` on a member who no longer holds the role must succeed as
/// a no-op; revocation is idempotent by contract. `await_reply` resolves
/// with the next inbound message from that member on that channel, or
/// [`PlatformError::Timeout`] once the optional deadline passes.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn open_private_channel(&self, member: &MemberId) -> Result<ChannelId, PlatformError>;

    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError>;

    async fn await_reply(
        &self,
        channel: &ChannelId,
        member: &MemberId,
        timeout: Option<Duration>,
    ) -> Result<String, PlatformError>;

    async fn set_display_name(&self, member: &MemberId, name: &str) -> Result<(), PlatformError>;

    async fn add_role(&self, member: &MemberId, role: &str) -> Result<(), PlatformError>;

    async fn remove_role(&self, member: &MemberId, role: &str) -> Result<(), PlatformError>;
}

/// Record of one outbound private message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub text: String,
}

/// Record of one role mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub member: MemberId,
    pub role: String,
}

/// Test double for [`ChatPlatform`].
///
/// Replies are queued per member and popped in order; an exhausted queue
/// reports [`PlatformError::MockQueueEmpty`] instead of suspending, so a
/// test never hangs. Action results default to `Ok` unless a failure is
/// queued for that operation. All actions are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockPlatform {
    replies: Mutex<HashMap<MemberId, VecDeque<Result<String, PlatformError>>>>,
    open_channel_results: Mutex<VecDeque<Result<(), PlatformError>>>,
    send_results: Mutex<VecDeque<Result<(), PlatformError>>>,
    rename_results: Mutex<VecDeque<Result<(), PlatformError>>>,
    add_role_results: Mutex<VecDeque<Result<(), PlatformError>>>,
    remove_role_results: Mutex<VecDeque<Result<(), PlatformError>>>,
    sent: Mutex<Vec<SentMessage>>,
    renames: Mutex<Vec<(MemberId, String)>>,
    granted_roles: Mutex<Vec<RoleChange>>,
    removed_roles: Mutex<Vec<RoleChange>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the member's next reply.
    pub fn enqueue_reply(&self, member: &MemberId, reply: Result<String, PlatformError>) {
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .entry(member.clone())
            .or_default()
            .push_back(reply);
    }

    /// Queue replies for a whole dialog in order.
    pub fn enqueue_replies(&self, member: &MemberId, replies: &[&str]) {
        for reply in replies {
            self.enqueue_reply(member, Ok((*reply).to_string()));
        }
    }

    pub fn enqueue_open_channel_result(&self, result: Result<(), PlatformError>) {
        self.open_channel_results
            .lock()
            .expect("mock open-channel queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_send_result(&self, result: Result<(), PlatformError>) {
        self.send_results
            .lock()
            .expect("mock send queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_rename_result(&self, result: Result<(), PlatformError>) {
        self.rename_results
            .lock()
            .expect("mock rename queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_add_role_result(&self, result: Result<(), PlatformError>) {
        self.add_role_results
            .lock()
            .expect("mock add-role queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_remove_role_result(&self, result: Result<(), PlatformError>) {
        self.remove_role_results
            .lock()
            .expect("mock remove-role queue poisoned")
            .push_back(result);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock sent log poisoned").clone()
    }

    /// Texts of every message sent to the given channel, in order.
    pub fn texts_sent_to(&self, channel: &ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .expect("mock sent log poisoned")
            .iter()
            .filter(|message| &message.channel == channel)
            .map(|message| message.text.clone())
            .collect()
    }

    pub fn renames(&self) -> Vec<(MemberId, String)> {
        self.renames.lock().expect("mock rename log poisoned").clone()
    }

    pub fn granted_roles(&self) -> Vec<RoleChange> {
        self.granted_roles
            .lock()
            .expect("mock grant log poisoned")
            .clone()
    }

    pub fn removed_roles(&self) -> Vec<RoleChange> {
        self.removed_roles
            .lock()
            .expect("mock removal log poisoned")
            .clone()
    }

    fn next_result(queue: &Mutex<VecDeque<Result<(), PlatformError>>>) -> Result<(), PlatformError> {
        queue
            .lock()
            .expect("mock result queue poisoned")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn open_private_channel(&self, member: &MemberId) -> Result<ChannelId, PlatformError> {
        Self::next_result(&self.open_channel_results)?;
        Ok(ChannelId::new(format!("dm:{}", member.identifier())))
    }

    async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), PlatformError> {
        Self::next_result(&self.send_results)?;
        self.sent
            .lock()
            .expect("mock sent log poisoned")
            .push(SentMessage {
                channel: channel.clone(),
                text: text.to_string(),
            });
        Ok(())
    }

    async fn await_reply(
        &self,
        _channel: &ChannelId,
        member: &MemberId,
        _timeout: Option<Duration>,
    ) -> Result<String, PlatformError> {
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .get_mut(member)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(PlatformError::MockQueueEmpty))
    }

    async fn set_display_name(&self, member: &MemberId, name: &str) -> Result<(), PlatformError> {
        Self::next_result(&self.rename_results)?;
        self.renames
            .lock()
            .expect("mock rename log poisoned")
            .push((member.clone(), name.to_string()));
        Ok(())
    }

    async fn add_role(&self, member: &MemberId, role: &str) -> Result<(), PlatformError> {
        Self::next_result(&self.add_role_results)?;
        self.granted_roles
            .lock()
            .expect("mock grant log poisoned")
            .push(RoleChange {
                member: member.clone(),
                role: role.to_string(),
            });
        Ok(())
    }

    async fn remove_role(&self, member: &MemberId, role: &str) -> Result<(), PlatformError> {
        Self::next_result(&self.remove_role_results)?;
        self.removed_roles
            .lock()
            .expect("mock removal log poisoned")
            .push(RoleChange {
                member: member.clone(),
                role: role.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatPlatform, MockPlatform, PlatformError};
    use rollcall_protocol::{MemberId, MemberKind};

    fn member(identifier: &str) -> MemberId {
        MemberId::new(MemberKind::Human, identifier).unwrap()
    }

    #[tokio::test]
    async fn mock_pops_queued_replies_in_order() {
        let platform = MockPlatform::new();
        let alice = member("alice");
        platform.enqueue_replies(&alice, &["Alice", "Jones"]);

        let channel = platform.open_private_channel(&alice).await.unwrap();
        let first = platform.await_reply(&channel, &alice, None).await.unwrap();
        let second = platform.await_reply(&channel, &alice, None).await.unwrap();

        assert_eq!(first, "Alice");
        assert_eq!(second, "Jones");
    }

    #[tokio::test]
    async fn mock_reports_empty_reply_queue() {
        let platform = MockPlatform::new();
        let alice = member("alice");
        let channel = platform.open_private_channel(&alice).await.unwrap();

        let err = platform
            .await_reply(&channel, &alice, None)
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::MockQueueEmpty);
    }

    #[tokio::test]
    async fn reply_queues_are_scoped_per_member() {
        let platform = MockPlatform::new();
        let alice = member("alice");
        let bob = member("bob");
        platform.enqueue_reply(&alice, Ok("for alice".to_string()));

        let bob_channel = platform.open_private_channel(&bob).await.unwrap();
        let err = platform
            .await_reply(&bob_channel, &bob, None)
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::MockQueueEmpty);

        let alice_channel = platform.open_private_channel(&alice).await.unwrap();
        let reply = platform
            .await_reply(&alice_channel, &alice, None)
            .await
            .unwrap();
        assert_eq!(reply, "for alice");
    }

    #[tokio::test]
    async fn mock_records_sent_messages_per_channel() {
        let platform = MockPlatform::new();
        let alice = member("alice");
        let channel = platform.open_private_channel(&alice).await.unwrap();

        platform.send_message(&channel, "first").await.unwrap();
        platform.send_message(&channel, "second").await.unwrap();

        assert_eq!(platform.texts_sent_to(&channel), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn queued_failures_surface_then_default_to_ok() {
        let platform = MockPlatform::new();
        let alice = member("alice");
        platform.enqueue_rename_result(Err(PlatformError::PermissionDenied(
            "missing manage-nicknames".to_string(),
        )));

        let err = platform
            .set_display_name(&alice, "Alice Jones")
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::PermissionDenied(_)));
        assert!(platform.renames().is_empty());

        platform
            .set_display_name(&alice, "Alice Jones")
            .await
            .unwrap();
        assert_eq!(platform.renames().len(), 1);
    }

    #[tokio::test]
    async fn role_mutations_are_recorded() {
        let platform = MockPlatform::new();
        let alice = member("alice");

        platform.add_role(&alice, "Member").await.unwrap();
        platform.remove_role(&alice, "Member").await.unwrap();

        assert_eq!(platform.granted_roles().len(), 1);
        assert_eq!(platform.granted_roles()[0].role, "Member");
        assert_eq!(platform.removed_roles().len(), 1);
    }
}
