//! Per-member session registry.
//!
//! At most one onboarding conversation may be live per member. A trigger
//! that arrives while one is open is ignored rather than spawning a
//! duplicate dialog over the same private channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rollcall_protocol::MemberId;

/// In-memory set of members with a live onboarding conversation.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<MemberId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the member's session slot. Returns `None` when a conversation
    /// is already open for them; the returned guard releases the slot on
    /// drop, however the conversation ends.
    pub fn begin(&self, member: &MemberId) -> Option<SessionGuard> {
        let mut active = self.active.lock().expect("session registry poisoned");
        if !active.insert(member.clone()) {
            return None;
        }
        Some(SessionGuard {
            active: self.active.clone(),
            member: member.clone(),
        })
    }

    pub fn is_active(&self, member: &MemberId) -> bool {
        self.active
            .lock()
            .expect("session registry poisoned")
            .contains(member)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().expect("session registry poisoned").len()
    }
}

/// Holds a member's session slot; dropping it frees the slot.
#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<Mutex<HashSet<MemberId>>>,
    member: MemberId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.member);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionRegistry;
    use rollcall_protocol::{MemberId, MemberKind};

    fn member(identifier: &str) -> MemberId {
        MemberId::new(MemberKind::Human, identifier).unwrap()
    }

    #[test]
    fn second_begin_for_same_member_is_refused() {
        let registry = SessionRegistry::new();
        let alice = member("alice");

        let guard = registry.begin(&alice);
        assert!(guard.is_some());
        assert!(registry.is_active(&alice));
        assert!(registry.begin(&alice).is_none());
    }

    #[test]
    fn dropping_the_guard_frees_the_slot() {
        let registry = SessionRegistry::new();
        let alice = member("alice");

        let guard = registry.begin(&alice).unwrap();
        drop(guard);

        assert!(!registry.is_active(&alice));
        assert!(registry.begin(&alice).is_some());
    }

    #[test]
    fn slots_are_independent_across_members() {
        let registry = SessionRegistry::new();
        let alice = member("alice");
        let bob = member("bob");

        let _alice_guard = registry.begin(&alice).unwrap();
        let _bob_guard = registry.begin(&bob).unwrap();

        assert_eq!(registry.active_count(), 2);
    }
}
