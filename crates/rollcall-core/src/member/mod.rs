//! Roster member snapshots for Rollcall.

use serde::{Deserialize, Serialize};

pub use rollcall_protocol::{MemberId, MemberKind};

/// Point-in-time view of a roster member as reported by the platform
/// collaborator. The engine never mutates a profile; it issues platform
/// actions and receives a fresh snapshot on the next event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub kind: MemberKind,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub is_owner: bool,
}

impl MemberProfile {
    pub fn new(id: MemberId) -> Self {
        Self {
            id,
            kind: MemberKind::Human,
            display_name: None,
            roles: Vec::new(),
            is_owner: false,
        }
    }

    pub fn with_kind(mut self, kind: MemberKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn as_owner(mut self) -> Self {
        self.is_owner = true;
        self
    }

    pub fn is_bot(&self) -> bool {
        self.kind == MemberKind::Bot
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}
