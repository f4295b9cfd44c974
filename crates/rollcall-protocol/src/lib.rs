//! Rollcall protocol types and compliance rules.
//!
//! This crate implements:
//! - member identity (`MemberId`, `MemberKind`)
//! - display-name well-formedness
//! - the compliance verdict and the pure `evaluate` decision function
//!
//! Everything here is deterministic and free of I/O so the policy can be
//! tested without a platform or storage dependency.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Human,
    Bot,
}

impl MemberKind {
    pub fn as_str(&self) -> &str {
        match self {
            MemberKind::Human => "human",
            MemberKind::Bot => "bot",
        }
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable external member identifier in the form `rollcall:<kind>:<identifier>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemberIdError {
    #[error("invalid prefix: expected 'rollcall:'")]
    InvalidPrefix,
    #[error("unknown member kind: {0}")]
    InvalidKind(String),
    #[error("invalid identifier: cannot be empty")]
    InvalidIdentifier,
}

impl MemberId {
    pub fn new(kind: MemberKind, identifier: &str) -> Result<Self, MemberIdError> {
        if identifier.is_empty() {
            return Err(MemberIdError::InvalidIdentifier);
        }
        Ok(Self(format!("rollcall:{}:{}", kind, identifier)))
    }

    pub fn kind(&self) -> MemberKind {
        let parts: Vec<&str> = self.0.split(':').collect();
        match parts.get(1).copied() {
            Some("bot") => MemberKind::Bot,
            _ => MemberKind::Human,
        }
    }

    pub fn identifier(&self) -> &str {
        let parts: Vec<&str> = self.0.split(':').collect();
        parts.get(2).unwrap_or(&"")
    }
}

impl std::str::FromStr for MemberId {
    type Err = MemberIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prefix = "rollcall:";
        if !s.starts_with(prefix) {
            return Err(MemberIdError::InvalidPrefix);
        }
        let rest = &s[prefix.len()..];
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() < 2 {
            return Err(MemberIdError::InvalidIdentifier);
        }
        let kind = parts[0];
        let identifier = parts[1..].join(":");

        match kind {
            "human" | "bot" => {}
            _ => return Err(MemberIdError::InvalidKind(kind.to_string())),
        }

        if identifier.is_empty() {
            return Err(MemberIdError::InvalidIdentifier);
        }

        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A display name qualifies when it splits into at least two whitespace
/// tokens. Token content beyond the split is not inspected.
pub fn display_name_is_well_formed(display_name: Option<&str>) -> bool {
    display_name
        .map(|name| name.split_whitespace().count() >= 2)
        .unwrap_or(false)
}

/// Render the enforced display name from its collected parts.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceReason {
    /// Well-formed name and an identity record on file.
    Ok,
    /// Display name absent, empty, or fewer than two tokens.
    NicknameInvalid,
    /// No identity record on file.
    MissingExternalId,
    /// The identity store could not be read for this member.
    LookupError,
    /// Space owners are exempt from every check.
    IsOwner,
}

impl ComplianceReason {
    /// Member-facing cause string, presented verbatim when a conversation
    /// is opened. `None` for reasons that never trigger one.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            ComplianceReason::NicknameInvalid => Some("Invalid nickname format"),
            ComplianceReason::MissingExternalId | ComplianceReason::LookupError => {
                Some("Missing record in the database")
            }
            ComplianceReason::Ok | ComplianceReason::IsOwner => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub compliant: bool,
    pub reason: ComplianceReason,
}

impl ComplianceVerdict {
    pub const fn compliant(reason: ComplianceReason) -> Self {
        Self {
            compliant: true,
            reason,
        }
    }

    pub const fn non_compliant(reason: ComplianceReason) -> Self {
        Self {
            compliant: false,
            reason,
        }
    }
}

/// Decide whether a member is compliant.
///
/// Rules, in order: owners are exempt; a display name with fewer than two
/// whitespace tokens fails as `NicknameInvalid`; a missing identity record
/// fails as `MissingExternalId`; otherwise the member passes.
pub fn evaluate(
    display_name: Option<&str>,
    has_identity_record: bool,
    is_owner: bool,
) -> ComplianceVerdict {
    if is_owner {
        return ComplianceVerdict::compliant(ComplianceReason::IsOwner);
    }
    if !display_name_is_well_formed(display_name) {
        return ComplianceVerdict::non_compliant(ComplianceReason::NicknameInvalid);
    }
    if !has_identity_record {
        return ComplianceVerdict::non_compliant(ComplianceReason::MissingExternalId);
    }
    ComplianceVerdict::compliant(ComplianceReason::Ok)
}
