//! Rollcall enforcement engine.
//!
//! Decides whether roster members comply with the identity policy, demotes
//! and walks non-compliant members through a private onboarding dialog,
//! and runs bulk roster scans with isolated per-member failures.

pub mod config;
pub mod conversation;
pub mod enforcer;
pub mod scanner;
pub mod sessions;

pub use config::EngineConfig;
pub use conversation::{ConversationOutcome, ConversationStep, OnboardingConversation};
pub use enforcer::{ComplianceEnforcer, Enforcement};
pub use scanner::{MemberScanOutcome, RosterScanner, ScanSummary};
pub use sessions::{SessionGuard, SessionRegistry};
