pub mod member;
pub mod roles;

pub use rollcall_protocol::{
    evaluate, ComplianceReason, ComplianceVerdict, MemberId, MemberIdError, MemberKind,
};

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
