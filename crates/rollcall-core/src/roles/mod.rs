//! Role-set comparisons for role-change events.

use crate::member::MemberProfile;

/// Roles present on `after` but not on `before`, in `after` order.
pub fn newly_added_roles<'a>(before: &MemberProfile, after: &'a MemberProfile) -> Vec<&'a str> {
    after
        .roles
        .iter()
        .filter(|role| !before.has_role(role))
        .map(String::as_str)
        .collect()
}

/// Whether a role-change event newly granted the named role.
pub fn role_newly_added(before: &MemberProfile, after: &MemberProfile, role: &str) -> bool {
    !before.has_role(role) && after.has_role(role)
}
