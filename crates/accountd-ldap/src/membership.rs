//! Group membership planning.
//!
//! `groupOfNames` requires at least one `member` value, so a group with no
//! real members carries a single empty-string placeholder instead. The
//! planners here turn a desired membership change into an ordered list of
//! attribute changes that never leaves the attribute empty on the server.
//! Pure decision logic; callers apply the changes in the returned order.

use crate::conn::AttributeChange;

/// Attribute holding group member DNs.
pub const MEMBER_ATTRIBUTE: &str = "member";

/// Placeholder value that satisfies the schema when a group has no members.
pub const PLACEHOLDER_MEMBER: &str = "";

/// Plans adding `user_dn` to a group whose current `member` values are
/// `current`.
///
/// The new member is always added first; the placeholder, when present, is
/// removed only afterwards. If the add fails the placeholder is untouched
/// and the group stays schema-valid.
#[must_use]
pub fn plan_add(current: &[String], user_dn: &str) -> Vec<AttributeChange> {
    let mut changes = vec![AttributeChange::add(
        MEMBER_ATTRIBUTE,
        vec![user_dn.to_string()],
    )];

    if current.iter().any(|member| member == PLACEHOLDER_MEMBER) {
        changes.push(AttributeChange::delete(
            MEMBER_ATTRIBUTE,
            vec![PLACEHOLDER_MEMBER.to_string()],
        ));
    }

    changes
}

/// Plans removing `user_dn` from a group whose current `member` values are
/// `current`.
///
/// When the removal would leave no real members, the whole attribute is
/// replaced with the placeholder in one step; a bare delete would empty the
/// attribute and be rejected by the schema.
#[must_use]
pub fn plan_remove(current: &[String], user_dn: &str) -> Vec<AttributeChange> {
    let remaining = real_members(current)
        .filter(|member| *member != user_dn)
        .count();

    if remaining == 0 {
        vec![AttributeChange::replace(
            MEMBER_ATTRIBUTE,
            vec![PLACEHOLDER_MEMBER.to_string()],
        )]
    } else {
        vec![AttributeChange::delete(
            MEMBER_ATTRIBUTE,
            vec![user_dn.to_string()],
        )]
    }
}

/// Member values for a brand-new group: the requested members, or the
/// placeholder when none were requested.
#[must_use]
pub fn initial_members(requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        vec![PLACEHOLDER_MEMBER.to_string()]
    } else {
        requested
    }
}

/// Iterates the real (non-placeholder) members of a value list.
pub fn real_members(members: &[String]) -> impl Iterator<Item = &str> {
    members
        .iter()
        .map(String::as_str)
        .filter(|member| !member.is_empty())
}
