//! Group entity types and entry parsing.

use serde::Serialize;

use crate::conn::DirectoryEntry;
use crate::dn::DistinguishedName;
use crate::membership::{self, MEMBER_ATTRIBUTE};

/// Object class for group entries.
pub const GROUP_OBJECT_CLASS: &str = "groupOfNames";

/// A group entry as returned by fetch and list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Group name (the `cn` attribute).
    pub gid: String,
    /// Raw `member` values, placeholder included when present.
    pub members: Vec<String>,
}

impl Group {
    /// Member DNs excluding the schema placeholder.
    #[must_use]
    pub fn real_members(&self) -> Vec<&str> {
        membership::real_members(&self.members).collect()
    }

    /// Whether the given DN is a real member of this group.
    #[must_use]
    pub fn has_member(&self, member_dn: &str) -> bool {
        membership::real_members(&self.members).any(|member| member == member_dn)
    }
}

/// Attributes for creating a group.
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    /// Initial member DNs; leave empty to create the group with the
    /// placeholder only.
    pub members: Vec<String>,
}

impl NewGroup {
    /// A group with no initial members.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial members.
    #[must_use]
    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }

    /// Entry attributes for the add operation, in schema order.
    pub(crate) fn to_attributes(&self, gid: &str) -> Vec<(String, Vec<String>)> {
        vec![
            (
                "objectClass".to_string(),
                vec![GROUP_OBJECT_CLASS.to_string()],
            ),
            (
                MEMBER_ATTRIBUTE.to_string(),
                membership::initial_members(self.members.clone()),
            ),
            ("cn".to_string(), vec![gid.to_string()]),
        ]
    }
}

/// Builds a [`Group`] from a directory entry.
///
/// The gid comes from the entry attributes, falling back to the entry DN;
/// entries with neither are unusable and yield `None`.
pub(crate) fn parse_group_entry(entry: &DirectoryEntry) -> Option<Group> {
    let gid = match entry.first("cn") {
        Some(cn) => cn.to_string(),
        None => DistinguishedName::parse(&entry.dn)
            .ok()?
            .get("cn")?
            .to_string(),
    };

    Some(Group {
        dn: entry.dn.clone(),
        gid,
        members: entry
            .values(MEMBER_ATTRIBUTE)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    })
}
