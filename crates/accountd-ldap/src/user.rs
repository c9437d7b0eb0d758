//! User entity types and entry parsing.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::conn::DirectoryEntry;
use crate::dn::DistinguishedName;
use crate::oplog::OperationError;

/// Object class for user entries.
pub const USER_OBJECT_CLASS: &str = "inetOrgPerson";

/// A user entry as returned by fetch and list operations.
///
/// Deliberately excludes `userPassword`; credentials never round-trip
/// through entity types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Account name (the `uid` attribute).
    pub uid: String,
    /// Common name, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cn: Option<String>,
    /// Surname, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
}

/// Attributes required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Common name.
    pub cn: String,
    /// Surname.
    pub sn: String,
    /// Initial password.
    pub password: SecretString,
}

impl NewUser {
    /// Creates a new-user payload.
    #[must_use]
    pub fn new(cn: impl Into<String>, sn: impl Into<String>, password: SecretString) -> Self {
        Self {
            cn: cn.into(),
            sn: sn.into(),
            password,
        }
    }

    /// Checks that every required attribute is present and non-empty.
    /// Runs locally, before anything is sent to the server.
    pub(crate) fn validate(&self) -> std::result::Result<(), OperationError> {
        let mut missing = Vec::new();
        if self.cn.is_empty() {
            missing.push("cn");
        }
        if self.sn.is_empty() {
            missing.push("sn");
        }
        if self.password.expose_secret().is_empty() {
            missing.push("userPassword");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OperationError::validation(format!(
                "missing required attribute(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Entry attributes for the add operation, in schema order.
    pub(crate) fn to_attributes(&self, uid: &str) -> Vec<(String, Vec<String>)> {
        vec![
            (
                "objectClass".to_string(),
                vec![USER_OBJECT_CLASS.to_string()],
            ),
            ("cn".to_string(), vec![self.cn.clone()]),
            ("sn".to_string(), vec![self.sn.clone()]),
            ("uid".to_string(), vec![uid.to_string()]),
            (
                "userPassword".to_string(),
                vec![self.password.expose_secret().to_string()],
            ),
        ]
    }
}

/// Attribute changes for an existing user. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New common name.
    pub cn: Option<String>,
    /// New surname.
    pub sn: Option<String>,
    /// New password.
    pub password: Option<SecretString>,
}

impl UserUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the common name.
    #[must_use]
    pub fn with_cn(mut self, cn: impl Into<String>) -> Self {
        self.cn = Some(cn.into());
        self
    }

    /// Sets the surname.
    #[must_use]
    pub fn with_sn(mut self, sn: impl Into<String>) -> Self {
        self.sn = Some(sn.into());
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// The attribute replacements this update asks for, in a fixed order.
    /// Empty values count as absent.
    pub(crate) fn changes(&self) -> Vec<(&'static str, String)> {
        let mut changes = Vec::new();
        if let Some(cn) = non_empty(self.cn.as_deref()) {
            changes.push(("cn", cn.to_string()));
        }
        if let Some(sn) = non_empty(self.sn.as_deref()) {
            changes.push(("sn", sn.to_string()));
        }
        if let Some(password) = &self.password {
            if !password.expose_secret().is_empty() {
                changes.push(("userPassword", password.expose_secret().to_string()));
            }
        }
        changes
    }

    /// True when the update carries no effective change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Builds a [`User`] from a directory entry.
///
/// The uid comes from the entry attributes, falling back to the entry DN;
/// entries with neither are unusable and yield `None`.
pub(crate) fn parse_user_entry(entry: &DirectoryEntry) -> Option<User> {
    let uid = match entry.first("uid") {
        Some(uid) => uid.to_string(),
        None => DistinguishedName::parse(&entry.dn)
            .ok()?
            .get("uid")?
            .to_string(),
    };

    Some(User {
        dn: entry.dn.clone(),
        uid,
        cn: entry.first("cn").map(ToString::to_string),
        sn: entry.first("sn").map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn new_user_with_all_attributes_is_valid() {
        let user = NewUser::new("Alice Person", "Person", secret("hunter2"));
        assert!(user.validate().is_ok());
    }

    #[test]
    fn validation_lists_every_missing_attribute() {
        let user = NewUser::new("", "", secret(""));
        let error = user.validate().unwrap_err();
        assert_eq!(error.message, "missing required attribute(s): cn, sn, userPassword");

        let user = NewUser::new("Alice Person", "", secret("hunter2"));
        let error = user.validate().unwrap_err();
        assert_eq!(error.message, "missing required attribute(s): sn");
    }

    #[test]
    fn entry_attributes_follow_schema_order() {
        let user = NewUser::new("Alice Person", "Person", secret("hunter2"));
        let attrs = user.to_attributes("alice");
        let names: Vec<&str> = attrs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["objectClass", "cn", "sn", "uid", "userPassword"]);
        assert_eq!(attrs[0].1, vec!["inetOrgPerson".to_string()]);
        assert_eq!(attrs[3].1, vec!["alice".to_string()]);
    }

    #[test]
    fn update_changes_keep_fixed_order_and_skip_absent() {
        let update = UserUpdate::new()
            .with_password(secret("hunter2"))
            .with_cn("Alice Person");
        let changes = update.changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].0, "cn");
        assert_eq!(changes[1].0, "userPassword");
    }

    #[test]
    fn update_treats_empty_values_as_absent() {
        let update = UserUpdate::new().with_cn("").with_sn("").with_password(secret(""));
        assert!(update.is_empty());
        assert!(update.changes().is_empty());
    }

    #[test]
    fn parses_entry_with_attributes() {
        let entry = DirectoryEntry {
            dn: "uid=alice,ou=people,dc=example,dc=org".to_string(),
            attributes: HashMap::from([
                ("uid".to_string(), vec!["alice".to_string()]),
                ("cn".to_string(), vec!["Alice Person".to_string()]),
                ("sn".to_string(), vec!["Person".to_string()]),
            ]),
        };

        let user = parse_user_entry(&entry).expect("entry should parse");
        assert_eq!(user.uid, "alice");
        assert_eq!(user.cn.as_deref(), Some("Alice Person"));
        assert_eq!(user.sn.as_deref(), Some("Person"));
    }

    #[test]
    fn falls_back_to_dn_for_uid() {
        let entry = DirectoryEntry {
            dn: "uid=alice,ou=people,dc=example,dc=org".to_string(),
            attributes: HashMap::new(),
        };

        let user = parse_user_entry(&entry).expect("entry should parse");
        assert_eq!(user.uid, "alice");
        assert_eq!(user.cn, None);
    }

    #[test]
    fn entry_without_uid_anywhere_is_skipped() {
        let entry = DirectoryEntry {
            dn: "ou=people,dc=example,dc=org".to_string(),
            attributes: HashMap::new(),
        };
        assert!(parse_user_entry(&entry).is_none());
    }

    #[test]
    fn serialized_user_never_contains_password_field() {
        let user = User {
            dn: "uid=alice,ou=people,dc=example,dc=org".to_string(),
            uid: "alice".to_string(),
            cn: Some("Alice Person".to_string()),
            sn: None,
        };
        let json = serde_json::to_string(&user).expect("user should serialize");
        assert!(json.contains("\"uid\":\"alice\""));
        assert!(!json.to_lowercase().contains("password"));
        assert!(!json.contains("\"sn\""));
    }
}
