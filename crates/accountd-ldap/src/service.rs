//! Directory-operation orchestration.
//!
//! [`DirectoryService`] owns one directory connection and exposes one method
//! per logical account operation. Every method issues a fixed sequence of
//! primitives, records each outcome in an [`OperationLog`], and returns the
//! log. A failed step is data, not an `Err`: binds that fail short-circuit,
//! group cleanup keeps going, and the log carries whatever happened.

use secrecy::SecretString;
use serde::Serialize;
use tracing::warn;

use crate::config::DirectoryConfig;
use crate::conn::{
    escape_filter_value, AttributeChange, DirectoryConnection, SearchOutcome, SearchScope,
};
use crate::dn::{DistinguishedName, RelativeDistinguishedName};
use crate::group::{parse_group_entry, Group, NewGroup, GROUP_OBJECT_CLASS};
use crate::membership::{self, MEMBER_ATTRIBUTE};
use crate::oplog::{ErrorKind, OperationError, OperationLog, SubOperation};
use crate::user::{parse_user_entry, NewUser, User, UserUpdate, USER_OBJECT_CLASS};
use crate::Result;

const PRESENCE_FILTER: &str = "(objectClass=*)";

/// Bind credential for one request.
///
/// Ephemeral by design: built per request, dropped with it, never stored.
/// The password is redacted from `Debug` output and the type is not
/// serializable.
#[derive(Debug, Clone)]
pub struct Credential {
    dn: String,
    password: SecretString,
}

impl Credential {
    /// Creates a credential that binds as `dn`.
    #[must_use]
    pub fn new(dn: impl Into<String>, password: SecretString) -> Self {
        Self {
            dn: dn.into(),
            password,
        }
    }

    /// The bind DN.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }
}

/// A fetch-user outcome: the operation log plus the parsed entry.
#[derive(Debug, Clone, Serialize)]
pub struct UserLookup {
    /// Log of the primitives issued.
    #[serde(flatten)]
    pub log: OperationLog,
    /// The user, when found and parseable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// A fetch-group outcome: the operation log plus the parsed entry.
#[derive(Debug, Clone, Serialize)]
pub struct GroupLookup {
    /// Log of the primitives issued.
    #[serde(flatten)]
    pub log: OperationLog,
    /// The group, when found and parseable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

/// A list-users outcome.
#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    /// Log of the primitives issued.
    #[serde(flatten)]
    pub log: OperationLog,
    /// Users parsed from the delivered entries.
    pub users: Vec<User>,
}

/// A list-groups outcome.
#[derive(Debug, Clone, Serialize)]
pub struct GroupListing {
    /// Log of the primitives issued.
    #[serde(flatten)]
    pub log: OperationLog,
    /// Groups parsed from the delivered entries.
    pub groups: Vec<Group>,
}

/// Orchestrates account operations over one directory connection.
///
/// Methods take `&mut self`: a connection carries one operation at a time,
/// and a service instance belongs to a single session.
pub struct DirectoryService {
    conn: DirectoryConnection,
    people_dn: DistinguishedName,
    groups_dn: DistinguishedName,
}

impl DirectoryService {
    /// Connects to the directory server and prepares the subtree DNs.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or the TLS settings
    /// are unusable.
    pub async fn connect(config: &DirectoryConfig) -> Result<Self> {
        let conn = DirectoryConnection::connect(config).await?;
        Ok(Self {
            conn,
            people_dn: config.people_dn(),
            groups_dn: config.groups_dn(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_connection(conn: DirectoryConnection, config: &DirectoryConfig) -> Self {
        Self {
            conn,
            people_dn: config.people_dn(),
            groups_dn: config.groups_dn(),
        }
    }

    /// Distinguished name of the user entry for `uid`.
    #[must_use]
    pub fn user_dn(&self, uid: &str) -> DistinguishedName {
        self.people_dn
            .clone()
            .with_prefix(RelativeDistinguishedName::new("uid", uid))
    }

    /// Distinguished name of the group entry for `gid`.
    #[must_use]
    pub fn group_dn(&self, gid: &str) -> DistinguishedName {
        self.groups_dn
            .clone()
            .with_prefix(RelativeDistinguishedName::new("cn", gid))
    }

    /// Credential that binds as the user entry for `uid`.
    #[must_use]
    pub fn user_credential(&self, uid: &str, password: SecretString) -> Credential {
        Credential::new(self.user_dn(uid).as_str(), password)
    }

    /// Verifies a user's credentials with a single bind.
    pub async fn authenticate(&mut self, uid: &str, password: &SecretString) -> OperationLog {
        let mut log = OperationLog::new(format!("authenticate {uid}"));
        let dn = self.user_dn(uid);
        log.push(self.conn.bind(dn.as_str(), password).await);
        log
    }

    /// Creates a user entry after validating the payload locally.
    ///
    /// A payload missing `cn`, `sn`, or `userPassword` fails without
    /// touching the server.
    pub async fn create_user(&mut self, bind: &Credential, uid: &str, user: &NewUser) -> OperationLog {
        let mut log = OperationLog::new(format!("add {uid}"));

        if let Err(error) = user.validate() {
            log.fail(error);
            return log;
        }

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let dn = self.user_dn(uid);
        log.push(self.conn.add(dn.as_str(), user.to_attributes(uid)).await);
        log
    }

    /// Fetches a user entry by uid.
    pub async fn fetch_user(&mut self, bind: &Credential, uid: &str) -> UserLookup {
        let mut log = OperationLog::new(format!("get {uid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return UserLookup { log, user: None };
        }

        let dn = self.user_dn(uid);
        let SearchOutcome { result, entries } = self
            .conn
            .search(dn.as_str(), SearchScope::Base, PRESENCE_FILTER)
            .await;
        log.push(result);

        let user = entries.first().and_then(|entry| {
            let user = parse_user_entry(entry);
            if user.is_none() {
                warn!("Skipping unparseable user entry `{}`", entry.dn);
            }
            user
        });

        UserLookup { log, user }
    }

    /// Applies attribute replacements to a user entry.
    ///
    /// Replacements are issued one attribute at a time, in a fixed order,
    /// and a failed replacement does not stop the remaining ones. An update
    /// with nothing to change succeeds without touching the server.
    pub async fn update_user(
        &mut self,
        bind: &Credential,
        uid: &str,
        update: &UserUpdate,
    ) -> OperationLog {
        let mut log = OperationLog::new(format!("modify {uid}"));

        let changes = update.changes();
        if changes.is_empty() {
            return log;
        }

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let dn = self.user_dn(uid);
        for (attribute, value) in changes {
            let change = AttributeChange::replace(attribute, vec![value]);
            log.push(self.conn.modify(dn.as_str(), change).await);
        }
        log
    }

    /// Deletes a user entry and scrubs it from every group that lists it.
    ///
    /// The entry delete and each group's cleanup are attempted
    /// independently; one group's failure does not stop the others. Only a
    /// failure of the membership search itself cuts the operation short,
    /// since without it there is nothing to clean up.
    pub async fn delete_user(&mut self, bind: &Credential, uid: &str) -> OperationLog {
        let mut log = OperationLog::new(format!("del {uid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let dn = self.user_dn(uid);
        log.push(self.conn.delete(dn.as_str()).await);

        let filter = format!("(member={})", escape_filter_value(dn.as_str()));
        let SearchOutcome { result, entries } = self
            .conn
            .search(self.groups_dn.as_str(), SearchScope::OneLevel, &filter)
            .await;
        if !log.push(result) {
            return log;
        }

        for entry in &entries {
            let members = entry
                .values(MEMBER_ATTRIBUTE)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            for change in membership::plan_remove(&members, dn.as_str()) {
                log.push(self.conn.modify(&entry.dn, change).await);
            }
        }
        log
    }

    /// Creates a group entry; an empty member list gets the schema
    /// placeholder so the entry is valid from the start.
    pub async fn create_group(
        &mut self,
        bind: &Credential,
        gid: &str,
        group: &NewGroup,
    ) -> OperationLog {
        let mut log = OperationLog::new(format!("add {gid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let dn = self.group_dn(gid);
        log.push(self.conn.add(dn.as_str(), group.to_attributes(gid)).await);
        log
    }

    /// Fetches a group entry by gid.
    pub async fn fetch_group(&mut self, bind: &Credential, gid: &str) -> GroupLookup {
        let mut log = OperationLog::new(format!("get {gid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return GroupLookup { log, group: None };
        }

        let dn = self.group_dn(gid);
        let SearchOutcome { result, entries } = self
            .conn
            .search(dn.as_str(), SearchScope::Base, PRESENCE_FILTER)
            .await;
        log.push(result);

        let group = entries.first().and_then(|entry| {
            let group = parse_group_entry(entry);
            if group.is_none() {
                warn!("Skipping unparseable group entry `{}`", entry.dn);
            }
            group
        });

        GroupLookup { log, group }
    }

    /// Deletes a group entry.
    pub async fn delete_group(&mut self, bind: &Credential, gid: &str) -> OperationLog {
        let mut log = OperationLog::new(format!("del {gid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let dn = self.group_dn(gid);
        log.push(self.conn.delete(dn.as_str()).await);
        log
    }

    /// Adds a user to a group, clearing the placeholder if one was present.
    ///
    /// The add is issued before the placeholder delete, so the group never
    /// passes through an empty-member state; if the add fails, the
    /// placeholder stays.
    pub async fn add_user_to_group(
        &mut self,
        bind: &Credential,
        uid: &str,
        gid: &str,
    ) -> OperationLog {
        let mut log = OperationLog::new(format!("add {uid} to {gid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let group_dn = self.group_dn(gid);
        let (check, members) = self.check_group(gid, group_dn.as_str()).await;
        if !log.push(check) {
            return log;
        }

        let members = members.unwrap_or_default();
        let user_dn = self.user_dn(uid);
        for change in membership::plan_add(&members, user_dn.as_str()) {
            if !log.push(self.conn.modify(group_dn.as_str(), change).await) {
                break;
            }
        }
        log
    }

    /// Removes a user from a group, swapping in the placeholder when the
    /// last real member leaves.
    pub async fn remove_user_from_group(
        &mut self,
        bind: &Credential,
        uid: &str,
        gid: &str,
    ) -> OperationLog {
        let mut log = OperationLog::new(format!("del {uid} from {gid}"));

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return log;
        }

        let group_dn = self.group_dn(gid);
        let (check, members) = self.check_group(gid, group_dn.as_str()).await;
        if !log.push(check) {
            return log;
        }

        let members = members.unwrap_or_default();
        let user_dn = self.user_dn(uid);
        for change in membership::plan_remove(&members, user_dn.as_str()) {
            if !log.push(self.conn.modify(group_dn.as_str(), change).await) {
                break;
            }
        }
        log
    }

    /// Lists every user under the people subtree.
    pub async fn list_users(&mut self, bind: &Credential) -> UserListing {
        let mut log = OperationLog::new("list users");

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return UserListing {
                log,
                users: Vec::new(),
            };
        }

        let filter = format!("(objectClass={USER_OBJECT_CLASS})");
        let SearchOutcome { result, entries } = self
            .conn
            .search(self.people_dn.as_str(), SearchScope::Subtree, &filter)
            .await;
        log.push(result);

        let users = entries
            .iter()
            .filter_map(|entry| {
                let user = parse_user_entry(entry);
                if user.is_none() {
                    warn!("Skipping unparseable user entry `{}`", entry.dn);
                }
                user
            })
            .collect();

        UserListing { log, users }
    }

    /// Lists every group under the groups subtree.
    pub async fn list_groups(&mut self, bind: &Credential) -> GroupListing {
        let mut log = OperationLog::new("list groups");

        if !log.push(self.conn.bind(bind.dn(), bind.password()).await) {
            return GroupListing {
                log,
                groups: Vec::new(),
            };
        }

        let filter = format!("(objectClass={GROUP_OBJECT_CLASS})");
        let SearchOutcome { result, entries } = self
            .conn
            .search(self.groups_dn.as_str(), SearchScope::Subtree, &filter)
            .await;
        log.push(result);

        let groups = entries
            .iter()
            .filter_map(|entry| {
                let group = parse_group_entry(entry);
                if group.is_none() {
                    warn!("Skipping unparseable group entry `{}`", entry.dn);
                }
                group
            })
            .collect();

        GroupListing { log, groups }
    }

    /// Tears the connection down, consuming the service.
    pub async fn close(mut self) -> OperationLog {
        let mut log = OperationLog::new("unbind");
        log.push(self.conn.unbind().await);
        log
    }

    /// Confirms a group exists and returns its current member values.
    ///
    /// The existence check is recorded as its own labeled sub-operation. A
    /// missing group maps to a domain not-found error; transport and other
    /// failures pass through as themselves.
    async fn check_group(
        &mut self,
        gid: &str,
        group_dn: &str,
    ) -> (SubOperation, Option<Vec<String>>) {
        let SearchOutcome { result, entries } = self
            .conn
            .search(group_dn, SearchScope::Base, PRESENCE_FILTER)
            .await;
        let op = format!("check group {gid}");

        if result.ok {
            if let Some(entry) = entries.first() {
                let members = entry
                    .values(MEMBER_ATTRIBUTE)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                return (SubOperation::succeeded(op), Some(members));
            }
            let error = OperationError::not_found(format!("{gid} does not exist"));
            return (SubOperation::failed(op, error), None);
        }

        let error = match result.error {
            Some(error) if error.kind == ErrorKind::NotFound => {
                OperationError::not_found(format!("{gid} does not exist"))
            }
            Some(error) => error,
            None => OperationError::not_found(format!("{gid} does not exist")),
        };
        (SubOperation::failed(op, error), None)
    }
}
