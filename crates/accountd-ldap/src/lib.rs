//! Directory-operation orchestration for the accountd service.
//!
//! This crate wraps an LDAP connection in a uniform, non-throwing result
//! model: every directory primitive resolves to a normalized sub-operation
//! record, composite account operations collect those records in an
//! [`OperationLog`], and the `groupOfNames` member invariant is kept by a
//! small planning module that swaps an empty-string placeholder in and out.

#![deny(missing_docs)]

mod config;
mod conn;
mod dn;
mod group;
mod membership;
mod oplog;
mod service;
mod user;

pub use config::{DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OPERATION_TIMEOUT_SECS};
pub use conn::{AttributeChange, DirectoryConnection, DirectoryEntry, SearchOutcome, SearchScope};
pub use dn::{DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use group::{Group, NewGroup, GROUP_OBJECT_CLASS};
pub use membership::{
    initial_members, plan_add, plan_remove, real_members, MEMBER_ATTRIBUTE, PLACEHOLDER_MEMBER,
};
pub use oplog::{result_code_name, ErrorKind, OperationError, OperationLog, SubOperation};
pub use service::{
    Credential, DirectoryService, GroupListing, GroupLookup, UserListing, UserLookup,
};
pub use user::{NewUser, User, UserUpdate, USER_OBJECT_CLASS};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = accountd_core::Result<T>;
