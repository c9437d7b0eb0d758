//! Normalizing wrapper over the raw LDAP connection.
//!
//! [`DirectoryConnection`] exposes one method per protocol primitive. Every
//! method resolves to a [`SubOperation`]: protocol rejections, transport
//! failures, and timeouts all come back in-band as failed results rather
//! than as `Err`, so orchestration code composes outcomes instead of
//! unwinding. Transport failures are additionally reported on the operator
//! log before being folded into the result.

use crate::config::DirectoryConfig;
use crate::oplog::{OperationError, SubOperation};
use async_trait::async_trait;
use ldap3::{
    LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry, SearchResult,
};
use native_tls::{Certificate, TlsConnector};
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

use accountd_core::error::Error;
use accountd_core::Result;

/// Raw outcome of one protocol call, before normalization.
pub(crate) type ProtocolResult<T> = std::result::Result<T, LdapError>;

/// Search scope for directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Directory entry as delivered by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map; value order is preserved from the server.
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of the named attribute, if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of the named attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes.get(attribute).map(Vec::as_slice)
    }
}

/// A single-attribute modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    /// Add values to the attribute.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Delete values from the attribute (an empty list removes the attribute).
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete.
        values: Vec<String>,
    },
    /// Replace all values of the attribute.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values.
        values: Vec<String>,
    },
}

impl AttributeChange {
    /// An add modification.
    #[must_use]
    pub fn add(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::Add {
            attribute: attribute.into(),
            values,
        }
    }

    /// A delete modification.
    #[must_use]
    pub fn delete(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::Delete {
            attribute: attribute.into(),
            values,
        }
    }

    /// A replace modification.
    #[must_use]
    pub fn replace(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::Replace {
            attribute: attribute.into(),
            values,
        }
    }

    /// The attribute being modified.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Add { attribute, .. }
            | Self::Delete { attribute, .. }
            | Self::Replace { attribute, .. } => attribute,
        }
    }

    /// The values carried by the change.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Add { values, .. }
            | Self::Delete { values, .. }
            | Self::Replace { values, .. } => values,
        }
    }

    /// Wire name of the modification type, used in operation labels.
    #[must_use]
    pub const fn operation_name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
            Self::Replace { .. } => "replace",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapBackend: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> ProtocolResult<LdapResult>;
    async fn add(
        &mut self,
        dn: &str,
        attributes: Vec<(String, Vec<String>)>,
    ) -> ProtocolResult<LdapResult>;
    async fn modify(&mut self, dn: &str, change: AttributeChange) -> ProtocolResult<LdapResult>;
    async fn delete(&mut self, dn: &str) -> ProtocolResult<LdapResult>;
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
    ) -> ProtocolResult<(Vec<DirectoryEntry>, LdapResult)>;
    async fn unbind(&mut self) -> ProtocolResult<()>;
}

struct Ldap3Backend {
    inner: ldap3::Ldap,
}

impl Ldap3Backend {
    async fn connect(config: &DirectoryConfig) -> Result<Self> {
        let settings = build_ldap_settings(config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, config.url())
            .await
            .map_err(|err| {
                Error::DirectoryUnavailable(format!("{}: {err}", config.url()))
            })?;
        ldap3::drive!(conn);
        Ok(Self { inner: ldap })
    }
}

#[async_trait]
impl LdapBackend for Ldap3Backend {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> ProtocolResult<LdapResult> {
        self.inner.simple_bind(dn, password).await
    }

    async fn add(
        &mut self,
        dn: &str,
        attributes: Vec<(String, Vec<String>)>,
    ) -> ProtocolResult<LdapResult> {
        let attrs = attributes
            .into_iter()
            .map(|(attribute, values)| (attribute, values.into_iter().collect::<HashSet<_>>()))
            .collect::<Vec<_>>();
        self.inner.add(dn, attrs).await
    }

    async fn modify(&mut self, dn: &str, change: AttributeChange) -> ProtocolResult<LdapResult> {
        let modification = match change {
            AttributeChange::Add { attribute, values } => {
                Mod::Add(attribute, values.into_iter().collect())
            }
            AttributeChange::Delete { attribute, values } => {
                Mod::Delete(attribute, values.into_iter().collect())
            }
            AttributeChange::Replace { attribute, values } => {
                Mod::Replace(attribute, values.into_iter().collect())
            }
        };
        self.inner.modify(dn, vec![modification]).await
    }

    async fn delete(&mut self, dn: &str) -> ProtocolResult<LdapResult> {
        self.inner.delete(dn).await
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
    ) -> ProtocolResult<(Vec<DirectoryEntry>, LdapResult)> {
        let SearchResult(entries, result) = self
            .inner
            .search(base, scope.into(), filter, vec!["*"])
            .await?;
        let entries = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect();
        Ok((entries, result))
    }

    async fn unbind(&mut self) -> ProtocolResult<()> {
        self.inner.unbind().await
    }
}

/// Result of a search: the normalized outcome plus any delivered entries.
///
/// Entries can accompany a failed result; the server may deliver some
/// before reporting an error.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Normalized result of the search itself.
    pub result: SubOperation,
    /// Entries delivered by the server, in delivery order.
    pub entries: Vec<DirectoryEntry>,
}

/// Uniform wrapper over the directory primitives.
///
/// Each method applies the configured operation deadline, labels the
/// outcome, and normalizes it; callers always get a [`SubOperation`] back,
/// whatever went wrong.
pub struct DirectoryConnection {
    backend: Box<dyn LdapBackend>,
    operation_timeout: Duration,
}

impl DirectoryConnection {
    /// Connects to the directory server named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the TLS settings are unusable and
    /// [`Error::DirectoryUnavailable`] if the server cannot be reached.
    pub async fn connect(config: &DirectoryConfig) -> Result<Self> {
        let backend = Ldap3Backend::connect(config).await?;
        Ok(Self {
            backend: Box::new(backend),
            operation_timeout: config.operation_timeout(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_backend(
        backend: Box<dyn LdapBackend>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            operation_timeout,
        }
    }

    /// Authenticates as `dn`.
    pub async fn bind(&mut self, dn: &str, password: &SecretString) -> SubOperation {
        let op = format!("bind {dn}");
        match timeout(
            self.operation_timeout,
            self.backend.simple_bind(dn, password.expose_secret()),
        )
        .await
        {
            Ok(outcome) => normalize(op, outcome),
            Err(_) => timed_out(op),
        }
    }

    /// Creates an entry with the given attributes.
    pub async fn add(
        &mut self,
        dn: &str,
        attributes: Vec<(String, Vec<String>)>,
    ) -> SubOperation {
        let op = format!("add {dn}");
        match timeout(self.operation_timeout, self.backend.add(dn, attributes)).await {
            Ok(outcome) => normalize(op, outcome),
            Err(_) => timed_out(op),
        }
    }

    /// Applies a single-attribute change to an entry.
    pub async fn modify(&mut self, dn: &str, change: AttributeChange) -> SubOperation {
        let op = format!(
            "modify {dn} {} {}",
            change.operation_name(),
            change.attribute()
        );
        match timeout(self.operation_timeout, self.backend.modify(dn, change)).await {
            Ok(outcome) => normalize(op, outcome),
            Err(_) => timed_out(op),
        }
    }

    /// Deletes an entry.
    pub async fn delete(&mut self, dn: &str) -> SubOperation {
        let op = format!("del {dn}");
        match timeout(self.operation_timeout, self.backend.delete(dn)).await {
            Ok(outcome) => normalize(op, outcome),
            Err(_) => timed_out(op),
        }
    }

    /// Runs a search under `base`.
    pub async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
    ) -> SearchOutcome {
        let op = format!("search {base}");
        match timeout(
            self.operation_timeout,
            self.backend.search(base, scope, filter),
        )
        .await
        {
            Ok(Ok((entries, result))) => SearchOutcome {
                result: normalize(op, Ok(result)),
                entries,
            },
            Ok(Err(err)) => SearchOutcome {
                result: normalize(op, Err(err)),
                entries: Vec::new(),
            },
            Err(_) => SearchOutcome {
                result: timed_out(op),
                entries: Vec::new(),
            },
        }
    }

    /// Closes the connection.
    pub async fn unbind(&mut self) -> SubOperation {
        let op = "unbind".to_string();
        match timeout(self.operation_timeout, self.backend.unbind()).await {
            Ok(Ok(())) => SubOperation::succeeded(op),
            Ok(Err(err)) => normalize(op, Err(err)),
            Err(_) => timed_out(op),
        }
    }
}

fn normalize(op: String, outcome: ProtocolResult<LdapResult>) -> SubOperation {
    match outcome {
        Ok(result) if result.rc == 0 => SubOperation::succeeded(op),
        Ok(result) => SubOperation::failed(
            op,
            OperationError::from_result_code(result.rc, result.text),
        ),
        Err(LdapError::LdapResult { result }) => SubOperation::failed(
            op,
            OperationError::from_result_code(result.rc, result.text),
        ),
        Err(err) => {
            error!("Directory transport failure during `{op}`: {err}");
            SubOperation::failed(
                op,
                OperationError::transport("connectionError", err.to_string()),
            )
        }
    }
}

fn timed_out(op: String) -> SubOperation {
    error!("Directory operation `{op}` did not complete before the deadline");
    SubOperation::failed(
        op,
        OperationError::transport("timeout", "operation timed out"),
    )
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read directory CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            Error::ConfigError(format!("invalid directory CA certificate: {err}"))
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load directory CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

/// Escapes a value for embedding in a search filter.
pub(crate) fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
