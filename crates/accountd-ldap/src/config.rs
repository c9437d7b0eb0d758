//! Configuration for connecting to the directory server.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::dn::{DistinguishedName, RelativeDistinguishedName};
use crate::Result;
use accountd_core::config::ServiceConfig;

/// Default timeout for establishing connections, in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Default timeout for individual directory operations, in seconds.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

const DEFAULT_PEOPLE_OU: &str = "people";
const DEFAULT_GROUPS_OU: &str = "groups";

/// Configuration for a directory connection.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    url: String,
    base_dn: DistinguishedName,
    people_ou: String,
    groups_ou: String,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a directory configuration for the given endpoint and base DN.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or base DN cannot be parsed.
    pub fn new(url: impl Into<String>, base_dn: impl AsRef<str>) -> Result<Self> {
        let url = url.into();
        Url::parse(&url)?;
        let base_dn = DistinguishedName::parse(base_dn)?;

        Ok(Self {
            url,
            base_dn,
            people_ou: DEFAULT_PEOPLE_OU.to_string(),
            groups_ou: DEFAULT_GROUPS_OU.to_string(),
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Derives a directory configuration from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL or base DN cannot be parsed.
    pub fn from_service_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(config.ldap_url.clone(), &config.base_dn)
    }

    /// The directory endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The base distinguished name.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Distinguished name of the subtree holding user entries.
    #[must_use]
    pub fn people_dn(&self) -> DistinguishedName {
        self.base_dn
            .clone()
            .with_prefix(RelativeDistinguishedName::new("ou", &self.people_ou))
    }

    /// Distinguished name of the subtree holding group entries.
    #[must_use]
    pub fn groups_dn(&self) -> DistinguishedName {
        self.base_dn
            .clone()
            .with_prefix(RelativeDistinguishedName::new("ou", &self.groups_ou))
    }

    /// Whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Timeout for establishing connections.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Timeout applied to each directory operation.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Overrides the organizational unit holding user entries.
    #[must_use]
    pub fn with_people_ou(mut self, ou: impl Into<String>) -> Self {
        self.people_ou = ou.into();
        self
    }

    /// Overrides the organizational unit holding group entries.
    #[must_use]
    pub fn with_groups_ou(mut self, ou: impl Into<String>) -> Self {
        self.groups_ou = ou.into();
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accountd_core::error::Error;

    fn sample_config() -> DirectoryConfig {
        DirectoryConfig::new("ldap://localhost", "dc=example,dc=org")
            .expect("config should be valid")
    }

    #[test]
    fn applies_defaults() {
        let config = sample_config();
        assert_eq!(config.url(), "ldap://localhost");
        assert_eq!(config.base_dn().as_str(), "dc=example,dc=org");
        assert!(config.tls_verify());
        assert!(config.tls_ca_cert().is_none());
        assert_eq!(config.connection_timeout(), Duration::from_secs(10));
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn derives_subtree_dns() {
        let config = sample_config();
        assert_eq!(config.people_dn().as_str(), "ou=people,dc=example,dc=org");
        assert_eq!(config.groups_dn().as_str(), "ou=groups,dc=example,dc=org");
    }

    #[test]
    fn builders_override_defaults() {
        let config = sample_config()
            .with_people_ou("accounts")
            .with_groups_ou("teams")
            .with_tls_verification(false)
            .with_tls_ca_cert(PathBuf::from("/etc/ssl/directory.pem"))
            .with_connection_timeout_secs(3)
            .with_operation_timeout_secs(4);

        assert_eq!(config.people_dn().as_str(), "ou=accounts,dc=example,dc=org");
        assert_eq!(config.groups_dn().as_str(), "ou=teams,dc=example,dc=org");
        assert!(!config.tls_verify());
        assert_eq!(
            config.tls_ca_cert(),
            Some(&PathBuf::from("/etc/ssl/directory.pem"))
        );
        assert_eq!(config.connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.operation_timeout(), Duration::from_secs(4));
    }

    #[test]
    fn rejects_invalid_url() {
        let err = DirectoryConfig::new("not a url", "dc=example,dc=org").unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn rejects_invalid_base_dn() {
        let err = DirectoryConfig::new("ldap://localhost", "").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn derives_from_service_config() {
        let service = ServiceConfig::new("dc=example,dc=org", "s3cret")
            .expect("service config should be valid");

        let config = DirectoryConfig::from_service_config(&service)
            .expect("directory config should derive");
        assert_eq!(config.url(), "ldap://localhost");
        assert_eq!(config.base_dn().as_str(), "dc=example,dc=org");
    }
}
