//! Service configuration.
//!
//! This module provides the configuration structure for an accountd process,
//! loaded from a JSON file. Field names on the wire keep the historical
//! camel-case spelling (`listenPort`, `ldapURL`, `baseDN`, ...), so existing
//! deployment configs keep working.

use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Configuration for an accountd service instance.
///
/// Everything except `base_dn` and `session_secret_key` has a default, so a
/// minimal config file only names those two.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// TCP port the HTTP front end listens on
    #[validate(range(min = 1))]
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Directory server URL
    #[validate(url)]
    #[serde(default = "default_ldap_url", rename = "ldapURL")]
    pub ldap_url: String,

    /// Directory subtree holding the people and groups organizational units
    #[validate(length(min = 1))]
    #[serde(rename = "baseDN")]
    pub base_dn: String,

    /// Secret used to sign session cookies
    #[serde(skip_serializing)]
    pub session_secret_key: SecretString,

    /// Name of the session cookie
    #[validate(length(min = 1))]
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Session cookie attributes
    #[validate(nested)]
    #[serde(default)]
    pub session_cookie: SessionCookieConfig,
}

const fn default_listen_port() -> u16 {
    8082
}

fn default_ldap_url() -> String {
    "ldap://localhost".to_string()
}

fn default_session_cookie_name() -> String {
    "AuthTicket".to_string()
}

impl ServiceConfig {
    /// Create a new service configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `base_dn` - The directory subtree (e.g., "dc=example,dc=org")
    /// * `session_secret_key` - The cookie signing secret
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn new(
        base_dn: impl Into<String>,
        session_secret_key: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            listen_port: default_listen_port(),
            ldap_url: default_ldap_url(),
            base_dn: base_dn.into(),
            session_secret_key: SecretString::from(session_secret_key.into()),
            session_cookie_name: default_session_cookie_name(),
            session_cookie: SessionCookieConfig::default(),
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {}", e)))?;

        Ok(config)
    }

    /// Load a service configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {}", e)))?;

        tracing::info!(
            path = %path.display(),
            listen_port = config.listen_port,
            "Loaded service configuration"
        );

        Ok(config)
    }

    /// Set the listen port.
    #[must_use]
    pub const fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the directory server URL.
    #[must_use]
    pub fn with_ldap_url(mut self, url: impl Into<String>) -> Self {
        self.ldap_url = url.into();
        self
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session_cookie_name = name.into();
        self
    }

    /// Set the session cookie attributes.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: SessionCookieConfig) -> Self {
        self.session_cookie = cookie;
        self
    }

    /// Address the HTTP front end should bind, derived from the listen port.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }
}

/// Attributes of the session cookie handed to authenticated clients.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookieConfig {
    /// Cookie path
    #[serde(default = "default_cookie_path")]
    pub path: String,

    /// Whether the cookie is unreadable from client-side scripts
    #[serde(default = "default_cookie_http_only")]
    pub http_only: bool,

    /// Whether the cookie is sent over TLS only
    #[serde(default)]
    pub secure: bool,

    /// Cookie lifetime in seconds
    #[validate(range(min = 1))]
    #[serde(default = "default_cookie_max_age_secs", rename = "maxAge")]
    pub max_age_secs: u64,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

const fn default_cookie_http_only() -> bool {
    true
}

const fn default_cookie_max_age_secs() -> u64 {
    7200
}

impl SessionCookieConfig {
    /// Create cookie attributes with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: default_cookie_path(),
            http_only: default_cookie_http_only(),
            secure: false,
            max_age_secs: default_cookie_max_age_secs(),
        }
    }

    /// Set the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Require a secure transport for the cookie.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the cookie lifetime in seconds.
    #[must_use]
    pub const fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age_secs = seconds;
        self
    }

    /// Get the cookie lifetime as a Duration.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_temp_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("accountd-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_service_config_new() {
        let config = ServiceConfig::new("dc=example,dc=org", "s3cret").unwrap();
        assert_eq!(config.listen_port, 8082);
        assert_eq!(config.ldap_url, "ldap://localhost");
        assert_eq!(config.base_dn, "dc=example,dc=org");
        assert_eq!(config.session_cookie_name, "AuthTicket");
        assert_eq!(config.session_secret_key.expose_secret(), "s3cret");
    }

    #[test]
    fn test_service_config_empty_base_dn() {
        let result = ServiceConfig::new("", "s3cret");
        assert!(result.is_err());
    }

    #[test]
    fn test_service_config_builder() {
        let config = ServiceConfig::new("dc=example,dc=org", "s3cret")
            .unwrap()
            .with_listen_port(9090)
            .with_ldap_url("ldaps://directory.example.org")
            .with_session_cookie_name("Session");

        assert_eq!(config.listen_port, 9090);
        assert_eq!(config.ldap_url, "ldaps://directory.example.org");
        assert_eq!(config.session_cookie_name, "Session");
    }

    #[test]
    fn test_bind_address() {
        let config = ServiceConfig::new("dc=example,dc=org", "s3cret")
            .unwrap()
            .with_listen_port(8082);
        assert_eq!(config.bind_address(), "0.0.0.0:8082");
    }

    #[test]
    fn test_load_full_config() {
        let path = write_temp_config(
            r#"{
                "listenPort": 8085,
                "ldapURL": "ldap://directory.example.org",
                "baseDN": "dc=example,dc=org",
                "sessionSecretKey": "s3cret",
                "sessionCookieName": "Ticket",
                "sessionCookie": {
                    "path": "/api",
                    "httpOnly": false,
                    "secure": true,
                    "maxAge": 3600
                }
            }"#,
        );

        let config = ServiceConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.listen_port, 8085);
        assert_eq!(config.ldap_url, "ldap://directory.example.org");
        assert_eq!(config.base_dn, "dc=example,dc=org");
        assert_eq!(config.session_cookie_name, "Ticket");
        assert_eq!(config.session_cookie.path, "/api");
        assert!(!config.session_cookie.http_only);
        assert!(config.session_cookie.secure);
        assert_eq!(config.session_cookie.max_age_secs, 3600);
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let path = write_temp_config(
            r#"{"baseDN": "dc=example,dc=org", "sessionSecretKey": "s3cret"}"#,
        );

        let config = ServiceConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.listen_port, 8082);
        assert_eq!(config.ldap_url, "ldap://localhost");
        assert_eq!(config.session_cookie_name, "AuthTicket");
        assert_eq!(config.session_cookie.path, "/");
        assert!(config.session_cookie.http_only);
        assert!(!config.session_cookie.secure);
        assert_eq!(config.session_cookie.max_age_secs, 7200);
    }

    #[test]
    fn test_load_missing_secret_fails() {
        let path = write_temp_config(r#"{"baseDN": "dc=example,dc=org"}"#);

        let result = ServiceConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = std::env::temp_dir().join("accountd-config-does-not-exist.json");
        let result = ServiceConfig::load(&path);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_validation_port_range() {
        let mut config = ServiceConfig::new("dc=example,dc=org", "s3cret").unwrap();
        config.listen_port = 0;
        assert!(config.validate().is_err());

        config.listen_port = 8082;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_ldap_url() {
        let mut config = ServiceConfig::new("dc=example,dc=org", "s3cret").unwrap();
        config.ldap_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_not_serialized() {
        let config = ServiceConfig::new("dc=example,dc=org", "s3cret").unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sessionSecretKey"));
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_serialized_field_names() {
        let config = ServiceConfig::new("dc=example,dc=org", "s3cret").unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"listenPort\""));
        assert!(json.contains("\"ldapURL\""));
        assert!(json.contains("\"baseDN\""));
        assert!(json.contains("\"maxAge\""));
    }

    #[test]
    fn test_session_cookie_config_builder() {
        let cookie = SessionCookieConfig::new()
            .with_path("/api")
            .with_secure(true)
            .with_max_age(600);

        assert_eq!(cookie.path, "/api");
        assert!(cookie.secure);
        assert_eq!(cookie.max_age_secs, 600);
        assert_eq!(cookie.max_age(), Duration::from_secs(600));
    }

    #[test]
    fn test_session_cookie_config_validation() {
        let cookie = SessionCookieConfig::new().with_max_age(0);
        assert!(cookie.validate().is_err());

        let cookie = cookie.with_max_age(7200);
        assert!(cookie.validate().is_ok());
    }
}
