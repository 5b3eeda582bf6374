//! Client configuration
//!
//! Configuration is validated eagerly: a [`DbConfig`] that builds
//! successfully can always be handed to the client, and invalid
//! combinations (missing credentials, ambiguous SSH auth) fail at
//! [`DbConfigBuilder::build`] rather than at connect time.

use crate::{Error, Result};
use std::path::PathBuf;

/// Validated connection configuration
///
/// Immutable after construction. Obtain one through [`DbConfig::builder`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database host
    pub host: String,
    /// Database port (default: 3306)
    pub port: u16,
    /// Username
    pub user: String,
    /// Password
    pub passwd: String,
    /// Database (schema) name
    pub database: String,
    /// Connection character set (default: "utf8")
    pub charset: String,
    /// SSH tunnel settings, present only when tunneling was requested
    pub tunnel: Option<TunnelConfig>,
}

/// SSH tunnel settings
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// SSH server host
    pub ssh_host: String,
    /// SSH server port (default: 22)
    pub ssh_port: u16,
    /// SSH username
    pub ssh_user: String,
    /// Authentication method
    pub auth: SshAuth,
}

/// SSH authentication method — exactly one per tunnel
#[derive(Debug, Clone)]
pub enum SshAuth {
    /// Password authentication
    Password(String),
    /// Private key file authentication
    KeyFile(PathBuf),
}

impl DbConfig {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```
    /// use relaykit::DbConfig;
    ///
    /// let config = DbConfig::builder()
    ///     .host("localhost")
    ///     .user("app")
    ///     .passwd("secret")
    ///     .database("orders")
    ///     .port(3307)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.charset, "utf8");
    /// ```
    pub fn builder() -> DbConfigBuilder {
        DbConfigBuilder::default()
    }
}

/// Builder for [`DbConfig`]
///
/// All fields are set through optional setters; `build()` enforces the
/// required-field and tunneling invariants.
#[derive(Debug, Clone, Default)]
pub struct DbConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    passwd: Option<String>,
    database: Option<String>,
    charset: Option<String>,
    tunneling: bool,
    ssh_host: Option<String>,
    ssh_port: Option<u16>,
    ssh_user: Option<String>,
    ssh_key: Option<PathBuf>,
    ssh_passwd: Option<String>,
}

impl DbConfigBuilder {
    /// Set the database host (required)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the database port
    ///
    /// Default: 3306
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username (required)
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password (required)
    pub fn passwd(mut self, passwd: impl Into<String>) -> Self {
        self.passwd = Some(passwd.into());
        self
    }

    /// Set the database name (required)
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the connection character set
    ///
    /// Default: "utf8"
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Route the connection through an SSH tunnel
    ///
    /// Default: false. When enabled, `ssh_host`, `ssh_user`, and exactly
    /// one of `ssh_key`/`ssh_passwd` are required.
    pub fn tunneling(mut self, tunneling: bool) -> Self {
        self.tunneling = tunneling;
        self
    }

    /// Set the SSH server host
    pub fn ssh_host(mut self, ssh_host: impl Into<String>) -> Self {
        self.ssh_host = Some(ssh_host.into());
        self
    }

    /// Set the SSH server port
    ///
    /// Default: 22
    pub fn ssh_port(mut self, ssh_port: u16) -> Self {
        self.ssh_port = Some(ssh_port);
        self
    }

    /// Set the SSH username
    pub fn ssh_user(mut self, ssh_user: impl Into<String>) -> Self {
        self.ssh_user = Some(ssh_user.into());
        self
    }

    /// Set the SSH private key file path
    pub fn ssh_key(mut self, ssh_key: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(ssh_key.into());
        self
    }

    /// Set the SSH password
    pub fn ssh_passwd(mut self, ssh_passwd: impl Into<String>) -> Self {
        self.ssh_passwd = Some(ssh_passwd.into());
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<DbConfig> {
        let (host, user, passwd, database) = match (self.host, self.user, self.passwd, self.database) {
            (Some(host), Some(user), Some(passwd), Some(database)) => {
                (host, user, passwd, database)
            }
            _ => {
                return Err(Error::Config(
                    "\"host\", \"user\", \"passwd\", \"database\" are required inputs".into(),
                ))
            }
        };

        let tunnel = if self.tunneling {
            let (ssh_host, ssh_user) = match (self.ssh_host, self.ssh_user) {
                (Some(ssh_host), Some(ssh_user)) => (ssh_host, ssh_user),
                _ => {
                    return Err(Error::Config(
                        "\"ssh_host\", \"ssh_user\" are required inputs when tunneling".into(),
                    ))
                }
            };
            let auth = match (self.ssh_key, self.ssh_passwd) {
                (Some(key), None) => SshAuth::KeyFile(key),
                (None, Some(passwd)) => SshAuth::Password(passwd),
                _ => {
                    return Err(Error::Config(
                        "exactly one of \"ssh_key\" and \"ssh_passwd\" must be set when tunneling"
                            .into(),
                    ))
                }
            };
            Some(TunnelConfig {
                ssh_host,
                ssh_port: self.ssh_port.unwrap_or(22),
                ssh_user,
                auth,
            })
        } else {
            None
        };

        Ok(DbConfig {
            host,
            port: self.port.unwrap_or(3306),
            user,
            passwd,
            database,
            charset: self.charset.unwrap_or_else(|| "utf8".to_string()),
            tunnel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DbConfigBuilder {
        DbConfig::builder()
            .host("h")
            .user("u")
            .passwd("p")
            .database("d")
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.port, 3306);
        assert_eq!(config.charset, "utf8");
        assert!(config.tunnel.is_none());
    }

    #[test]
    fn test_each_required_field_missing_fails() {
        let partials = [
            DbConfig::builder().user("u").passwd("p").database("d"),
            DbConfig::builder().host("h").passwd("p").database("d"),
            DbConfig::builder().host("h").user("u").database("d"),
            DbConfig::builder().host("h").user("u").passwd("p"),
        ];
        for builder in partials {
            assert!(matches!(builder.build(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_all_required_fields_missing_fails() {
        assert!(matches!(DbConfig::builder().build(), Err(Error::Config(_))));
    }

    #[test]
    fn test_tunneling_without_ssh_fields_fails() {
        let result = base().tunneling(true).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tunneling_with_both_auth_methods_fails() {
        let result = base()
            .tunneling(true)
            .ssh_host("bastion")
            .ssh_user("deploy")
            .ssh_key("/tmp/key")
            .ssh_passwd("pw")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tunneling_with_no_auth_method_fails() {
        let result = base()
            .tunneling(true)
            .ssh_host("bastion")
            .ssh_user("deploy")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tunneling_with_password_auth() {
        let config = base()
            .tunneling(true)
            .ssh_host("bastion")
            .ssh_user("deploy")
            .ssh_passwd("pw")
            .build()
            .unwrap();
        let tunnel = config.tunnel.expect("tunnel config");
        assert_eq!(tunnel.ssh_port, 22);
        assert!(matches!(tunnel.auth, SshAuth::Password(_)));
    }

    #[test]
    fn test_tunneling_with_key_auth() {
        let config = base()
            .tunneling(true)
            .ssh_host("bastion")
            .ssh_port(2222)
            .ssh_user("deploy")
            .ssh_key("/home/deploy/.ssh/id_ed25519")
            .build()
            .unwrap();
        let tunnel = config.tunnel.expect("tunnel config");
        assert_eq!(tunnel.ssh_port, 2222);
        assert!(matches!(tunnel.auth, SshAuth::KeyFile(_)));
    }

    #[test]
    fn test_ssh_fields_ignored_when_not_tunneling() {
        let config = base().ssh_host("bastion").ssh_passwd("pw").build().unwrap();
        assert!(config.tunnel.is_none());
    }
}
