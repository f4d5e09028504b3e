//! Connection credentials and the driver connection string.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Placeholder written in place of the password on every diagnostic surface.
pub const REDACTED: &str = "***";

/// Discrete credential fields for one database.
///
/// Immutable once built; the password is only reachable through
/// [`ConnectionConfig::password`] which hands out a [`SecretString`].
pub struct ConnectionConfig {
    driver: String,
    host: String,
    database: String,
    username: String,
    password: SecretString,
    port: Option<u16>,
}

impl ConnectionConfig {
    pub fn new(
        driver: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            host: host.into(),
            database: database.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            port: None,
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Assemble `DRIVER={..};SERVER=..[;PORT=..];DATABASE=..;UID=..;PWD=..`.
    pub fn connection_string(&self) -> ConnectionString {
        let mut head = format!("DRIVER={{{}}};SERVER={}", self.driver, self.host);
        if let Some(port) = self.port {
            head.push_str(&format!(";PORT={port}"));
        }
        head.push_str(&format!(";DATABASE={};UID={}", self.database, self.username));

        ConnectionString {
            head,
            password: SecretString::from(self.password.expose_secret().to_owned()),
        }
    }

    /// `driver://host[:port]/database` without credentials, for log fields.
    pub fn target(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}/{}", self.driver, self.host, port, self.database),
            None => format!("{}://{}/{}", self.driver, self.host, self.database),
        }
    }
}

impl Clone for ConnectionConfig {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            host: self.host.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
            port: self.port,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("port", &self.port)
            .finish()
    }
}

/// A driver connection string whose `Display` and `Debug` forms are redacted.
pub struct ConnectionString {
    head: String,
    password: SecretString,
}

impl ConnectionString {
    /// The full string including the password, for handing to a driver.
    pub fn expose_secret(&self) -> String {
        format!("{};PWD={}", self.head, self.password.expose_secret())
    }

    pub fn redacted(&self) -> String {
        format!("{};PWD={REDACTED}", self.head)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString").field(&self.redacted()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: Option<u16>) -> ConnectionConfig {
        ConnectionConfig::new("MariaDB ODBC 3.1 Driver", "warehouse.local", "sales", "etl", "s3cr3t!pw")
            .with_port(port)
    }

    #[test]
    fn assembles_segments_in_fixed_order() {
        let cs = config(Some(3306)).connection_string();
        assert_eq!(
            cs.expose_secret(),
            "DRIVER={MariaDB ODBC 3.1 Driver};SERVER=warehouse.local;PORT=3306;DATABASE=sales;UID=etl;PWD=s3cr3t!pw"
        );
    }

    #[test]
    fn port_segment_is_omitted_when_absent() {
        let cs = config(None).connection_string();
        assert!(!cs.redacted().contains("PORT="));
        assert!(cs.redacted().starts_with("DRIVER={MariaDB ODBC 3.1 Driver};SERVER=warehouse.local;DATABASE="));
    }

    #[test]
    fn diagnostic_forms_never_contain_the_password() {
        let cfg = config(Some(3306));
        let cs = cfg.connection_string();

        for rendered in [cs.to_string(), format!("{cs:?}"), format!("{cfg:?}"), cfg.target()] {
            assert!(!rendered.contains("s3cr3t!pw"), "leaked in {rendered}");
        }
        assert!(cs.to_string().ends_with("PWD=***"));
    }

    #[test]
    fn clone_keeps_the_secret() {
        let cfg = config(None);
        let copy = cfg.clone();
        assert_eq!(copy.password().expose_secret(), "s3cr3t!pw");
        assert_eq!(copy.target(), "MariaDB ODBC 3.1 Driver://warehouse.local/sales");
    }
}
