//! Environment configuration.
//!
//! Values come from the process environment after an optional `.env` file
//! has been loaded. Database settings are validated lazily so commands that
//! never touch the warehouse (listing profiles, serving health checks) still
//! start without credentials.

use std::collections::HashMap;
use std::path::PathBuf;

use db::ConnectionConfig;

use crate::EngineError;

/// Driver used when `DB_DRIVER` is unset.
pub const DEFAULT_DRIVER: &str = "mysql";

/// Default directory for rolling log files.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default API listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Suffix of per-service webhook variables, e.g. `BIRDEYE_ENDPOINT`.
pub const ENDPOINT_SUFFIX: &str = "_ENDPOINT";

/// Raw warehouse settings as read from the environment.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSettings {
    pub driver: String,
    pub server: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: String,
}

/// Everything the binary reads from its environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    /// Lower-cased service name → webhook URL.
    pub endpoints: HashMap<String, String>,
    pub log: LogSettings,
    pub port: u16,
    pub profiles_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Result<Self, EngineError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).cloned();

        let endpoints = vars
            .iter()
            .filter_map(|(k, v)| {
                let service = k.strip_suffix(ENDPOINT_SUFFIX)?;
                (!service.is_empty()).then(|| (service.to_ascii_lowercase(), v.clone()))
            })
            .collect();

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| EngineError::Configuration(format!("PORT must be a port number, got '{raw}'")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            database: DatabaseSettings {
                driver: get("DB_DRIVER").unwrap_or_else(|| DEFAULT_DRIVER.to_owned()),
                server: get("DB_SERVER"),
                database: get("DB_DATABASE"),
                username: get("DB_USERNAME"),
                password: get("DB_PASSWORD"),
                port: get("DB_PORT"),
            },
            endpoints,
            log: LogSettings {
                dir: get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_owned()).into(),
                level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
            },
            port,
            profiles_path: get("EXPORT_PROFILES").map(PathBuf::from),
        })
    }

    /// Webhook URL configured for `service`, if any.
    pub fn webhook_url(&self, service: &str) -> Option<&str> {
        self.endpoints.get(&service.to_ascii_lowercase()).map(String::as_str)
    }

    /// Validate the warehouse settings and build the connection config.
    ///
    /// SQLite only needs `DB_DATABASE`; every other driver also needs
    /// server, username and password.
    pub fn connection_config(&self) -> Result<ConnectionConfig, EngineError> {
        let db = &self.database;
        let missing = |key: &str| {
            EngineError::Configuration(format!(
                "{key} is not set. Please add it to your .env file or environment"
            ))
        };

        let database = db.database.clone().ok_or_else(|| missing("DB_DATABASE"))?;
        let needs_server = !db.driver.to_ascii_lowercase().contains("sqlite");
        let require = |value: &Option<String>, key: &str| match value {
            Some(v) => Ok(v.clone()),
            None if needs_server => Err(missing(key)),
            None => Ok(String::new()),
        };

        let server = require(&db.server, "DB_SERVER")?;
        let username = require(&db.username, "DB_USERNAME")?;
        let password = require(&db.password, "DB_PASSWORD")?;

        let port = db
            .port
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| EngineError::Configuration(format!("DB_PORT must be a port number, got '{raw}'")))
            })
            .transpose()?;

        Ok(ConnectionConfig::new(&db.driver, server, database, username, password).with_port(port))
    }
}
