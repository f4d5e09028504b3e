//! `db` crate — the warehouse connector.
//!
//! Owns credentials, the driver abstraction, session lifecycle and statement
//! execution. Rows come back as ordered [`Row`] values; nothing here knows
//! about export profiles or output formats.

pub mod config;
pub mod driver;
pub mod error;
pub mod manager;
pub mod mock;
pub mod sqlx_driver;
pub mod value;

pub use config::{ConnectionConfig, ConnectionString};
pub use driver::{Connection, DatabaseDriver};
pub use error::DbError;
pub use manager::{ConnectionManager, ScopedWork};
pub use sqlx_driver::SqlxDriver;
pub use value::{ResultSet, Row, ScalarValue};
