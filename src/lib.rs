//! relaykit — MySQL convenience client with SSH tunneling and webhook
//! notifications
//!
//! Two independent pieces:
//!
//! * [`MysqlClient`] — validated connection configuration, optional SSH
//!   tunneling, and a small catalog of query helpers (fetch, execute,
//!   batch, bulk insert) over a dictionary-shaped row cursor.
//! * [`WebhookNotifier`] — fire-and-forget webhook messages with a single
//!   bounded retry on rate-limit responses.
//!
//! # Examples
//!
//! ```no_run
//! use relaykit::{DbConfig, MysqlClient};
//!
//! # fn example() -> relaykit::Result<()> {
//! let config = DbConfig::builder()
//!     .host("db.internal")
//!     .user("app")
//!     .passwd("secret")
//!     .database("orders")
//!     .build()?;
//!
//! let mut client = MysqlClient::new(config);
//! client.connect()?;
//! let rows = client.fetch_all("select id, total from orders", &[])?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Tunneled connections route the database session through an SSH
//! intermediary; the database port never needs to be reachable from the
//! caller:
//!
//! ```no_run
//! use relaykit::{DbConfig, MysqlClient};
//!
//! # fn example() -> relaykit::Result<()> {
//! let config = DbConfig::builder()
//!     .host("10.0.0.12")
//!     .user("app")
//!     .passwd("secret")
//!     .database("orders")
//!     .tunneling(true)
//!     .ssh_host("bastion.example.com")
//!     .ssh_user("deploy")
//!     .ssh_key("/home/deploy/.ssh/id_ed25519")
//!     .build()?;
//!
//! let mut client = MysqlClient::new(config);
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod driver;
pub mod error;
pub mod notify;

pub use client::{DbConfig, DbConfigBuilder, MysqlClient};
pub use driver::{Row, Value};
pub use error::{Error, Result};
pub use notify::WebhookNotifier;
