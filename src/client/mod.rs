//! Database client
//!
//! This module handles:
//! * Configuration validation ([`DbConfig`])
//! * Connection/tunnel lifecycle ([`MysqlClient::connect`] / [`MysqlClient::close`])
//! * Query execution helpers over the active cursor

mod config;
mod mysql_client;

pub use config::{DbConfig, DbConfigBuilder, SshAuth, TunnelConfig};
pub use mysql_client::MysqlClient;
