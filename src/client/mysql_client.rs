//! MysqlClient implementation

use super::config::DbConfig;
use crate::connection::SshTunnel;
use crate::driver::{
    ConnectParams, DatabaseDriver, DriverConnection, DriverError, DriverResult, MysqlDriver, Row,
    Value,
};
use crate::{Error, Result};

/// MySQL client owning one connection, one cursor, and (optionally) one
/// SSH tunnel
///
/// The query helpers all operate on the connection opened by
/// [`MysqlClient::connect`]; calling any of them before `connect()` or
/// after [`MysqlClient::close`] fails with [`Error::Connection`].
///
/// On any driver failure during a query, the client tears down everything
/// it owns (writes roll back first) and returns [`Error::Query`] carrying
/// the offending statement text. Reconnect with `connect()` to continue.
///
/// One connection per instance; callers needing concurrent queries create
/// independent instances (with independent tunnels).
pub struct MysqlClient {
    config: DbConfig,
    driver: Box<dyn DatabaseDriver>,
    conn: Option<Box<dyn DriverConnection>>,
    tunnel: Option<SshTunnel>,
}

impl MysqlClient {
    /// Create a client from validated configuration, backed by the
    /// `mysql`-crate driver
    pub fn new(config: DbConfig) -> Self {
        Self::with_driver(config, Box::new(MysqlDriver))
    }

    /// Create a client with a custom driver implementation
    pub fn with_driver(config: DbConfig, driver: Box<dyn DatabaseDriver>) -> Self {
        Self {
            config,
            driver,
            conn: None,
            tunnel: None,
        }
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Establish the (possibly tunneled) database connection.
    ///
    /// With tunneling configured, the SSH tunnel is opened first and the
    /// driver connects to its loopback endpoint; otherwise the driver
    /// connects straight to the configured host. Returns the live driver
    /// connection for callers who want to drive the cursor themselves.
    ///
    /// Failures anywhere in the sequence surface as [`Error::Connection`]
    /// wrapping the underlying message. Resources the underlying libraries
    /// allocated before the failure are not cleaned up here beyond their
    /// own failure paths.
    pub fn connect(&mut self) -> Result<&mut dyn DriverConnection> {
        let params = match &self.config.tunnel {
            Some(tunnel_config) => {
                let tunnel = SshTunnel::open(tunnel_config, &self.config.host, self.config.port)?;
                let params = ConnectParams {
                    host: "127.0.0.1".to_string(),
                    port: tunnel.local_port(),
                    user: self.config.user.clone(),
                    passwd: self.config.passwd.clone(),
                    database: self.config.database.clone(),
                    charset: self.config.charset.clone(),
                };
                self.tunnel = Some(tunnel);
                params
            }
            None => ConnectParams {
                host: self.config.host.clone(),
                port: self.config.port,
                user: self.config.user.clone(),
                passwd: self.config.passwd.clone(),
                database: self.config.database.clone(),
                charset: self.config.charset.clone(),
            },
        };

        let conn = self.driver.connect(&params).map_err(|err| {
            Error::Connection(format!(
                "connect to {}:{} failed: {}",
                params.host, params.port, err
            ))
        })?;

        tracing::info!(
            host = %self.config.host,
            database = %self.config.database,
            tunneled = self.tunnel.is_some(),
            "connected"
        );

        Ok(&mut **self.conn.insert(conn))
    }

    /// Tear down cursor, connection, and tunnel, in that order.
    ///
    /// Safe to call repeatedly; already-closed resources are skipped. Each
    /// reference is cleared only after its close succeeds, so a failed
    /// teardown can be retried. A genuine close-time failure surfaces as
    /// [`Error::Connection`].
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.as_mut() {
            conn.close()
                .map_err(|err| Error::Connection(format!("close failed: {}", err)))?;
            self.conn = None;
        }
        if let Some(tunnel) = self.tunnel.as_mut() {
            tunnel.close();
            self.tunnel = None;
        }
        tracing::debug!("closed");
        Ok(())
    }

    /// Execute a read query and return the first row, or `None` if the
    /// result set is empty.
    ///
    /// Pass an empty `params` slice for an unparametrized query.
    pub fn fetch_one(&mut self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        let conn = self.live()?;
        let outcome = conn.execute(query, params).and_then(|_| conn.fetch_one());
        outcome.map_err(|err| self.read_failure(query, err))
    }

    /// Execute a read query and return every matching row.
    pub fn fetch_all(&mut self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.live()?;
        let outcome = conn.execute(query, params).and_then(|_| conn.fetch_all());
        outcome.map_err(|err| self.read_failure(query, err))
    }

    /// Execute a read query and return one driver-default-sized page of
    /// rows.
    pub fn fetch_many(&mut self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.live()?;
        let outcome = conn.execute(query, params).and_then(|_| conn.fetch_many());
        outcome.map_err(|err| self.read_failure(query, err))
    }

    /// Run one write/DDL statement and commit.
    ///
    /// Returns the affected-row count (0 on a no-op).
    pub fn execute(&mut self, query: &str, params: &[Value]) -> Result<u64> {
        let conn = self.live()?;
        let outcome = conn.execute(query, params).and_then(|affected| {
            conn.commit()?;
            Ok(affected)
        });
        outcome.map_err(|err| self.write_failure(query.to_string(), err))
    }

    /// Run a sequence of statements in one transaction, committing once
    /// after the full sequence succeeds.
    ///
    /// If `params_list` is non-empty it must be exactly as long as
    /// `queries`; a mismatch fails with [`Error::Query`] before anything
    /// executes. Returns the last statement's affected-row count. On a
    /// mid-sequence failure the single transaction is rolled back and all
    /// resources are closed.
    pub fn execute_all(&mut self, queries: &[&str], params_list: &[&[Value]]) -> Result<u64> {
        if !params_list.is_empty() && params_list.len() != queries.len() {
            return Err(Error::Query {
                query: format!("{:?}", queries),
                message: format!(
                    "the sequences are not the same size. queries: {}, params: {}",
                    queries.len(),
                    params_list.len()
                ),
            });
        }
        let conn = self.live()?;
        let outcome = (|| -> DriverResult<u64> {
            let mut last = 0;
            for (idx, query) in queries.iter().enumerate() {
                let params = params_list.get(idx).copied().unwrap_or(&[]);
                last = conn.execute(query, params)?;
            }
            conn.commit()?;
            Ok(last)
        })();
        outcome.map_err(|err| self.write_failure(format!("{:?}", queries), err))
    }

    /// Execute one parametrized statement once per row and commit once.
    ///
    /// Returns the driver's total affected-row count.
    pub fn bulk_insert(&mut self, query: &str, rows: &[Vec<Value>]) -> Result<u64> {
        let conn = self.live()?;
        let outcome = conn.execute_batch(query, rows).and_then(|affected| {
            conn.commit()?;
            Ok(affected)
        });
        outcome.map_err(|err| self.write_failure(query.to_string(), err))
    }

    fn live(&mut self) -> Result<&mut dyn DriverConnection> {
        match self.conn.as_deref_mut() {
            Some(conn) => Ok(conn),
            None => Err(Error::Connection("not connected".into())),
        }
    }

    /// Read failure policy: close everything, report the query.
    fn read_failure(&mut self, query: &str, err: DriverError) -> Error {
        tracing::warn!(query, "read failed: {}", err);
        let _ = self.close();
        Error::Query {
            query: query.to_string(),
            message: err.to_string(),
        }
    }

    /// Write failure policy: roll the transaction back, then close
    /// everything, then report the query. Teardown is best-effort.
    fn write_failure(&mut self, query: String, err: DriverError) -> Error {
        tracing::warn!(query = %query, "write failed: {}", err);
        if let Some(conn) = self.conn.as_deref_mut() {
            let _ = conn.rollback();
        }
        let _ = self.close();
        Error::Query {
            query,
            message: err.to_string(),
        }
    }
}
