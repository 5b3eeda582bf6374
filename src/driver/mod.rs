//! Database driver abstraction
//!
//! The client delegates all SQL execution to a driver behind these traits.
//! The production implementation wraps the `mysql` crate; tests substitute
//! a scripted driver through [`crate::MysqlClient::with_driver`].

pub mod mysql;

use std::collections::HashMap;

pub use self::mysql::MysqlDriver;

/// Opaque error from the underlying driver.
///
/// The client never interprets these; it folds the message into its own
/// error taxonomy at the boundary.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// One result row, keyed by column name
pub type Row = HashMap<String, Value>;

/// An owned SQL scalar value
///
/// Used both for statement parameters and for values read back out of
/// result rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Double-precision float
    Double(f64),
    /// Text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Endpoint and credentials handed to [`DatabaseDriver::connect`]
///
/// When tunneling is active the client rewrites `host`/`port` to the
/// tunnel's local loopback endpoint before calling the driver.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Hostname or IP of the database server
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Username
    pub user: String,
    /// Password
    pub passwd: String,
    /// Database (schema) name
    pub database: String,
    /// Connection character set
    pub charset: String,
}

/// Factory for driver connections
pub trait DatabaseDriver: Send {
    /// Open a connection to the given endpoint.
    fn connect(&self, params: &ConnectParams) -> DriverResult<Box<dyn DriverConnection>>;
}

/// A live driver connection with one dictionary-shaped cursor
///
/// The cursor state (the buffered result set of the most recent statement)
/// lives inside the connection, so the fetch methods page over whatever the
/// last `execute` produced. Implementations are expected to run with
/// autocommit disabled: `commit`/`rollback` delimit the real transaction.
pub trait DriverConnection: Send {
    /// Execute one statement, buffering any result set.
    ///
    /// Returns the affected-row count for writes; the count is meaningless
    /// for reads (use the fetch methods).
    fn execute(&mut self, query: &str, params: &[Value]) -> DriverResult<u64>;

    /// Execute the same parametrized statement once per row in `rows`.
    fn execute_batch(&mut self, query: &str, rows: &[Vec<Value>]) -> DriverResult<u64>;

    /// Take the next buffered row, if any.
    fn fetch_one(&mut self) -> DriverResult<Option<Row>>;

    /// Take all remaining buffered rows.
    fn fetch_all(&mut self) -> DriverResult<Vec<Row>>;

    /// Take the next driver-default-sized page of buffered rows.
    fn fetch_many(&mut self) -> DriverResult<Vec<Row>>;

    /// Commit the open transaction.
    fn commit(&mut self) -> DriverResult<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> DriverResult<()>;

    /// Close the connection.
    fn close(&mut self) -> DriverResult<()>;
}
