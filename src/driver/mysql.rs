//! `mysql`-crate driver implementation
//!
//! Opens the session with autocommit disabled so the client's
//! commit/rollback calls delimit a real transaction, and applies the
//! configured character set via `SET NAMES`.

use super::{ConnectParams, DatabaseDriver, DriverConnection, DriverResult, Row, Value};
use mysql::prelude::{Protocol, Queryable};
use mysql::{Conn, OptsBuilder, Params, QueryResult};
use std::collections::{HashMap, VecDeque};

/// Rows handed out per `fetch_many` call
const DEFAULT_PAGE_SIZE: usize = 100;

/// Production driver backed by the `mysql` crate
#[derive(Debug, Default)]
pub struct MysqlDriver;

impl DatabaseDriver for MysqlDriver {
    fn connect(&self, params: &ConnectParams) -> DriverResult<Box<dyn DriverConnection>> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(params.host.clone()))
            .tcp_port(params.port)
            .user(Some(params.user.clone()))
            .pass(Some(params.passwd.clone()))
            .db_name(Some(params.database.clone()))
            .init(vec![
                format!("SET NAMES {}", params.charset),
                "SET autocommit=0".to_string(),
            ]);
        let conn = Conn::new(opts)?;
        Ok(Box::new(MysqlConnection {
            conn,
            buffer: VecDeque::new(),
        }))
    }
}

/// One live connection plus the buffered result set of the most recent
/// statement (the cursor state)
struct MysqlConnection {
    conn: Conn,
    buffer: VecDeque<Row>,
}

impl DriverConnection for MysqlConnection {
    fn execute(&mut self, query: &str, params: &[Value]) -> DriverResult<u64> {
        let (affected, rows) = if params.is_empty() {
            drain(self.conn.query_iter(query)?)?
        } else {
            drain(self.conn.exec_iter(query, to_params(params))?)?
        };
        self.buffer = rows;
        Ok(affected)
    }

    fn execute_batch(&mut self, query: &str, rows: &[Vec<Value>]) -> DriverResult<u64> {
        self.buffer.clear();
        let stmt = self.conn.prep(query)?;
        let mut total = 0;
        for row in rows {
            total += self.conn.exec_iter(&stmt, to_params(row))?.affected_rows();
        }
        Ok(total)
    }

    fn fetch_one(&mut self) -> DriverResult<Option<Row>> {
        Ok(self.buffer.pop_front())
    }

    fn fetch_all(&mut self) -> DriverResult<Vec<Row>> {
        Ok(self.buffer.drain(..).collect())
    }

    fn fetch_many(&mut self) -> DriverResult<Vec<Row>> {
        let n = self.buffer.len().min(DEFAULT_PAGE_SIZE);
        Ok(self.buffer.drain(..n).collect())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.conn.query_drop("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.conn.query_drop("ROLLBACK")?;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        // mysql::Conn sends COM_QUIT on drop; nothing further to do here.
        self.buffer.clear();
        Ok(())
    }
}

/// Consume a result set, returning the affected-row count and the buffered
/// rows
fn drain<T: Protocol>(result: QueryResult<'_, '_, '_, T>) -> DriverResult<(u64, VecDeque<Row>)> {
    let affected = result.affected_rows();
    let mut rows = VecDeque::new();
    for row in result {
        rows.push_back(convert_row(row?));
    }
    Ok((affected, rows))
}

fn convert_row(row: mysql::Row) -> Row {
    let columns = row.columns();
    let values = row.unwrap();
    let mut map = HashMap::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(values) {
        map.insert(column.name_str().to_string(), from_mysql_value(value));
    }
    map
}

fn from_mysql_value(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(i) => Value::Int(i),
        mysql::Value::UInt(u) => Value::UInt(u),
        mysql::Value::Float(f) => Value::Double(f as f64),
        mysql::Value::Double(d) => Value::Double(d),
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        // Temporal values come back as their SQL literal text
        other => Value::Text(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Int(i) => mysql::Value::Int(*i),
        Value::UInt(u) => mysql::Value::UInt(*u),
        Value::Double(d) => mysql::Value::Double(*d),
        Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => mysql::Value::Bytes(b.clone()),
    }
}

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_mysql_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_roundtrip() {
        let values = vec![
            Value::Null,
            Value::Int(-3),
            Value::UInt(9),
            Value::Double(2.5),
            Value::Text("hello".into()),
        ];
        for value in values {
            assert_eq!(from_mysql_value(to_mysql_value(&value)), value);
        }
    }

    #[test]
    fn test_bytes_decode_to_text_when_utf8() {
        let decoded = from_mysql_value(mysql::Value::Bytes(b"abc".to_vec()));
        assert_eq!(decoded, Value::Text("abc".into()));
    }

    #[test]
    fn test_invalid_utf8_stays_bytes() {
        let decoded = from_mysql_value(mysql::Value::Bytes(vec![0xff, 0xfe]));
        assert_eq!(decoded, Value::Bytes(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_empty_params_map_to_empty() {
        assert!(matches!(to_params(&[]), Params::Empty));
    }

    #[test]
    fn test_positional_params() {
        let params = to_params(&[Value::Int(1), Value::Text("x".into())]);
        match params {
            Params::Positional(values) => assert_eq!(values.len(), 2),
            other => panic!("expected positional params, got {:?}", other),
        }
    }
}
