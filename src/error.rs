//! Error types

/// Result type for relaykit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the client and notifier
///
/// Every failure crossing a collaborator boundary (driver, SSH library,
/// HTTP client) is rewrapped into one of these variants with the original
/// error's message folded into the new message. Database operations are
/// never retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete construction input.
    ///
    /// Raised synchronously at configuration build time, never at connect
    /// time.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure establishing or tearing down the tunnel, connection, or
    /// cursor.
    #[error("connection error: {0}")]
    Connection(String),

    /// Failure of a read or write operation. Carries the offending query
    /// text (for batch operations, the full batch).
    #[error("query error: query: {query}, message: {message}")]
    Query {
        /// The statement(s) that failed
        query: String,
        /// The underlying driver's error message
        message: String,
    },

    /// Non-200 response or transport failure from the webhook endpoint.
    #[error("notification error: {0}")]
    Notification(String),
}
