//! Error types for the store facade.

/// Errors a backing-store call can produce.
///
/// Every store call resolves to exactly one terminal outcome: a value,
/// a confirmed absence (`Ok(None)` on the get side), or one of these.
/// Timeout/retry policy lives inside the store client — by the time an
/// error reaches the lobby it is final.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store did not answer within its own deadline.
    #[error("store call timed out: {table}/{key}")]
    Timeout { table: String, key: String },

    /// The store client could not reach the backend.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row did not match the expected shape. Indicates schema
    /// drift or a corrupt row, not a transient fault.
    #[error("corrupt row in {table}/{key}: {source}")]
    Corrupt {
        table: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized for writing.
    #[error("encode for {table} failed: {source}")]
    Encode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}
