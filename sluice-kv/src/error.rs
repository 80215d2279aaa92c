use sluice_core::RecordId;
use thiserror::Error;

use crate::ConfigError;

/// Errors raised by store clients and factories
#[derive(Debug, Error)]
pub enum StoreError {
    /// No bootstrap URL could be parsed; holds the first one
    #[error("Malformed endpoint `{0}`")]
    MalformedEndpoint(String),
    /// Every endpoint was tried and none answered
    #[error("None of the endpoints {0:?} is reachable")]
    Unreachable(Vec<String>),
    /// The endpoint answered but does not hold the named store
    #[error("Store `{0}` does not exist")]
    UnknownStore(String),
    /// The store refused a write
    #[error("Write of key `{key}` was rejected: {reason}")]
    Rejected {
        /// Key which was written
        key: String,
        /// Reason given by the store
        reason: String,
    },
    /// A value could not be turned into bytes
    #[error("Failed to encode value")]
    Encode(#[from] rmp_serde::encode::Error),
    /// Stored bytes are not a valid value
    #[error("Failed to decode value")]
    Decode(#[from] rmp_serde::decode::Error),
    /// The client was used after closing it
    #[error("Store client is closed")]
    Closed,
    /// Redis returned an error or the connection broke
    #[cfg(feature = "redis")]
    #[error("Redis command failed")]
    Redis(#[from] redis::RedisError),
}

/// Fatal errors while initializing a [`crate::KvSink`]. None of these are
/// retried; the task running the sink is expected to fail.
#[derive(Debug, Error)]
pub enum InitError {
    /// The configuration is unusable
    #[error("Invalid sink configuration")]
    Config(#[from] ConfigError),
    /// No client could be created
    #[error("Failed to create store client for store `{store}`")]
    Connect {
        /// Store the sink was configured with
        store: String,
        /// Why connecting failed
        #[source]
        source: StoreError,
    },
    /// `initialize` was called on a ready sink
    #[error("Sink is already initialized")]
    AlreadyInitialized,
    /// `initialize` was called after `shutdown`
    #[error("Sink was shut down and can not be initialized again")]
    Closed,
}

/// Errors while writing a single record
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A record arrived before initialization or after shutdown
    #[error("Received record {0} while the sink is not ready")]
    NotReady(RecordId),
    /// The record is not acknowledged. The first `written` fields remain in
    /// the store.
    #[error(
        "Failed to write field `{field}` of record {record} ({written} of {total} fields written)"
    )]
    Write {
        /// Record which was being written
        record: RecordId,
        /// Field whose write failed
        field: String,
        /// Fields written before the failure
        written: usize,
        /// Fields in the record
        total: usize,
        /// Error returned by the store client
        #[source]
        source: StoreError,
    },
}
