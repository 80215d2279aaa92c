use std::fmt::Debug;

use redis::Commands;
use sluice_core::Value;
use tracing::debug;

use super::{AttemptError, ClientFactory, StoreClient, connect_in_order};
use crate::{SinkConfig, StoreError, codec};

/// Connects to Redis servers.
///
/// Every store is a Redis hash named like the store. Each field of a record
/// becomes a hash field holding the MessagePack encoded value, see
/// [`crate::encode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisFactory;

impl ClientFactory for RedisFactory {
    type Client = RedisClient;

    fn connect(&self, config: &SinkConfig) -> Result<Self::Client, StoreError> {
        let timeout = config.connect_timeout();
        let conn = connect_in_order(config.bootstrap_urls(), |url| {
            let client =
                redis::Client::open(url).map_err(|e| AttemptError::Malformed(e.to_string()))?;
            let mut conn = client
                .get_connection_with_timeout(timeout)
                .map_err(|e| AttemptError::Unreachable(e.to_string()))?;
            // a server which accepts connections but refuses commands is
            // not usable either, e.g. when authentication is required
            redis::cmd("PING")
                .query::<String>(&mut conn)
                .map_err(|e| AttemptError::Unreachable(e.to_string()))?;
            Ok(conn)
        })?;
        Ok(RedisClient {
            hash: config.store().to_owned(),
            conn: Some(conn),
        })
    }
}

/// Client writing into one Redis hash
pub struct RedisClient {
    hash: String,
    conn: Option<redis::Connection>,
}

impl Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("hash", &self.hash)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl StoreClient for RedisClient {
    fn put(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let conn = self.conn.as_mut().ok_or(StoreError::Closed)?;
        let bytes = codec::encode(value)?;
        let _: () = conn.hset(&self.hash, key, bytes)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // dropping the connection closes the socket
        if self.conn.take().is_some() {
            debug!(hash = %self.hash, "Closed Redis connection");
        }
        Ok(())
    }
}
