//! Key-value store sink for Sluice pipelines.
//!
//! [`KvSink`] writes every field of every record it receives into a key-value
//! store as a separate `field name -> value` pair and acknowledges the record
//! once all fields are written. Stores are reached through a [`ClientFactory`];
//! this crate ships an in-process [`MemoryCluster`] and, with the `redis`
//! feature, a Redis backed [`RedisFactory`].
mod codec;
mod config;
mod error;
mod sink;
mod store;

pub use codec::{decode, encode};
pub use config::{BootstrapUrls, ConfigError, DEFAULT_CONNECT_TIMEOUT, SinkConfig};
pub use error::{InitError, ProcessError, StoreError};
pub use sink::{KvSink, Lifecycle};
pub use store::memory::{MEMORY_SCHEME, MemoryClient, MemoryCluster};
#[cfg(feature = "redis")]
pub use store::redis_store::{RedisClient, RedisFactory};
pub use store::{ClientFactory, StoreClient};
