use std::time::Duration;

use bon::bon;
use kv_sink_builder::SetAtLeastOneUrl;
use sluice_core::{Acker, Record, Sink, TaskContext};
use tracing::{debug, info, trace, warn};

use crate::{
    ClientFactory, ConfigError, DEFAULT_CONNECT_TIMEOUT, InitError, ProcessError, SinkConfig,
    StoreClient,
};

/// Writes every field of every record into a key-value store.
///
/// For each record, the name of every field is used as key and its value is
/// written under that key, in the order the fields were declared. Existing
/// values are overwritten. Once all fields are written, the record is
/// acknowledged. Writing stops at the first failing field; fields written up
/// to that point stay in the store and the record is not acknowledged.
///
/// The store client is created in [`Sink::initialize`] and closed in
/// [`Sink::shutdown`]. The sink emits nothing downstream.
///
/// ```rust
/// use sluice_core::{LocalTask, Record, TaskContext, Value};
/// use sluice_kv::{KvSink, MemoryCluster};
///
/// let cluster = MemoryCluster::new("local");
/// cluster.create_store("scores");
///
/// let sink = KvSink::builder()
///     .factory(cluster.clone())
///     .bootstrap_url(cluster.endpoint())
///     .store("scores")
///     .build();
///
/// let report = LocalTask::new(sink, TaskContext::builder().component("kv").build())
///     .run([Record::new(0).with_field("user_id", "u42").with_field("score", 99)])
///     .unwrap();
///
/// assert_eq!(report.acked, 1);
/// assert_eq!(cluster.get("scores", "user_id"), Some(Value::from("u42")));
/// assert_eq!(cluster.get("scores", "score"), Some(Value::from(99)));
/// ```
pub struct KvSink<F: ClientFactory> {
    factory: F,
    config: SinkConfig,
    state: SinkState<F::Client>,
}

enum SinkState<C> {
    Uninitialized,
    Ready { client: C, acker: Box<dyn Acker> },
    Closed,
}

/// Lifecycle stage of a [`KvSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, no client yet
    Uninitialized,
    /// Client connected, records can be processed
    Ready,
    /// Shut down, the client (if any) was released
    Closed,
}

#[bon]
impl<F: ClientFactory> KvSink<F> {
    #[builder]
    #[builder(on(String, into))]
    pub fn new(
        #[builder(field)] bootstrap_urls: Vec<String>,
        /// this is a workaround to check if at least one URL was provided
        #[builder(overwritable, setters(vis = "", name = "at_least_one_url"))]
        _at_least_one_url: (),
        /// Creates the store client on initialization
        factory: F,
        /// Name of the store to write into
        store: String,
        /// Timeout for connecting to a single endpoint
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
        connect_timeout: Duration,
    ) -> Self {
        Self::from_config(factory, SinkConfig::new(bootstrap_urls, store, connect_timeout))
    }
}

impl<F: ClientFactory> KvSink<F> {
    /// Create a sink from an existing config
    pub fn from_config(factory: F, config: SinkConfig) -> Self {
        Self {
            factory,
            config,
            state: SinkState::Uninitialized,
        }
    }

    /// Create a sink configured from the `SLUICE_KV_*` environment variables
    pub fn from_env(factory: F) -> Result<Self, ConfigError> {
        Ok(Self::from_config(factory, SinkConfig::from_env()?))
    }

    /// Connection settings of this sink
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Current lifecycle stage
    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            SinkState::Uninitialized => Lifecycle::Uninitialized,
            SinkState::Ready { .. } => Lifecycle::Ready,
            SinkState::Closed => Lifecycle::Closed,
        }
    }
}

impl<F: ClientFactory, S: kv_sink_builder::State> KvSinkBuilder<F, S> {
    /// Add a bootstrap URL. URLs are tried in the order they were added.
    pub fn bootstrap_url(
        mut self,
        url: impl Into<String>,
    ) -> KvSinkBuilder<F, SetAtLeastOneUrl<S>> {
        self.bootstrap_urls.push(url.into());
        self.at_least_one_url(())
    }
}

impl<F: ClientFactory> Sink for KvSink<F> {
    type InitError = InitError;
    type ProcessError = ProcessError;

    fn initialize(
        &mut self,
        context: &TaskContext,
        acker: Box<dyn Acker>,
    ) -> Result<(), InitError> {
        match self.state {
            SinkState::Uninitialized => (),
            SinkState::Ready { .. } => return Err(InitError::AlreadyInitialized),
            SinkState::Closed => return Err(InitError::Closed),
        }
        self.config.validate()?;
        debug!(
            urls = ?self.config.bootstrap_urls(),
            store = %self.config.store(),
            "Connecting to key-value store"
        );
        let client = self
            .factory
            .connect(&self.config)
            .map_err(|source| InitError::Connect {
                store: self.config.store().to_owned(),
                source,
            })?;
        info!(
            component = %context.component(),
            task_index = context.task_index(),
            store = %self.config.store(),
            "Key-value sink ready"
        );
        self.state = SinkState::Ready { client, acker };
        Ok(())
    }

    fn process(&mut self, record: &Record) -> Result<(), ProcessError> {
        let SinkState::Ready { client, acker } = &mut self.state else {
            return Err(ProcessError::NotReady(record.id()));
        };
        let total = record.len();
        for (written, (field, value)) in record.fields().enumerate() {
            client
                .put(field, value)
                .map_err(|source| ProcessError::Write {
                    record: record.id(),
                    field: field.to_owned(),
                    written,
                    total,
                    source,
                })?;
        }
        acker.ack(record.id());
        trace!(record = %record.id(), fields = total, "Record written");
        Ok(())
    }

    fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, SinkState::Closed) {
            SinkState::Ready { mut client, .. } => match client.close() {
                Ok(()) => info!(store = %self.config.store(), "Store client closed"),
                Err(e) => warn!(
                    store = %self.config.store(),
                    error = %e,
                    "Failed to close store client"
                ),
            },
            SinkState::Uninitialized => debug!("Sink shut down before it was initialized"),
            SinkState::Closed => (),
        }
    }
}

/// Doctests to assert some bad builders do not compile
/// see: https://stackoverflow.com/a/55327334
/// this should not compile because the bootstrap URL is missing
/// ```compile_fail
/// use sluice_kv::{KvSink, MemoryCluster};
/// KvSink::builder()
/// .factory(MemoryCluster::new("c"))
/// .store("scores")
/// .build();
/// ```
/// missing store
/// ```compile_fail
/// use sluice_kv::{KvSink, MemoryCluster};
/// KvSink::builder()
/// .factory(MemoryCluster::new("c"))
/// .bootstrap_url("mem://c")
/// .build();
/// ```
/// missing factory
/// ```compile_fail
/// use sluice_kv::KvSink;
/// KvSink::builder()
/// .bootstrap_url("mem://c")
/// .store("scores")
/// .build();
/// ```
struct _CompileTests;
