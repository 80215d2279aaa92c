use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::{IndexMap, IndexSet};
use sluice_core::Value;
use tracing::debug;

use super::{AttemptError, ClientFactory, StoreClient, connect_in_order};
use crate::{SinkConfig, StoreError};

/// URL scheme of in-process store endpoints
pub const MEMORY_SCHEME: &str = "mem://";

#[derive(Debug, Default)]
struct ClusterState {
    stores: IndexMap<String, IndexMap<String, Value>>,
    put_count: usize,
    open_clients: usize,
    fail_next_connects: usize,
    fail_next_puts: usize,
    rejected_keys: IndexSet<String>,
}

/// An in-process key-value store cluster.
///
/// The cluster answers on a single endpoint, `mem://<name>`, and holds any
/// number of named stores. Like a real cluster, stores must exist before a
/// client can connect to them.
///
/// The cluster is a handle to shared state, clones see the same data. This
/// makes it possible to hand one clone to a sink and inspect the stores
/// through another one. For testing failure handling, the next connects or
/// puts can be made to fail.
///
/// ```rust
/// use sluice_core::Value;
/// use sluice_kv::{ClientFactory, MemoryCluster, SinkConfig, StoreClient, DEFAULT_CONNECT_TIMEOUT};
///
/// let cluster = MemoryCluster::new("local");
/// cluster.create_store("users");
///
/// let urls = vec![cluster.endpoint().to_string()];
/// let config = SinkConfig::new(urls, "users", DEFAULT_CONNECT_TIMEOUT);
/// let mut client = cluster.connect(&config).unwrap();
/// client.put("name", &Value::from("ada")).unwrap();
///
/// assert_eq!(cluster.get("users", "name"), Some(Value::from("ada")));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCluster {
    endpoint: String,
    state: Arc<Mutex<ClusterState>>,
}

fn lock(state: &Mutex<ClusterState>) -> MutexGuard<'_, ClusterState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryCluster {
    /// Create an empty cluster reachable at `mem://<name>`
    pub fn new(name: &str) -> Self {
        Self {
            endpoint: format!("{MEMORY_SCHEME}{name}"),
            state: Arc::new(Mutex::new(ClusterState::default())),
        }
    }

    /// URL this cluster is reachable at
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Create an empty store. Existing stores are left untouched.
    pub fn create_store(&self, store: impl Into<String>) {
        lock(&self.state).stores.entry(store.into()).or_default();
    }

    /// Current value of `key` in `store`
    pub fn get(&self, store: &str, key: &str) -> Option<Value> {
        lock(&self.state).stores.get(store)?.get(key).cloned()
    }

    /// Keys of `store` in the order they were first written
    pub fn keys(&self, store: &str) -> Vec<String> {
        lock(&self.state)
            .stores
            .get(store)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of keys in `store`
    pub fn store_len(&self, store: &str) -> usize {
        lock(&self.state).stores.get(store).map_or(0, IndexMap::len)
    }

    /// Total number of successful puts across all stores
    pub fn put_count(&self) -> usize {
        lock(&self.state).put_count
    }

    /// Number of clients which were connected and not closed yet
    pub fn open_clients(&self) -> usize {
        lock(&self.state).open_clients
    }

    /// Make the next `count` connection attempts fail as if the endpoint
    /// was unreachable
    pub fn fail_connects(&self, count: usize) {
        lock(&self.state).fail_next_connects = count;
    }

    /// Make the next `count` puts fail
    pub fn fail_puts(&self, count: usize) {
        lock(&self.state).fail_next_puts = count;
    }

    /// Reject every put of `key` until the cluster is dropped
    pub fn reject_key(&self, key: impl Into<String>) {
        lock(&self.state).rejected_keys.insert(key.into());
    }

    fn try_connect(&self, url: &str, store: &str) -> Result<MemoryClient, AttemptError> {
        if !url.starts_with(MEMORY_SCHEME) {
            return Err(AttemptError::Malformed(format!(
                "expected scheme `{MEMORY_SCHEME}`"
            )));
        }
        if url != self.endpoint {
            return Err(AttemptError::Unreachable(format!(
                "this cluster is at `{}`",
                self.endpoint
            )));
        }
        let mut state = lock(&self.state);
        if state.fail_next_connects > 0 {
            state.fail_next_connects -= 1;
            return Err(AttemptError::Unreachable("injected failure".into()));
        }
        if !state.stores.contains_key(store) {
            return Err(AttemptError::Fatal(StoreError::UnknownStore(store.to_owned())));
        }
        state.open_clients += 1;
        Ok(MemoryClient {
            store: store.to_owned(),
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

impl ClientFactory for MemoryCluster {
    type Client = MemoryClient;

    fn connect(&self, config: &SinkConfig) -> Result<Self::Client, StoreError> {
        connect_in_order(config.bootstrap_urls(), |url| {
            self.try_connect(url, config.store())
        })
    }
}

/// Client writing into one store of a [`MemoryCluster`]
#[derive(Debug)]
pub struct MemoryClient {
    store: String,
    state: Arc<Mutex<ClusterState>>,
    open: bool,
}

impl StoreClient for MemoryClient {
    fn put(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        if !self.open {
            return Err(StoreError::Closed);
        }
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        if state.fail_next_puts > 0 {
            state.fail_next_puts -= 1;
            return Err(StoreError::Rejected {
                key: key.to_owned(),
                reason: "injected failure".into(),
            });
        }
        if state.rejected_keys.contains(key) {
            return Err(StoreError::Rejected {
                key: key.to_owned(),
                reason: "key is rejected".into(),
            });
        }
        let store = state
            .stores
            .get_mut(&self.store)
            .ok_or_else(|| StoreError::UnknownStore(self.store.clone()))?;
        store.insert(key.to_owned(), value.clone());
        state.put_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.open {
            self.open = false;
            lock(&self.state).open_clients -= 1;
            debug!(store = %self.store, "Closed in-memory client");
        }
        Ok(())
    }
}
