//! The store facing side of the sink.
use sluice_core::Value;
use tracing::{debug, warn};

use crate::{SinkConfig, StoreError};

pub(crate) mod memory;
#[cfg(feature = "redis")]
pub(crate) mod redis_store;

/// Handle for writing into one store.
///
/// A client is owned by exactly one sink and closed exactly once by it.
pub trait StoreClient: Send {
    /// Write `value` under `key`, replacing any previous value
    fn put(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Release the connection. Puts after closing fail with [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Creates [`StoreClient`]s.
///
/// The factory is owned by the sink which uses it, so there is no process wide
/// registry of clients.
pub trait ClientFactory: 'static {
    /// Client type created by this factory
    type Client: StoreClient + 'static;

    /// Connect to the store named in `config` through the first reachable
    /// bootstrap URL
    fn connect(&self, config: &SinkConfig) -> Result<Self::Client, StoreError>;
}

/// Why connecting through a single endpoint did not work
pub(crate) enum AttemptError {
    /// URL can not be parsed, try the next one
    Malformed(String),
    /// Endpoint did not answer, try the next one
    Unreachable(String),
    /// Endpoint answered but refused the connection, give up
    Fatal(StoreError),
}

/// Try `connect` on every URL in order and return the first client.
///
/// Fails with [`StoreError::MalformedEndpoint`] if every URL is malformed and
/// with [`StoreError::Unreachable`] otherwise.
pub(crate) fn connect_in_order<C>(
    urls: &[String],
    mut connect: impl FnMut(&str) -> Result<C, AttemptError>,
) -> Result<C, StoreError> {
    let mut all_malformed = true;
    for url in urls {
        match connect(url) {
            Ok(client) => {
                debug!(url = %url, "Connected to store endpoint");
                return Ok(client);
            }
            Err(AttemptError::Malformed(reason)) => {
                warn!(url = %url, reason = %reason, "Skipping malformed endpoint");
            }
            Err(AttemptError::Unreachable(reason)) => {
                all_malformed = false;
                warn!(url = %url, reason = %reason, "Endpoint is unreachable");
            }
            Err(AttemptError::Fatal(e)) => return Err(e),
        }
    }
    match urls.first() {
        Some(first) if all_malformed => Err(StoreError::MalformedEndpoint(first.clone())),
        _ => Err(StoreError::Unreachable(urls.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(u: &[&str]) -> Vec<String> {
        u.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn first_reachable_wins() {
        let mut tried = Vec::new();
        let client = connect_in_order(&urls(&["bad", "down", "up", "also-up"]), |url| {
            tried.push(url.to_string());
            match url {
                "bad" => Err(AttemptError::Malformed("no scheme".into())),
                "down" => Err(AttemptError::Unreachable("refused".into())),
                other => Ok(other.to_string()),
            }
        })
        .unwrap();
        assert_eq!(client, "up");
        assert_eq!(tried, vec!["bad", "down", "up"]);
    }

    #[test]
    fn all_malformed() {
        let err = connect_in_order::<()>(&urls(&["a", "b"]), |_| {
            Err(AttemptError::Malformed("no scheme".into()))
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::MalformedEndpoint(u) if u == "a"));
    }

    #[test]
    fn none_reachable() {
        let err = connect_in_order::<()>(&urls(&["a", "b"]), |url| match url {
            "a" => Err(AttemptError::Malformed("no scheme".into())),
            _ => Err(AttemptError::Unreachable("refused".into())),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(u) if u == urls(&["a", "b"])));
    }

    #[test]
    fn fatal_stops_trying() {
        let mut tried = 0;
        let err = connect_in_order::<()>(&urls(&["a", "b"]), |_| {
            tried += 1;
            Err(AttemptError::Fatal(StoreError::UnknownStore("s".into())))
        })
        .unwrap_err();
        assert_eq!(tried, 1);
        assert!(matches!(err, StoreError::UnknownStore(_)));
    }
}
