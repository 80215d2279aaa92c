use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use crate::RecordId;

/// Output channel back to the pipeline.
///
/// Sinks acknowledge every record they have fully processed. Failing a record
/// is normally left to the host, which decides whether it gets redelivered.
pub trait Acker: Send {
    /// Signal that the record was fully processed
    fn ack(&mut self, id: RecordId);

    /// Signal that processing the record failed
    fn fail(&mut self, id: RecordId);
}

/// A single acknowledgment signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckEvent {
    /// Record was processed
    Ack(RecordId),
    /// Record failed
    Fail(RecordId),
}

/// An [`Acker`] which remembers every signal it was given, in order.
///
/// This uses an `Arc<Mutex<Vec<AckEvent>>>` internally, so it can be freely
/// cloned: hand one clone to a sink and inspect the signals through another.
#[derive(Debug, Clone, Default)]
pub struct AckLog {
    inner: Arc<Mutex<Vec<AckEvent>>>,
}

impl AckLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AckEvent>> {
        // a panic while holding the lock can not leave a Vec half-pushed
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All signals in the order they were given
    pub fn events(&self) -> Vec<AckEvent> {
        self.lock().clone()
    }

    /// Ids of all acknowledged records
    pub fn acked(&self) -> Vec<RecordId> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                AckEvent::Ack(id) => Some(*id),
                AckEvent::Fail(_) => None,
            })
            .collect()
    }

    /// Ids of all failed records
    pub fn failed(&self) -> Vec<RecordId> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                AckEvent::Fail(id) => Some(*id),
                AckEvent::Ack(_) => None,
            })
            .collect()
    }

    /// How often the given record was acknowledged
    pub fn ack_count(&self, id: RecordId) -> usize {
        self.lock()
            .iter()
            .filter(|e| **e == AckEvent::Ack(id))
            .count()
    }

    /// Number of signals received
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no signal was received yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Acker for AckLog {
    fn ack(&mut self, id: RecordId) {
        self.lock().push(AckEvent::Ack(id));
    }

    fn fail(&mut self, id: RecordId) {
        self.lock().push(AckEvent::Fail(id));
    }
}

/// An [`Acker`] which only counts signals.
///
/// Memory use does not grow with the number of records, which makes it the
/// acker of choice for long running hosts. Clones share the counts.
#[derive(Debug, Clone, Default)]
pub struct AckCounter {
    inner: Arc<AckCounts>,
}

#[derive(Debug, Default)]
struct AckCounts {
    acked: AtomicUsize,
    failed: AtomicUsize,
}

impl AckCounter {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of acknowledgments received
    pub fn acked(&self) -> usize {
        self.inner.acked.load(Ordering::Relaxed)
    }

    /// Number of failures received
    pub fn failed(&self) -> usize {
        self.inner.failed.load(Ordering::Relaxed)
    }
}

impl Acker for AckCounter {
    fn ack(&mut self, _id: RecordId) {
        self.inner.acked.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&mut self, _id: RecordId) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_log() {
        let log = AckLog::new();
        let mut handle = log.clone();

        handle.ack(RecordId(1));
        handle.fail(RecordId(2));
        handle.ack(RecordId(1));

        assert_eq!(
            log.events(),
            vec![
                AckEvent::Ack(RecordId(1)),
                AckEvent::Fail(RecordId(2)),
                AckEvent::Ack(RecordId(1))
            ]
        );
        assert_eq!(log.acked(), vec![RecordId(1), RecordId(1)]);
        assert_eq!(log.failed(), vec![RecordId(2)]);
        assert_eq!(log.ack_count(RecordId(1)), 2);
        assert_eq!(log.ack_count(RecordId(2)), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn boxed_acker() {
        let log = AckLog::new();
        let mut boxed: Box<dyn Acker> = Box::new(log.clone());
        assert!(log.is_empty());
        boxed.ack(RecordId(9));
        assert_eq!(log.acked(), vec![RecordId(9)]);
    }

    #[test]
    fn counter_counts_without_keeping_events() {
        let counter = AckCounter::new();
        let mut handle = counter.clone();

        for i in 0..1000 {
            handle.ack(RecordId(i));
        }
        handle.fail(RecordId(1000));

        assert_eq!(counter.acked(), 1000);
        assert_eq!(counter.failed(), 1);
    }
}
