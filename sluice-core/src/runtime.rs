use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{AckCounter, Acker, OutputDeclarer, Record, RecordId, Sink, TaskContext};

/// Runs a single sink on the current thread.
///
/// This is the smallest possible host: it initializes the sink, feeds it every
/// record of an iterator and shuts it down afterwards. A record the sink fails
/// to process is failed towards the pipeline and processing continues with
/// the next one. An initialization error fails the whole task.
///
/// ```rust
/// use sluice_core::{Acker, LocalTask, Record, Sink, TaskContext};
///
/// struct Count(usize, Option<Box<dyn Acker>>);
///
/// impl Sink for Count {
///     type InitError = std::convert::Infallible;
///     type ProcessError = std::convert::Infallible;
///
///     fn initialize(
///         &mut self,
///         _: &TaskContext,
///         acker: Box<dyn Acker>,
///     ) -> Result<(), Self::InitError> {
///         self.1 = Some(acker);
///         Ok(())
///     }
///
///     fn process(&mut self, record: &Record) -> Result<(), Self::ProcessError> {
///         self.0 += record.len();
///         if let Some(acker) = self.1.as_mut() {
///             acker.ack(record.id());
///         }
///         Ok(())
///     }
///
///     fn shutdown(&mut self) {}
/// }
///
/// let task = LocalTask::new(Count(0, None), TaskContext::builder().component("count").build());
/// let report = task
///     .run([Record::new(0).with_field("a", 1), Record::new(1).with_field("b", 2)])
///     .unwrap();
/// assert_eq!(report.acked, 2);
/// ```
pub struct LocalTask<S> {
    sink: S,
    context: TaskContext,
    downstream: Option<Box<dyn Acker>>,
}

/// Outcome of a completed task run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    /// Records handed to the sink
    pub processed: usize,
    /// Records the sink acknowledged
    pub acked: usize,
    /// Records which failed
    pub failed: usize,
}

/// Errors which abort a task
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The sink could not be initialized
    #[error("Sink failed to initialize")]
    Init(#[source] E),
}

/// Acker handed to the sink: counts every signal and forwards it to the
/// pipeline's acker, if there is one
#[derive(Clone)]
struct TaskAcker {
    counts: AckCounter,
    downstream: Option<Arc<Mutex<Box<dyn Acker>>>>,
}

impl TaskAcker {
    fn forward(&self, signal: impl FnOnce(&mut dyn Acker)) {
        if let Some(downstream) = &self.downstream {
            let mut guard = downstream.lock().unwrap_or_else(PoisonError::into_inner);
            signal(&mut **guard);
        }
    }
}

impl Acker for TaskAcker {
    fn ack(&mut self, id: RecordId) {
        self.counts.ack(id);
        self.forward(|a| a.ack(id));
    }

    fn fail(&mut self, id: RecordId) {
        self.counts.fail(id);
        self.forward(|a| a.fail(id));
    }
}

impl<S: Sink> LocalTask<S> {
    /// Create a task for the given sink
    pub fn new(sink: S, context: TaskContext) -> Self {
        Self {
            sink,
            context,
            downstream: None,
        }
    }

    /// Forward every acknowledgment and failure to `acker`
    pub fn with_acker(mut self, acker: impl Acker + 'static) -> Self {
        self.downstream = Some(Box::new(acker));
        self
    }

    /// Run the sink over all records, then shut it down.
    ///
    /// Records are pulled from the iterator one at a time, so the input may
    /// be unbounded.
    pub fn run<I>(mut self, records: I) -> Result<TaskReport, TaskError<S::InitError>>
    where
        I: IntoIterator<Item = Record>,
    {
        let component = self.context.component().to_owned();
        let task_index = self.context.task_index();
        let counts = AckCounter::new();
        let mut acker = TaskAcker {
            counts: counts.clone(),
            downstream: self.downstream.take().map(|a| Arc::new(Mutex::new(a))),
        };

        let mut declarer = OutputDeclarer::default();
        self.sink.declare_output_schema(&mut declarer);
        debug!(
            component = %component,
            task_index,
            fields = ?declarer.fields().collect::<Vec<_>>(),
            "Declared output schema"
        );

        if let Err(e) = self.sink.initialize(&self.context, Box::new(acker.clone())) {
            self.sink.shutdown();
            return Err(TaskError::Init(e));
        }
        info!(component = %component, task_index, "Sink initialized");

        let mut report = TaskReport::default();
        for record in records {
            report.processed += 1;
            let id = record.id();
            let acked_before = counts.acked();
            match self.sink.process(&record) {
                Ok(()) if counts.acked() == acked_before => {
                    warn!(
                        component = %component,
                        record = %id,
                        "Sink processed record without acknowledging it"
                    );
                }
                Ok(()) => (),
                Err(e) => {
                    warn!(
                        component = %component,
                        record = %id,
                        error = %e,
                        "Failed to process record"
                    );
                    acker.fail(id);
                }
            }
        }

        self.sink.shutdown();
        report.acked = counts.acked();
        report.failed = counts.failed();
        info!(
            component = %component,
            task_index,
            processed = report.processed,
            acked = report.acked,
            failed = report.failed,
            "Task finished"
        );
        Ok(report)
    }
}
