use crate::{Acker, OutputDeclarer, Record, TaskContext};

/// A terminal pipeline component writing records to an external system.
///
/// The host drives every sink through the same lifecycle:
///
/// 1. [`Sink::declare_output_schema`] while building the topology
/// 2. [`Sink::initialize`] exactly once before any record is delivered
/// 3. [`Sink::process`] once per record, in delivery order
/// 4. [`Sink::shutdown`] when the task stops, even if initialization failed
pub trait Sink: 'static {
    /// Non-recoverable error raised while initializing
    type InitError: std::error::Error + Send + Sync + 'static;
    /// Error raised while processing a single record
    type ProcessError: std::error::Error + Send + Sync + 'static;

    /// Acquire external resources. An error here fails the whole task.
    fn initialize(
        &mut self,
        context: &TaskContext,
        acker: Box<dyn Acker>,
    ) -> Result<(), Self::InitError>;

    /// Write one record and acknowledge it through the acker given to
    /// [`Sink::initialize`]. The record is borrowed and must not be retained.
    fn process(&mut self, record: &Record) -> Result<(), Self::ProcessError>;

    /// Declare the fields this component emits. Sinks emit nothing, which
    /// is the default.
    fn declare_output_schema(&self, _declarer: &mut OutputDeclarer) {}

    /// Release external resources. Must be safe to call at any point.
    fn shutdown(&mut self);
}
