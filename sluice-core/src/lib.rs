//! Sluice core: the contract between a record pipeline and the sinks it feeds.
//!
//! A pipeline delivers [`Record`]s to a [`Sink`], which writes them somewhere and
//! acknowledges each one through an [`Acker`]. [`LocalTask`] is a minimal host
//! which drives a single sink through its whole lifecycle.
mod ack;
mod context;
mod record;
mod runtime;
mod schema;
mod sink;
mod value;

pub use ack::{AckCounter, AckEvent, AckLog, Acker};
pub use context::TaskContext;
pub use record::{Record, RecordError, RecordId};
pub use runtime::{LocalTask, TaskError, TaskReport};
pub use schema::OutputDeclarer;
pub use sink::Sink;
pub use value::Value;
