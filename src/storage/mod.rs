//! Storage sinks: the durability/replication pipeline that every
//! successful mutation is handed to.
//!
//! A sink is a uniform three-method contract (`suppress`, `load`,
//! `record`) so the dispatcher never needs to know whether it is
//! talking to an append-only log file, a set of replica connections,
//! or several of both fanned out together.

pub mod append_log;
pub mod fanout;
pub mod replication;

pub use append_log::AppendLogSink;
pub use fanout::FanoutSink;
pub use replication::ReplicationSink;

use crate::error::Result;
use crate::graph::GraphEngine;
use crate::query::QueryEngine;
use crate::wire::Param;

/// Target for mutation commands. Implementors persist or forward the
/// command stream; they never see query verbs (the dispatcher only
/// calls `record` for the six mutation verbs, after successful local
/// application).
pub trait StorageSink: Send {
    /// While suppressed, `record` is a no-op. Used during replay so
    /// replaying the log does not re-log or re-replicate.
    fn suppress(&mut self, value: bool);

    /// Replays whatever persisted state this sink holds into `engine`,
    /// using `session` as scratch query-engine state (replay commands
    /// are mutation verbs and never touch named sets, but the
    /// dispatcher's signature needs one).
    fn load(&mut self, engine: &mut GraphEngine, session: &mut QueryEngine) -> Result<()>;

    /// Called after a mutation verb has been validated and applied
    /// locally.
    fn record(&mut self, op: &str, params: &[Param]);
}

/// A sink that drops everything. Used for servers configured with no
/// durability and no replication, and in tests.
pub struct NullSink;

impl StorageSink for NullSink {
    fn suppress(&mut self, _value: bool) {}

    fn load(&mut self, _engine: &mut GraphEngine, _session: &mut QueryEngine) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, _op: &str, _params: &[Param]) {}
}
