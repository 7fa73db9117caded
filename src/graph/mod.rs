//! In-memory labeled property multigraph.
//!
//! A [`GraphEngine`] owns sixteen independent [`Graph`] instances (only
//! index 0 is addressed by the current dispatcher; the rest exist so a
//! future multi-database command could select among them without a data
//! model change). Each `Graph` holds its own nodes, edges, and interning
//! tables; nothing is shared between graphs.

pub mod engine;
pub mod value;

pub use engine::{Edge, Graph, GraphEngine, Node};
pub use value::Value;

/// Client-provided node identifier. Zero is never a valid id (see
/// `crate::dispatch::parse_node_id`).
pub type NodeId = u64;

/// Interned small-int handle for an edge type name or a property key
/// name. Interning is monotonic: once a name is assigned an id it keeps
/// it for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternId(pub u32);

pub const GRAPH_COUNT: usize = 16;
