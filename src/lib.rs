//! graphd - in-memory labeled property graph server
//!
//! # Architecture
//!
//! - **Graph store**: nodes, typed multi-edges, property bags, per-graph
//!   type/key interning ([`graph`])
//! - **Query engine**: per-session named result sets built by
//!   traversals and set algebra ([`query`])
//! - **Wire codec**: RESP-style framing over TCP ([`wire`])
//! - **Dispatcher**: parses and routes one command at a time ([`dispatch`])
//! - **Storage sinks**: append-log durability and peer replication,
//!   composable via fan-out ([`storage`])
//! - **Session server**: one thread per connection, one query session
//!   per connection ([`server`], [`session`])
//!
//! # Usage example
//!
//! ```no_run
//! use graphd::graph::{GraphEngine, Value};
//! use graphd::dispatch::Dispatcher;
//! use graphd::storage::NullSink;
//! use graphd::query::QueryEngine;
//! use graphd::wire::Param;
//!
//! # fn main() {
//! let dispatcher = Dispatcher::new(GraphEngine::new(), Box::new(NullSink));
//! let mut session = QueryEngine::new();
//! dispatcher
//!     .dispatch(&mut session, "CREATE", &[Param::Str("1".to_string())])
//!     .unwrap();
//! # let _ = Value::from("unused");
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod query;
pub mod server;
pub mod session;
pub mod storage;
pub mod wire;

pub use error::{GraphError, Result};
