//! Command dispatcher: parses one request, validates arity and
//! parameter shapes, routes to the graph store or query engine, and
//! builds the reply. Every successful mutation verb is handed to the
//! configured [`crate::storage::StorageSink`]; queries never are.

use std::sync::Mutex;

use crate::error::{GraphError, Result};
use crate::graph::{GraphEngine, NodeId, Value};
use crate::query::{Operator, QueryEngine};
use crate::storage::StorageSink;
use crate::wire::{Param, Reply};

const MUTATION_VERBS: &[&str] = &["CREATE", "DELETE", "SET", "UNSET", "CONNECT", "DISCONNECT"];

/// Parses a node id parameter per the command contract: integers pass
/// through, `0x`-prefixed strings parse as hex, everything else parses
/// as base 10. Zero, and anything that fails to parse, is rejected.
///
/// Parses the full `u64` range rather than going through `i64`: a node
/// id in the upper half of the 64-bit space (e.g. `0x8000000000000000`
/// and above) is valid and must not overflow during parsing.
pub fn parse_node_id(param: &Param) -> Result<NodeId> {
    let raw: u64 = match param {
        Param::Int(n) => {
            if *n <= 0 {
                return Err(GraphError::InvalidNodeId(param.as_str()));
            }
            *n as u64
        }
        Param::Str(s) => {
            let parsed = if let Some(hex) = s.strip_prefix("0x") {
                u64::from_str_radix(hex, 16)
            } else {
                s.parse::<u64>()
            };
            match parsed {
                Ok(n) => n,
                Err(_) => return Err(GraphError::InvalidNodeId(s.clone())),
            }
        }
    };
    if raw == 0 {
        return Err(GraphError::InvalidNodeId(param.as_str()));
    }
    Ok(raw)
}

fn expect_arity(params: &[Param], expected: usize) -> Result<()> {
    if params.len() != expected {
        return Err(GraphError::Arity {
            got: params.len(),
            expected,
        });
    }
    Ok(())
}

/// At-least-N arity check for verbs with a variadic tail (`START`,
/// `FORWARD`, `BACKWARD`).
fn expect_min_arity(params: &[Param], min: usize) -> Result<()> {
    if params.len() < min {
        return Err(GraphError::Arity {
            got: params.len(),
            expected: min,
        });
    }
    Ok(())
}

// Node ids are rendered as decimal strings rather than RESP integers:
// `Reply::Int` carries an `i64`, and a node id occupies the full `u64`
// range (see `parse_node_id`), so a high-bit id would silently wrap if
// cast to `i64`.
fn node_id_reply(id: NodeId) -> Reply {
    Reply::from(id.to_string())
}

fn edge_view_reply(edge: crate::graph::engine::EdgeView) -> Reply {
    Reply::Map(vec![
        ("source".to_string(), node_id_reply(edge.source)),
        ("target".to_string(), node_id_reply(edge.target)),
        ("type".to_string(), Reply::from(edge.type_name)),
        ("weight".to_string(), Reply::from(edge.weight.as_wire_string())),
    ])
}

fn node_view_reply(node: crate::graph::engine::NodeView) -> Reply {
    let props = node
        .properties
        .into_iter()
        .map(|(k, v)| (k, Reply::from(v.as_wire_string())))
        .collect::<Vec<_>>();
    Reply::Map(vec![
        ("id".to_string(), node_id_reply(node.id)),
        ("properties".to_string(), Reply::Map(props)),
    ])
}

fn ids_reply(ids: &[NodeId]) -> Reply {
    Reply::List(ids.iter().map(|id| node_id_reply(*id)).collect())
}

/// Shared process state behind the global dispatcher lock: the sixteen
/// graphs and the configured durability/replication sink.
pub struct Shared {
    pub engine: GraphEngine,
    pub sink: Box<dyn StorageSink>,
}

pub struct Dispatcher {
    shared: Mutex<Shared>,
}

impl Dispatcher {
    pub fn new(engine: GraphEngine, sink: Box<dyn StorageSink>) -> Self {
        Dispatcher {
            shared: Mutex::new(Shared { engine, sink }),
        }
    }

    /// Replays the durability sink's recorded log into this dispatcher
    /// under suppression, so the replay does not re-log or
    /// re-replicate. Must run before any client connection is served.
    pub fn load(&self) -> Result<()> {
        let mut guard = self.shared.lock().expect("dispatcher lock poisoned");
        guard.sink.suppress(true);
        let mut replay_session = QueryEngine::new();
        // Split borrow: `load` needs to call back into `dispatch_locked`,
        // which itself needs `&mut Shared`. Take the sink out, load, put
        // it back; the sink only needs the engine during replay via the
        // closures it calls on `self`.
        let Shared { engine, sink } = &mut *guard;
        sink.load(engine, &mut replay_session)?;
        guard.sink.suppress(false);
        Ok(())
    }

    pub fn dispatch(&self, session: &mut QueryEngine, verb: &str, params: &[Param]) -> Result<Reply> {
        let mut guard = self.shared.lock().expect("dispatcher lock poisoned");
        let reply = dispatch_inner(&mut guard.engine, session, verb, params)?;
        if MUTATION_VERBS.contains(&verb) {
            guard.sink.record(verb, params);
        }
        Ok(reply)
    }
}

/// Applies one command against `engine`/`session` without touching the
/// storage sink. Used both by [`Dispatcher::dispatch`] (under the lock,
/// followed by a `record` call) and by replay, where the sink itself
/// drives this through a temporary session under suppression.
pub fn dispatch_inner(
    engine: &mut GraphEngine,
    session: &mut QueryEngine,
    verb: &str,
    params: &[Param],
) -> Result<Reply> {
    let graph = engine.graph_mut(0);
    match verb {
        "PING" => {
            expect_arity(params, 0)?;
            Ok(Reply::from("PONG"))
        }
        "CREATE" => {
            expect_arity(params, 1)?;
            let id = parse_node_id(&params[0])?;
            graph.create(id);
            Ok(Reply::from("OK"))
        }
        "DELETE" => {
            expect_arity(params, 1)?;
            let id = parse_node_id(&params[0])?;
            graph.remove_node(id)?;
            Ok(Reply::from("OK"))
        }
        "SET" => {
            expect_arity(params, 3)?;
            let id = parse_node_id(&params[0])?;
            let key = params[1].as_str();
            let value = Value::from(params[2].as_str());
            graph.set_property(id, &key, value)?;
            Ok(Reply::from("OK"))
        }
        "UNSET" => {
            expect_arity(params, 2)?;
            let id = parse_node_id(&params[0])?;
            let key = params[1].as_str();
            graph.remove_property(id, &key)?;
            Ok(Reply::from("OK"))
        }
        "CONNECT" => {
            expect_arity(params, 4)?;
            let src = parse_node_id(&params[0])?;
            let tgt = parse_node_id(&params[1])?;
            let type_name = params[2].as_str();
            let weight = Value::from(params[3].as_str());
            let edge = graph.connect(src, tgt, &type_name, weight)?;
            Ok(edge_view_reply(edge))
        }
        "DISCONNECT" => {
            expect_arity(params, 3)?;
            let src = parse_node_id(&params[0])?;
            let tgt = parse_node_id(&params[1])?;
            let type_name = params[2].as_str();
            let edge = graph.disconnect(src, tgt, &type_name)?;
            Ok(edge_view_reply(edge))
        }
        "GET" => {
            expect_arity(params, 1)?;
            let id = parse_node_id(&params[0])?;
            let node = graph.get_node(id)?;
            Ok(node_view_reply(node))
        }
        "EDGES" => {
            expect_arity(params, 1)?;
            let id = parse_node_id(&params[0])?;
            let forward = graph.forward_edges(id)?;
            let backward = graph.backward_edges(id)?;
            Ok(Reply::Map(vec![
                (
                    "forward".to_string(),
                    Reply::List(forward.into_iter().map(edge_view_reply).collect()),
                ),
                (
                    "backward".to_string(),
                    Reply::List(backward.into_iter().map(edge_view_reply).collect()),
                ),
            ]))
        }
        "FETCH" => {
            expect_arity(params, 1)?;
            let name = params[0].as_str();
            let ids = session.fetch(&name)?;
            Ok(ids_reply(&ids))
        }
        "CLEAR" => {
            expect_arity(params, 1)?;
            let name = params[0].as_str();
            session.clear(&name)?;
            Ok(Reply::from("OK"))
        }
        "START" => {
            expect_min_arity(params, 1)?;
            let target = params[0].as_str();
            let ids = params[1..]
                .iter()
                .map(parse_node_id)
                .collect::<Result<Vec<_>>>()?;
            session.start(&target, ids);
            Ok(Reply::from("OK"))
        }
        "FIND" => {
            expect_arity(params, 4)?;
            let target = params[0].as_str();
            let key = params[1].as_str();
            let value = Value::from(params[2].as_str());
            let op = Operator::parse(&params[3].as_str())?;
            session.find(graph, &target, &key, &value, op)?;
            Ok(Reply::from("OK"))
        }
        "FORWARD" => {
            expect_min_arity(params, 2)?;
            let target = params[0].as_str();
            let source = params[1].as_str();
            let types: Vec<String> = params[2..].iter().map(Param::as_str).collect();
            session.forward(graph, &target, &source, &types)?;
            Ok(Reply::from("OK"))
        }
        "BACKWARD" => {
            expect_min_arity(params, 2)?;
            let target = params[0].as_str();
            let source = params[1].as_str();
            let types: Vec<String> = params[2..].iter().map(Param::as_str).collect();
            session.backward(graph, &target, &source, &types)?;
            Ok(Reply::from("OK"))
        }
        "FILTER" => {
            expect_arity(params, 5)?;
            let target = params[0].as_str();
            let source = params[1].as_str();
            let key = params[2].as_str();
            let value = Value::from(params[3].as_str());
            let op = Operator::parse(&params[4].as_str())?;
            session.filter(graph, &target, &source, &key, &value, op)?;
            Ok(Reply::from("OK"))
        }
        "APPEND" => {
            expect_arity(params, 3)?;
            session.append(&params[0].as_str(), &params[1].as_str(), &params[2].as_str())?;
            Ok(Reply::from("OK"))
        }
        "UNION" => {
            expect_arity(params, 3)?;
            session.union(&params[0].as_str(), &params[1].as_str(), &params[2].as_str())?;
            Ok(Reply::from("OK"))
        }
        "INTERSECTION" => {
            expect_arity(params, 3)?;
            session.intersection(&params[0].as_str(), &params[1].as_str(), &params[2].as_str())?;
            Ok(Reply::from("OK"))
        }
        "DIFFERENCE" => {
            expect_arity(params, 3)?;
            session.difference(&params[0].as_str(), &params[1].as_str(), &params[2].as_str())?;
            Ok(Reply::from("OK"))
        }
        other => Err(GraphError::UnknownVerb(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NullSink;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(GraphEngine::new(), Box::new(NullSink))
    }

    #[test]
    fn invalid_node_id_zero_is_rejected() {
        let d = dispatcher();
        let mut session = QueryEngine::new();
        let err = d
            .dispatch(&mut session, "CREATE", &[Param::Str("0".to_string())])
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidNodeId(_)));
    }

    #[test]
    fn hex_and_decimal_node_ids_are_equivalent() {
        let d = dispatcher();
        let mut session = QueryEngine::new();
        d.dispatch(&mut session, "CREATE", &[Param::Str("0x1A".to_string())])
            .unwrap();
        let reply = d
            .dispatch(&mut session, "GET", &[Param::Str("26".to_string())])
            .unwrap();
        match reply {
            Reply::Map(entries) => {
                assert_eq!(entries[0].0, "id");
                match &entries[0].1 {
                    Reply::Ok(id) if id == "26" => {}
                    other => panic!("unexpected id reply: {other:?}"),
                }
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn node_id_above_i64_max_round_trips() {
        let d = dispatcher();
        let mut session = QueryEngine::new();
        let huge = "0xFFFFFFFFFFFFFFFF".to_string();
        d.dispatch(&mut session, "CREATE", &[Param::Str(huge)]).unwrap();
        let reply = d
            .dispatch(&mut session, "GET", &[Param::Str(u64::MAX.to_string())])
            .unwrap();
        match reply {
            Reply::Map(entries) => match &entries[0].1 {
                Reply::Ok(id) if id == &u64::MAX.to_string() => {}
                other => panic!("unexpected id reply: {other:?}"),
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn arity_mismatch_reports_counts() {
        let d = dispatcher();
        let mut session = QueryEngine::new();
        let err = d.dispatch(&mut session, "CREATE", &[]).unwrap_err();
        assert!(matches!(err, GraphError::Arity { got: 0, expected: 1 }));
    }

    #[test]
    fn queries_do_not_record_to_the_sink() {
        use crate::storage::StorageSink;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingSink(Arc<AtomicUsize>);
        impl StorageSink for CountingSink {
            fn suppress(&mut self, _value: bool) {}
            fn load(&mut self, _engine: &mut GraphEngine, _session: &mut QueryEngine) -> Result<()> {
                Ok(())
            }
            fn record(&mut self, _op: &str, _params: &[Param]) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let d = Dispatcher::new(GraphEngine::new(), Box::new(CountingSink(counter.clone())));
        let mut session = QueryEngine::new();
        d.dispatch(&mut session, "CREATE", &[Param::Str("1".to_string())])
            .unwrap();
        d.dispatch(&mut session, "GET", &[Param::Str("1".to_string())])
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
