//! The graph store: nodes, typed multi-edges, property bags, and the
//! sixteen-graph container the dispatcher addresses by index.

use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::graph::value::Value;
use crate::graph::{NodeId, GRAPH_COUNT};

/// Bidirectional string/small-int table. Used once for edge type names
/// and once for property key names, per [`Graph`]. Never shrinks: a
/// name keeps its id for the graph's lifetime.
#[derive(Debug, Default)]
struct Interner {
    ids: HashMap<String, u32>,
    names: Vec<String>,
}

impl Interner {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    fn lookup(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }
}

/// A single directed, typed, weighted connection. Stored twice per
/// logical edge: once in the source's forward list, once in the
/// target's backward list (invariant P1).
#[derive(Debug, Clone)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    type_id: u32,
    pub weight: Value,
}

/// An edge with its type name resolved, suitable for handing to the
/// wire codec.
#[derive(Debug, Clone)]
pub struct EdgeView {
    pub source: NodeId,
    pub target: NodeId,
    pub type_name: String,
    pub weight: Value,
}

#[derive(Debug, Default)]
pub struct Node {
    pub id: NodeId,
    props: Vec<(u32, Value)>,
    pub forward: Vec<Edge>,
    pub backward: Vec<Edge>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Node {
            id,
            props: Vec::new(),
            forward: Vec::new(),
            backward: Vec::new(),
        }
    }
}

/// A view of a node's properties with key names resolved, for `GET`.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub id: NodeId,
    pub properties: Vec<(String, Value)>,
}

/// One labeled property multigraph: nodes, their adjacency, and the two
/// interning tables that back edge types and property keys.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    types: Interner,
    keys: Interner,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn node_exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Idempotent: re-creating an existing id resets its properties and
    /// adjacency to empty, matching the source's overwrite semantics
    /// (see SPEC_FULL.md Design Notes / Open Questions).
    pub fn create(&mut self, id: NodeId) {
        self.nodes.insert(id, Node::new(id));
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let forward: Vec<Edge> = node.forward.clone();
        let backward: Vec<Edge> = node.backward.clone();

        for edge in forward {
            let type_name = self.types.name(edge.type_id).to_string();
            let _ = self.disconnect(id, edge.target, &type_name);
        }
        for edge in backward {
            let type_name = self.types.name(edge.type_id).to_string();
            let _ = self.disconnect(edge.source, id, &type_name);
        }

        self.nodes.remove(&id);
        Ok(())
    }

    pub fn set_property(&mut self, id: NodeId, key: &str, value: Value) -> Result<()> {
        let key_id = self.keys.intern(key);
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        if let Some(entry) = node.props.iter_mut().find(|(k, _)| *k == key_id) {
            entry.1 = value;
        } else {
            node.props.push((key_id, value));
        }
        Ok(())
    }

    /// Absence of the key is not an error: returns whether an entry was
    /// actually removed.
    pub fn remove_property(&mut self, id: NodeId, key: &str) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let Some(key_id) = self.keys.lookup(key) else {
            return Ok(false);
        };
        if let Some(pos) = node.props.iter().position(|(k, _)| *k == key_id) {
            node.props.remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get_node(&self, id: NodeId) -> Result<NodeView> {
        let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        let properties = node
            .props
            .iter()
            .map(|(k, v)| (self.keys.name(*k).to_string(), v.clone()))
            .collect();
        Ok(NodeView { id, properties })
    }

    /// Looks up a single property by name, used by `FILTER`/`FIND`.
    pub fn property(&self, id: NodeId, key: &str) -> Option<&Value> {
        let key_id = self.keys.lookup(key)?;
        let node = self.nodes.get(&id)?;
        node.props.iter().find(|(k, _)| *k == key_id).map(|(_, v)| v)
    }

    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        type_name: &str,
        weight: Value,
    ) -> Result<EdgeView> {
        if !self.nodes.contains_key(&source) {
            return Err(GraphError::SourceNotInGraph);
        }
        if !self.nodes.contains_key(&target) {
            return Err(GraphError::TargetNotInGraph);
        }
        let type_id = self.types.intern(type_name);

        let fwd = Edge {
            source,
            target,
            type_id,
            weight: weight.clone(),
        };
        let bwd = fwd.clone();

        {
            let node = self.nodes.get_mut(&source).expect("checked above");
            if let Some(existing) = node
                .forward
                .iter_mut()
                .find(|e| e.target == target && e.type_id == type_id)
            {
                existing.weight = weight.clone();
            } else {
                node.forward.push(fwd);
            }
        }
        {
            let node = self.nodes.get_mut(&target).expect("checked above");
            if let Some(existing) = node
                .backward
                .iter_mut()
                .find(|e| e.source == source && e.type_id == type_id)
            {
                existing.weight = weight.clone();
            } else {
                node.backward.push(bwd);
            }
        }

        Ok(EdgeView {
            source,
            target,
            type_name: type_name.to_string(),
            weight,
        })
    }

    /// Removes the first matching `(source, target, type)` entry from
    /// both adjacency lists. Echoes the edge regardless of whether a
    /// match existed — absence is not an error.
    pub fn disconnect(&mut self, source: NodeId, target: NodeId, type_name: &str) -> Result<EdgeView> {
        if !self.nodes.contains_key(&source) {
            return Err(GraphError::SourceNotInGraph);
        }
        if !self.nodes.contains_key(&target) {
            return Err(GraphError::TargetNotInGraph);
        }
        let Some(type_id) = self.types.lookup(type_name) else {
            return Err(GraphError::UnknownType(type_name.to_string()));
        };

        let weight = self
            .nodes
            .get(&source)
            .and_then(|n| n.forward.iter().find(|e| e.target == target && e.type_id == type_id))
            .map(|e| e.weight.clone());

        if let Some(node) = self.nodes.get_mut(&source) {
            if let Some(pos) = node
                .forward
                .iter()
                .position(|e| e.target == target && e.type_id == type_id)
            {
                node.forward.remove(pos);
            }
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            if let Some(pos) = node
                .backward
                .iter()
                .position(|e| e.source == source && e.type_id == type_id)
            {
                node.backward.remove(pos);
            }
        }

        Ok(EdgeView {
            source,
            target,
            type_name: type_name.to_string(),
            weight: weight.unwrap_or(Value::Str(String::new())),
        })
    }

    pub fn forward_edges(&self, id: NodeId) -> Result<Vec<EdgeView>> {
        let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node
            .forward
            .iter()
            .map(|e| EdgeView {
                source: e.source,
                target: e.target,
                type_name: self.types.name(e.type_id).to_string(),
                weight: e.weight.clone(),
            })
            .collect())
    }

    pub fn backward_edges(&self, id: NodeId) -> Result<Vec<EdgeView>> {
        let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node
            .backward
            .iter()
            .map(|e| EdgeView {
                source: e.source,
                target: e.target,
                type_name: self.types.name(e.type_id).to_string(),
                weight: e.weight.clone(),
            })
            .collect())
    }

    /// Forward neighbors of `id` reachable via one of `type_names`, in
    /// adjacency order. Used by the query engine's `FORWARD`.
    pub fn forward_targets(&self, id: NodeId, type_names: &[String]) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        node.forward
            .iter()
            .filter(|e| type_names.iter().any(|t| self.types.name(e.type_id) == t))
            .map(|e| e.target)
            .collect()
    }

    pub fn backward_sources(&self, id: NodeId, type_names: &[String]) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        node.backward
            .iter()
            .filter(|e| type_names.iter().any(|t| self.types.name(e.type_id) == t))
            .map(|e| e.source)
            .collect()
    }
}

/// Container for the sixteen addressable graphs. Only index 0 is wired
/// to the current dispatcher; the others are reserved so a future
/// multi-database selector command can be added without changing the
/// data model.
pub struct GraphEngine {
    graphs: [Graph; GRAPH_COUNT],
}

impl Default for GraphEngine {
    fn default() -> Self {
        GraphEngine::new()
    }
}

impl GraphEngine {
    pub fn new() -> Self {
        GraphEngine {
            graphs: std::array::from_fn(|_| Graph::new()),
        }
    }

    pub fn graph(&self, index: usize) -> &Graph {
        &self.graphs[index]
    }

    pub fn graph_mut(&mut self, index: usize) -> &mut Graph {
        &mut self.graphs[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g() -> Graph {
        Graph::new()
    }

    #[test]
    fn create_then_connect_is_symmetric() {
        let mut graph = g();
        graph.create(1);
        graph.create(2);
        graph.connect(1, 2, "knows", Value::from("w1")).unwrap();

        let fwd = graph.forward_edges(1).unwrap();
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd[0].target, 2);
        assert_eq!(fwd[0].type_name, "knows");

        let bwd = graph.backward_edges(2).unwrap();
        assert_eq!(bwd.len(), 1);
        assert_eq!(bwd[0].source, 1);
    }

    #[test]
    fn connect_unknown_source_leaves_graph_unchanged() {
        let mut graph = g();
        graph.create(2);
        let err = graph.connect(1, 2, "knows", Value::from("w")).unwrap_err();
        assert!(matches!(err, GraphError::SourceNotInGraph));
        assert!(!graph.node_exists(1));
    }

    #[test]
    fn duplicate_connect_overwrites_weight_not_edge() {
        let mut graph = g();
        graph.create(1);
        graph.create(2);
        graph.connect(1, 2, "knows", Value::from("a")).unwrap();
        graph.connect(1, 2, "knows", Value::from("b")).unwrap();
        let fwd = graph.forward_edges(1).unwrap();
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd[0].weight, Value::from("b"));
    }

    #[test]
    fn delete_node_cascades_incident_edges() {
        let mut graph = g();
        graph.create(1);
        graph.create(2);
        graph.connect(1, 2, "knows", Value::from("w")).unwrap();
        graph.remove_node(2).unwrap();
        let fwd = graph.forward_edges(1).unwrap();
        assert!(fwd.is_empty());
    }

    #[test]
    fn set_property_overwrites_in_place() {
        let mut graph = g();
        graph.create(10);
        graph.set_property(10, "name", Value::from("alice")).unwrap();
        graph.set_property(10, "age", Value::from("30")).unwrap();
        graph.set_property(10, "name", Value::from("Alice")).unwrap();

        let view = graph.get_node(10).unwrap();
        assert_eq!(view.properties.len(), 2);
        assert_eq!(view.properties[0].0, "name");
        assert_eq!(view.properties[0].1, Value::from("Alice"));
    }

    #[test]
    fn remove_property_absent_key_is_not_an_error() {
        let mut graph = g();
        graph.create(1);
        let removed = graph.remove_property(1, "missing").unwrap();
        assert!(!removed);
    }

    #[test]
    fn disconnect_echoes_edge_even_when_absent() {
        let mut graph = g();
        graph.create(1);
        graph.create(2);
        graph.connect(1, 2, "knows", Value::from("w")).unwrap();
        let view = graph.disconnect(1, 2, "knows").unwrap();
        assert_eq!(view.target, 2);
        // second disconnect: no matching edge left, still succeeds
        let view2 = graph.disconnect(1, 2, "knows").unwrap();
        assert_eq!(view2.source, 1);
    }
}
