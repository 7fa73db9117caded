//! Per-session query engine: named result sets built by traversing and
//! combining node ids, backed by one [`crate::graph::Graph`].

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId, Value};

/// Comparison used by `FILTER`/`FIND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
}

impl Operator {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            other => Err(GraphError::UnknownOperator(other.to_string())),
        }
    }

    fn apply(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
        }
    }
}

/// Per-connection query state: named node-id sequences plus the log of
/// everything that has been `FETCH`ed. Nothing here is shared across
/// sessions.
#[derive(Debug, Default)]
pub struct QueryEngine {
    sets: std::collections::HashMap<String, Vec<NodeId>>,
    fetch_log: Vec<NodeId>,
}

impl QueryEngine {
    pub fn new() -> Self {
        QueryEngine::default()
    }

    fn get(&self, name: &str) -> Result<&Vec<NodeId>> {
        self.sets.get(name).ok_or_else(|| GraphError::UnknownSet(name.to_string()))
    }

    /// Assigns `target` to the full list of ids given. The source
    /// implementation this is modeled on only retains the last id; this
    /// is the fixed, full-list behavior the command contract mandates.
    pub fn start(&mut self, target: &str, ids: Vec<NodeId>) {
        self.sets.insert(target.to_string(), ids);
    }

    pub fn forward(&mut self, graph: &Graph, target: &str, source: &str, type_names: &[String]) -> Result<()> {
        let src = self.get(source)?.clone();
        let mut out = Vec::new();
        for id in src {
            out.extend(graph.forward_targets(id, type_names));
        }
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn backward(&mut self, graph: &Graph, target: &str, source: &str, type_names: &[String]) -> Result<()> {
        let src = self.get(source)?.clone();
        let mut out = Vec::new();
        for id in src {
            out.extend(graph.backward_sources(id, type_names));
        }
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn filter(
        &mut self,
        graph: &Graph,
        target: &str,
        source: &str,
        key: &str,
        value: &Value,
        op: Operator,
    ) -> Result<()> {
        let src = self.get(source)?.clone();
        let out = src
            .into_iter()
            .filter(|id| match graph.property(*id, key) {
                Some(v) => op.apply(v, value),
                None => false,
            })
            .collect();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    /// Scans every node in the graph. A node matches if it carries
    /// `key` and the predicate holds against its value, or if `key` is
    /// the literal pseudo-key `"id"`, in which case the predicate
    /// compares against the node id's lowercase hex rendering (no `0x`
    /// prefix, no zero padding).
    pub fn find(&mut self, graph: &Graph, target: &str, key: &str, value: &Value, op: Operator) -> Result<()> {
        let mut out = Vec::new();
        for id in graph.node_ids() {
            let matched = if let Some(v) = graph.property(id, key) {
                op.apply(v, value)
            } else if key == "id" {
                let hex = Value::Str(format!("{:x}", id));
                op.apply(&hex, value)
            } else {
                false
            };
            if matched {
                out.push(id);
            }
        }
        out.sort_unstable();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn unique(&mut self, target: &str, source: &str) -> Result<()> {
        let src = self.get(source)?.clone();
        let mut seen = HashSet::new();
        let out = src.into_iter().filter(|id| seen.insert(*id)).collect();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn append(&mut self, target: &str, a: &str, b: &str) -> Result<()> {
        let mut out = self.get(a)?.clone();
        out.extend(self.get(b)?.clone());
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn union(&mut self, target: &str, a: &str, b: &str) -> Result<()> {
        let sa = self.get(a)?.clone();
        let sb = self.get(b)?.clone();
        let mut seen = HashSet::new();
        let out = sa.into_iter().chain(sb).filter(|id| seen.insert(*id)).collect();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn intersection(&mut self, target: &str, a: &str, b: &str) -> Result<()> {
        let sa = self.get(a)?.clone();
        let sb: HashSet<NodeId> = self.get(b)?.iter().copied().collect();
        let mut seen = HashSet::new();
        let out = sa
            .into_iter()
            .filter(|id| sb.contains(id) && seen.insert(*id))
            .collect();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn difference(&mut self, target: &str, a: &str, b: &str) -> Result<()> {
        let sa = self.get(a)?.clone();
        let sb: HashSet<NodeId> = self.get(b)?.iter().copied().collect();
        let out = sa.into_iter().filter(|id| !sb.contains(id)).collect();
        self.sets.insert(target.to_string(), out);
        Ok(())
    }

    pub fn fetch(&mut self, source: &str) -> Result<Vec<NodeId>> {
        let contents = self.get(source)?.clone();
        self.fetch_log.extend(contents.iter().copied());
        Ok(contents)
    }

    pub fn clear(&mut self, source: &str) -> Result<()> {
        self.sets
            .remove(source)
            .map(|_| ())
            .ok_or_else(|| GraphError::UnknownSet(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn linear_graph() -> Graph {
        let mut g = Graph::new();
        g.create(1);
        g.create(2);
        g.create(3);
        g.connect(1, 2, "e", Value::from("")).unwrap();
        g.connect(1, 3, "e", Value::from("")).unwrap();
        g
    }

    #[test]
    fn start_retains_full_list() {
        let mut q = QueryEngine::new();
        q.start("a", vec![1, 2, 3]);
        assert_eq!(q.fetch("a").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn forward_preserves_insertion_order() {
        let g = linear_graph();
        let mut q = QueryEngine::new();
        q.start("a", vec![1]);
        q.forward(&g, "b", "a", &["e".to_string()]).unwrap();
        assert_eq!(q.fetch("b").unwrap(), vec![2, 3]);
    }

    #[test]
    fn clear_removes_the_set() {
        let mut q = QueryEngine::new();
        q.start("a", vec![1]);
        q.clear("a").unwrap();
        assert!(q.fetch("a").is_err());
    }

    #[test]
    fn difference_of_set_with_itself_is_empty() {
        let mut q = QueryEngine::new();
        q.start("a", vec![1, 2]);
        q.difference("d", "a", "a").unwrap();
        assert!(q.fetch("d").unwrap().is_empty());
    }

    #[test]
    fn append_cardinality_is_sum() {
        let mut q = QueryEngine::new();
        q.start("a", vec![1, 2]);
        q.start("b", vec![3]);
        q.append("c", "a", "b").unwrap();
        assert_eq!(q.fetch("c").unwrap().len(), 3);
    }

    #[test]
    fn find_matches_on_id_pseudo_key() {
        let g = linear_graph();
        let mut q = QueryEngine::new();
        q.find(&g, "r", "id", &Value::from("1"), Operator::Eq).unwrap();
        assert_eq!(q.fetch("r").unwrap(), vec![1]);
    }
}
