//! Per-connection session state: a query engine bound to one graph.
//! Sessions are never shared; everything here vanishes on disconnect.

use crate::query::QueryEngine;

pub struct Session {
    pub query: QueryEngine,
}

impl Session {
    pub fn new() -> Self {
        Session {
            query: QueryEngine::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
