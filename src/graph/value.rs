//! Scalar values carried on properties and edge weights.
//!
//! The store never interprets a [`Value`] beyond equality comparison in
//! `FILTER`/`FIND` — it is opaque payload handed back verbatim on `GET`
//! and `EDGES`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Str(String),
    Int(i64),
}

impl Value {
    /// Render for wire replies and for log comparisons. Integers render
    /// as their base-10 text so a client doesn't need to distinguish
    /// kinds when it only wants to print the value.
    pub fn as_wire_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        // A value arriving from the wire is always a string unless the
        // client framed it as a RESP integer; parsing further than that
        // would contradict FIND's "id" pseudo-key, which compares
        // against a hex string, not a parsed integer.
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
