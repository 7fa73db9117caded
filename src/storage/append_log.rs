//! Durable append-only command log. One JSON object per line, CRLF
//! terminated, opened lazily on first write.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::dispatch_inner;
use crate::error::Result;
use crate::graph::GraphEngine;
use crate::query::QueryEngine;
use crate::wire::Param;

use super::StorageSink;

#[derive(Serialize, Deserialize)]
struct LogRecord {
    op: String,
    params: Vec<RawParam>,
}

/// Wire params round-tripped through JSON. Integers and strings are
/// kept distinct so replay reproduces the exact parameter kinds the
/// original command carried.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawParam {
    Int(i64),
    Str(String),
}

impl From<&Param> for RawParam {
    fn from(p: &Param) -> Self {
        match p {
            Param::Int(n) => RawParam::Int(*n),
            Param::Str(s) => RawParam::Str(s.clone()),
        }
    }
}

impl From<RawParam> for Param {
    fn from(p: RawParam) -> Self {
        match p {
            RawParam::Int(n) => Param::Int(n),
            RawParam::Str(s) => Param::Str(s),
        }
    }
}

pub struct AppendLogSink {
    path: PathBuf,
    handle: Option<File>,
    suppressed: bool,
}

impl AppendLogSink {
    pub fn new(path: PathBuf) -> Self {
        AppendLogSink {
            path,
            handle: None,
            suppressed: false,
        }
    }
}

impl StorageSink for AppendLogSink {
    fn suppress(&mut self, value: bool) {
        self.suppressed = value;
    }

    fn load(&mut self, engine: &mut GraphEngine, session: &mut QueryEngine) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let file = File::open(&self.path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: LogRecord = serde_json::from_str(&line)?;
            let params: Vec<Param> = record.params.into_iter().map(Param::from).collect();
            dispatch_inner(engine, session, &record.op, &params)?;
        }
        Ok(())
    }

    fn record(&mut self, op: &str, params: &[Param]) {
        if self.suppressed {
            return;
        }
        if self.handle.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(f) => self.handle = Some(f),
                Err(e) => {
                    tracing::error!(error = %e, path = %self.path.display(), "failed to open append log");
                    return;
                }
            }
        }
        let record = LogRecord {
            op: op.to_string(),
            params: params.iter().map(RawParam::from).collect(),
        };
        let line = match serde_json::to_string(&record) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize append-log record");
                return;
            }
        };
        if let Some(handle) = &mut self.handle {
            if let Err(e) = write!(handle, "{line}\r\n") {
                tracing::error!(error = %e, "failed to write append-log record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Value;

    #[test]
    fn record_then_load_replays_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let mut sink = AppendLogSink::new(path.clone());
        sink.record("CREATE", &[Param::Str("1".to_string())]);
        sink.record(
            "SET",
            &[
                Param::Str("1".to_string()),
                Param::Str("name".to_string()),
                Param::Str("alice".to_string()),
            ],
        );

        let mut engine = GraphEngine::new();
        let mut session = QueryEngine::new();
        let mut replay_sink = AppendLogSink::new(path);
        replay_sink.load(&mut engine, &mut session).unwrap();

        let view = engine.graph(0).get_node(1).unwrap();
        assert_eq!(view.properties[0].1, Value::from("alice"));
    }

    #[test]
    fn suppressed_record_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut sink = AppendLogSink::new(path.clone());
        sink.suppress(true);
        sink.record("CREATE", &[Param::Str("1".to_string())]);
        assert!(!path.exists());
    }

    #[test]
    fn load_on_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jsonl");
        let mut sink = AppendLogSink::new(path);
        let mut engine = GraphEngine::new();
        let mut session = QueryEngine::new();
        sink.load(&mut engine, &mut session).unwrap();
    }
}
