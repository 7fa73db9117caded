//! Replication sink: re-issues every accepted mutation against a set
//! of peer servers speaking the same wire protocol. Reads are never
//! replicated — only the six mutation verbs ever reach `record`.

use crate::error::Result;
use crate::graph::GraphEngine;
use crate::query::QueryEngine;
use crate::wire::{Frame, Param, RespCodec, TcpDuplex};

use super::StorageSink;

struct Peer {
    addr: String,
    codec: Option<RespCodec<TcpDuplex>>,
}

impl Peer {
    fn new(addr: String) -> Self {
        Peer { addr, codec: None }
    }

    fn ensure_connected(&mut self) -> bool {
        if self.codec.is_some() {
            return true;
        }
        match TcpDuplex::connect(&self.addr) {
            Ok(stream) => {
                self.codec = Some(RespCodec::new(stream));
                true
            }
            Err(e) => {
                tracing::warn!(peer = %self.addr, error = %e, "replica connect failed");
                false
            }
        }
    }

    fn send(&mut self, op: &str, params: &[Param]) {
        if !self.ensure_connected() {
            return;
        }
        let codec = self.codec.as_mut().expect("connected above");
        if let Err(e) = codec.write_request(op, params) {
            tracing::warn!(peer = %self.addr, error = %e, "replica write failed");
            self.codec = None;
            return;
        }
        match codec.read_any() {
            Ok(Frame::Error(msg)) => {
                tracing::warn!(peer = %self.addr, error = %msg, "replica rejected command");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(peer = %self.addr, error = %e, "replica read failed");
                self.codec = None;
            }
        }
    }
}

/// Holds one connection per configured replica host. A failing peer is
/// logged, never surfaced to the client whose command triggered the
/// write — this spec's fixed stance on the source's permissive
/// replication behavior (see SPEC_FULL.md §4.4).
pub struct ReplicationSink {
    peers: Vec<Peer>,
}

impl ReplicationSink {
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        ReplicationSink {
            peers: hosts.into_iter().map(Peer::new).collect(),
        }
    }
}

impl StorageSink for ReplicationSink {
    fn suppress(&mut self, _value: bool) {
        // Replay commands are sourced from the local append log, not
        // from peers; replication has nothing to do during replay
        // because load() never calls record().
    }

    fn load(&mut self, _engine: &mut GraphEngine, _session: &mut QueryEngine) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, op: &str, params: &[Param]) {
        for peer in &mut self.peers {
            peer.send(op, params);
        }
    }
}
