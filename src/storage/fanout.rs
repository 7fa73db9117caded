//! Composes several sinks into one. `record` delegates to each child in
//! order — the append log before replication, so a crash mid-fan-out
//! leaves a replay-safe log.

use crate::error::Result;
use crate::graph::GraphEngine;
use crate::query::QueryEngine;
use crate::wire::Param;

use super::StorageSink;

pub struct FanoutSink {
    children: Vec<Box<dyn StorageSink>>,
}

impl FanoutSink {
    pub fn new(children: Vec<Box<dyn StorageSink>>) -> Self {
        FanoutSink { children }
    }
}

impl StorageSink for FanoutSink {
    fn suppress(&mut self, value: bool) {
        for child in &mut self.children {
            child.suppress(value);
        }
    }

    fn load(&mut self, engine: &mut GraphEngine, session: &mut QueryEngine) -> Result<()> {
        // Only the first sink that actually persists state should
        // replay it; in practice that is the append log, listed first.
        // Replaying from every child would apply the same command
        // stream N times.
        if let Some(first) = self.children.first_mut() {
            first.load(engine, session)?;
        }
        Ok(())
    }

    fn record(&mut self, op: &str, params: &[Param]) {
        for child in &mut self.children {
            child.record(op, params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NullSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink(Arc<AtomicUsize>);
    impl StorageSink for CountingSink {
        fn suppress(&mut self, _value: bool) {}
        fn load(&mut self, _e: &mut GraphEngine, _s: &mut QueryEngine) -> Result<()> {
            Ok(())
        }
        fn record(&mut self, _op: &str, _params: &[Param]) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn record_delegates_to_every_child_in_order() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let mut fanout = FanoutSink::new(vec![
            Box::new(CountingSink(a.clone())),
            Box::new(NullSink),
            Box::new(CountingSink(b.clone())),
        ]);
        fanout.record("CREATE", &[]);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
