//! Server entry point: loads config, wires the durability/replication
//! sink stack, replays the log, and serves connections until a signal
//! asks it to stop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use graphd::config::Config;
use graphd::dispatch::Dispatcher;
use graphd::graph::GraphEngine;
use graphd::server::Server;
use graphd::storage::{AppendLogSink, FanoutSink, ReplicationSink, StorageSink};

fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config {config_path}: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let append_log = AppendLogSink::new(PathBuf::from(&config.database));
    let sink: Box<dyn StorageSink> = if config.replication.hosts.is_empty() {
        Box::new(append_log)
    } else {
        Box::new(FanoutSink::new(vec![
            Box::new(append_log),
            Box::new(ReplicationSink::new(config.replication.hosts.clone())),
        ]))
    };

    let dispatcher = Arc::new(Dispatcher::new(GraphEngine::new(), sink));

    if let Err(e) = dispatcher.load() {
        tracing::error!(error = %e, "failed to replay append log");
        std::process::exit(1);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    register_signal_handlers(Arc::clone(&shutdown));

    let server = Server::new(Arc::clone(&dispatcher));
    let addr = config.listen_addr();
    if let Err(e) = server.run(&addr) {
        tracing::error!(error = %e, "session server exited with an error");
        std::process::exit(1);
    }
}

/// Flushing on SIGINT/SIGTERM just means letting the process exit
/// normally: the append-log sink has no write buffering beyond the
/// OS's, so there is nothing to flush explicitly. The handler exists so
/// an operator gets a clean shutdown log line instead of a raw kill.
fn register_signal_handlers(shutdown: Arc<AtomicBool>) {
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = signal_hook::flag::register(sig, flag) {
            tracing::warn!(error = %e, signal = sig, "failed to register signal handler");
        }
    }
    std::thread::spawn(move || loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown signal received, exiting");
            std::process::exit(0);
        }
        std::thread::sleep(std::time::Duration::from_millis(200));
    });
}
