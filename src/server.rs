//! Session server (C9): accepts TCP connections and drives one query
//! session per connection against the shared [`Dispatcher`].
//!
//! Concurrency model: one thread per accepted connection plus the
//! listener thread. Within a session, commands are processed strictly
//! in arrival order and each reply is sent before the next command is
//! read. Across sessions there is no ordering guarantee; the
//! dispatcher's internal mutex is what keeps the graph consistent.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::session::Session;
use crate::wire::{RespCodec, TcpDuplex};

pub struct Server {
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Server { dispatcher }
    }

    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        tracing::info!(%addr, "session server listening");
        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };
            let dispatcher = Arc::clone(&self.dispatcher);
            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, &dispatcher) {
                    tracing::warn!(error = %e, "session ended with an error");
                }
            });
        }
        Ok(())
    }
}

fn handle_connection(stream: TcpStream, dispatcher: &Dispatcher) -> Result<()> {
    let peer = stream.peer_addr().ok();
    tracing::info!(?peer, "session connected");

    let duplex = TcpDuplex::new(stream)?;
    let mut codec = RespCodec::new(duplex);
    let mut session = Session::new();

    loop {
        let params = match codec.read_request() {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(?peer, error = %e, "malformed request, dropping session");
                break;
            }
        };
        if params.is_empty() {
            continue;
        }
        let verb = params[0].as_str();
        let rest = &params[1..];

        match dispatcher.dispatch(&mut session.query, &verb, rest) {
            Ok(reply) => codec.write_reply(&reply)?,
            Err(e) => codec.write_error(&e.to_string())?,
        }
    }

    tracing::info!(?peer, "session disconnected");
    Ok(())
}
