//! RESP-style wire codec: frames client requests (arrays of bulk
//! strings) and server replies (simple strings, errors, integers, bulk
//! strings, and nested arrays) over a byte stream.
//!
//! One asymmetry matters and is easy to miss: a *top-level* string
//! reply is sent as a simple string (`+OK\r\n`), but a string nested
//! inside an array or map reply is sent as a bulk string
//! (`$3\r\nfoo\r\n`). Both are verified in the tests below.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crate::error::{GraphError, Result};

/// Glues a `TcpStream`'s buffered read half and its write half into one
/// `BufRead + Write` stream, which is what [`RespCodec`] wants. Used on
/// both ends of a connection: the session server reading requests and
/// writing replies, and the replication sink's peer client doing the
/// reverse.
pub struct TcpDuplex {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpDuplex {
    pub fn connect(addr: &str) -> io::Result<Self> {
        let writer = TcpStream::connect(addr)?;
        Self::new(writer)
    }

    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(TcpDuplex { reader, writer: stream })
    }

    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.writer.peer_addr()
    }
}

impl Read for TcpDuplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for TcpDuplex {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }
    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Write for TcpDuplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// One request parameter as received off the wire: everything arrives
/// as text, but RESP lets a client frame a parameter as an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Str(String),
    Int(i64),
}

impl Param {
    pub fn as_str(&self) -> String {
        match self {
            Param::Str(s) => s.clone(),
            Param::Int(n) => n.to_string(),
        }
    }
}

/// A value handed to the codec for encoding as a reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Int(i64),
    List(Vec<Reply>),
    /// Flat alternating key/value pairs, encoded as a `2*len` array.
    Map(Vec<(String, Reply)>),
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Ok(s.to_string())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Ok(s)
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Reply::Int(n)
    }
}

/// Reads RESP-framed requests and writes RESP-framed replies over any
/// buffered duplex stream (a `TcpStream`, or an in-memory buffer in
/// tests).
pub struct RespCodec<S> {
    stream: S,
}

impl<S: BufRead + Write> RespCodec<S> {
    pub fn new(stream: S) -> Self {
        RespCodec { stream }
    }

    /// Reads one request (an array of bulk strings). Returns `Ok(None)`
    /// on a clean EOF between requests.
    pub fn read_request(&mut self) -> Result<Option<Vec<Param>>> {
        let mut header = String::new();
        let read = self.stream.read_line(&mut header)?;
        if read == 0 {
            return Ok(None);
        }
        let header = header.trim_end_matches(['\r', '\n']);
        let Some(rest) = header.strip_prefix('*') else {
            return Err(GraphError::Protocol(format!("expected array, got {header:?}")));
        };
        let count: usize = rest
            .parse()
            .map_err(|_| GraphError::Protocol(format!("bad array length {rest:?}")))?;

        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            params.push(self.read_bulk_or_int()?);
        }
        Ok(Some(params))
    }

    fn read_bulk_or_int(&mut self) -> Result<Param> {
        let mut line = String::new();
        self.stream.read_line(&mut line)?;
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(rest) = line.strip_prefix('$') {
            let len: usize = rest
                .parse()
                .map_err(|_| GraphError::Protocol(format!("bad bulk length {rest:?}")))?;
            let mut buf = vec![0u8; len + 2];
            io::Read::read_exact(&mut self.stream, &mut buf)?;
            buf.truncate(len);
            let text = String::from_utf8(buf)
                .map_err(|e| GraphError::Protocol(format!("non-utf8 bulk string: {e}")))?;
            Ok(Param::Str(text))
        } else if let Some(rest) = line.strip_prefix(':') {
            let n: i64 = rest
                .parse()
                .map_err(|_| GraphError::Protocol(format!("bad integer {rest:?}")))?;
            Ok(Param::Int(n))
        } else {
            Err(GraphError::Protocol(format!("expected bulk string or integer, got {line:?}")))
        }
    }

    pub fn write_reply(&mut self, reply: &Reply) -> Result<()> {
        match reply {
            Reply::Ok(s) => {
                // Top-level plain string: simple-string encoding.
                write!(self.stream, "+{s}\r\n")?;
            }
            Reply::Int(n) => write!(self.stream, ":{n}\r\n")?,
            Reply::List(items) => self.write_list(items)?,
            Reply::Map(entries) => self.write_map(entries)?,
        }
        self.stream.flush()?;
        Ok(())
    }

    pub fn write_error(&mut self, message: &str) -> Result<()> {
        write!(self.stream, "-{message}\r\n")?;
        self.stream.flush()?;
        Ok(())
    }

    fn write_list(&mut self, items: &[Reply]) -> Result<()> {
        write!(self.stream, "*{}\r\n", items.len())?;
        for item in items {
            self.write_nested(item)?;
        }
        Ok(())
    }

    fn write_map(&mut self, entries: &[(String, Reply)]) -> Result<()> {
        write!(self.stream, "*{}\r\n", entries.len() * 2)?;
        for (key, value) in entries {
            self.write_bulk(key)?;
            self.write_nested(value)?;
        }
        Ok(())
    }

    /// Encodes a reply that is *not* at the top level: plain strings
    /// become bulk strings here, unlike [`Self::write_reply`].
    fn write_nested(&mut self, reply: &Reply) -> Result<()> {
        match reply {
            Reply::Ok(s) => self.write_bulk(s)?,
            Reply::Int(n) => write!(self.stream, ":{n}\r\n")?,
            Reply::List(items) => self.write_list(items)?,
            Reply::Map(entries) => self.write_map(entries)?,
        }
        Ok(())
    }

    fn write_bulk(&mut self, s: &str) -> Result<()> {
        write!(self.stream, "${}\r\n{}\r\n", s.as_bytes().len(), s)?;
        Ok(())
    }

    /// Client-side counterpart of [`Self::read_request`]: frames a
    /// command as an array of bulk strings. Used by the replication
    /// sink to re-issue mutations against peer servers.
    pub fn write_request(&mut self, verb: &str, params: &[Param]) -> Result<()> {
        write!(self.stream, "*{}\r\n", params.len() + 1)?;
        self.write_bulk(verb)?;
        for p in params {
            self.write_bulk(&p.as_str())?;
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Reads one reply frame of any shape, recursively. Used by
    /// replica clients, which only need to know whether the peer
    /// accepted the command, not decode its structure.
    pub fn read_any(&mut self) -> Result<Frame> {
        let mut line = String::new();
        self.stream.read_line(&mut line)?;
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if let Some(rest) = line.strip_prefix('+') {
            Ok(Frame::Simple(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix('-') {
            Ok(Frame::Error(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix(':') {
            let n: i64 = rest
                .parse()
                .map_err(|_| GraphError::Protocol(format!("bad integer {rest:?}")))?;
            Ok(Frame::Int(n))
        } else if let Some(rest) = line.strip_prefix('$') {
            let len: usize = rest
                .parse()
                .map_err(|_| GraphError::Protocol(format!("bad bulk length {rest:?}")))?;
            let mut buf = vec![0u8; len + 2];
            io::Read::read_exact(&mut self.stream, &mut buf)?;
            buf.truncate(len);
            let text = String::from_utf8(buf)
                .map_err(|e| GraphError::Protocol(format!("non-utf8 bulk string: {e}")))?;
            Ok(Frame::Bulk(text))
        } else if let Some(rest) = line.strip_prefix('*') {
            let count: usize = rest
                .parse()
                .map_err(|_| GraphError::Protocol(format!("bad array length {rest:?}")))?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(self.read_any()?);
            }
            Ok(Frame::Array(items))
        } else {
            Err(GraphError::Protocol(format!("unrecognized frame {line:?}")))
        }
    }
}

/// A decoded reply frame of unknown shape, as read by [`RespCodec::read_any`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Int(i64),
    Bulk(String),
    Array(Vec<Frame>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip_request(bytes: &[u8]) -> Vec<Param> {
        let mut codec = RespCodec::new(Cursor::new(bytes.to_vec()));
        codec.read_request().unwrap().unwrap()
    }

    #[test]
    fn parses_array_of_bulk_strings() {
        let params = roundtrip_request(b"*2\r\n$6\r\nCREATE\r\n$1\r\n1\r\n");
        assert_eq!(params, vec![Param::Str("CREATE".into()), Param::Str("1".into())]);
    }

    #[test]
    fn top_level_string_is_simple_string() {
        let mut out = Vec::new();
        {
            let mut codec = RespCodec::new(Cursor::new(&mut out));
            codec.write_reply(&Reply::from("OK")).unwrap();
        }
        assert_eq!(out, b"+OK\r\n");
    }

    #[test]
    fn nested_string_is_bulk_string() {
        let mut out = Vec::new();
        {
            let mut codec = RespCodec::new(Cursor::new(&mut out));
            codec
                .write_reply(&Reply::List(vec![Reply::from("a"), Reply::from("b")]))
                .unwrap();
        }
        assert_eq!(out, b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");
    }

    #[test]
    fn map_is_flat_alternating_array() {
        let mut out = Vec::new();
        {
            let mut codec = RespCodec::new(Cursor::new(&mut out));
            codec
                .write_reply(&Reply::Map(vec![("id".to_string(), Reply::Int(1))]))
                .unwrap();
        }
        assert_eq!(out, b"*2\r\n$2\r\nid\r\n:1\r\n");
    }

    #[test]
    fn error_reply_uses_dash_prefix() {
        let mut out = Vec::new();
        {
            let mut codec = RespCodec::new(Cursor::new(&mut out));
            codec.write_error("boom").unwrap();
        }
        assert_eq!(out, b"-boom\r\n");
    }
}
