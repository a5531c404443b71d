//! Graphite's plaintext protocol: one `<name> <value> <timestamp>\n` line per
//! value, written over a TCP connection that lives for one report cycle.

use async_trait::async_trait;
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    net::TcpStream,
};

use super::Sender;
use crate::{error::TransportError, metrics::MetricKind};

pub struct GraphiteSender {
    addr: String,
    connection: Option<BufWriter<TcpStream>>,
    line: String,
}

impl GraphiteSender {
    /// `addr` is anything [`TcpStream::connect`] resolves, e.g.
    /// `"graphite.internal:2003"`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connection: None,
            line: String::with_capacity(128),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Sender for GraphiteSender {
    async fn connect(&mut self) -> Result<(), TransportError> {
        // A connection left over from a cycle that never closed is dropped.
        self.connection = None;
        let stream = TcpStream::connect(self.addr.as_str()).await?;
        stream.set_nodelay(true)?;
        self.connection = Some(BufWriter::new(stream));
        Ok(())
    }

    async fn send(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        _kind: MetricKind,
    ) -> Result<(), TransportError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(TransportError::NotConnected)?;
        self.line.clear();
        format_line(&mut self.line, name, value, timestamp);
        connection.write_all(self.line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut connection) = self.connection.take() {
            connection.flush().await?;
            connection.shutdown().await?;
        }
        Ok(())
    }
}

/// Graphite splits lines on whitespace, so any inside the name becomes `-`.
fn format_line(buf: &mut String, name: &str, value: &str, timestamp: u64) {
    buf.extend(name.chars().map(|c| if c.is_whitespace() { '-' } else { c }));
    buf.push(' ');
    buf.push_str(value);
    buf.push(' ');
    buf.push_str(&timestamp.to_string());
    buf.push('\n');
}
