//! Managed-stream strategy: tokio `TcpStream` with async read and write tasks.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use mudlink_core::codec::Utf8Decoder;
use mudlink_core::error::{MudError, MudResult};

use super::{CloseReason, Endpoint, Inbound, TransportEvent, Writer};

/// Receive buffer size for one read.
const READ_CHUNK: usize = 64 * 1024;

/// A connected async TCP stream.
#[derive(Debug)]
pub struct StreamTransport {
    peer: String,
    /// Read half, handed to the read loop on `start`.
    reader: Option<OwnedReadHalf>,
    outgoing: Option<mpsc::UnboundedSender<Vec<u8>>>,
    write_handle: Option<JoinHandle<()>>,
    read_handle: Option<JoinHandle<()>>,
}

impl StreamTransport {
    /// Resolve and connect within `timeout`.
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> MudResult<Self> {
        let stream = match time::timeout(timeout, Self::open(endpoint)).await {
            Ok(result) => result?,
            Err(_) => return Err(MudError::Timeout),
        };
        tracing::info!(%endpoint, "stream transport connected");
        Ok(Self::from_stream(stream, endpoint.to_string()))
    }

    async fn open(endpoint: &Endpoint) -> MudResult<TcpStream> {
        let addrs: Vec<_> = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| MudError::Resolve(format!("{endpoint}: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(MudError::Resolve(endpoint.to_string()));
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "stream connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if e.kind() == std::io::ErrorKind::TimedOut => MudError::Timeout,
            Some(e) => MudError::Connect(format!("{endpoint}: {e}")),
            None => MudError::Connect(endpoint.to_string()),
        })
    }

    /// Wrap an already connected stream and spawn its writer.
    pub fn from_stream(stream: TcpStream, peer: String) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay failed");
        }
        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let write_handle = tokio::spawn(Self::write_loop(writer, rx, peer.clone()));

        Self {
            peer,
            reader: Some(reader),
            outgoing: Some(tx),
            write_handle: Some(write_handle),
            read_handle: None,
        }
    }

    pub fn start(&mut self, inbound: Inbound) {
        match self.reader.take() {
            Some(reader) => {
                self.read_handle = Some(tokio::spawn(Self::read_loop(reader, inbound)));
            }
            None => tracing::warn!(peer = %self.peer, "stream read loop already started"),
        }
    }

    pub fn writer(&self) -> Option<Writer> {
        self.outgoing.clone().map(Writer::new)
    }

    pub fn close(&mut self) {
        self.outgoing = None;
        if let Some(h) = self.read_handle.take() {
            h.abort();
        }
        if let Some(h) = self.write_handle.take() {
            h.abort();
        }
        self.reader = None;
        tracing::debug!(peer = %self.peer, "stream transport closed");
    }

    async fn read_loop(mut reader: OwnedReadHalf, inbound: Inbound) {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut decoder = Utf8Decoder::new();

        let reason = loop {
            match reader.read(&mut buf).await {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => {
                    let text = decoder.decode(&buf[..n]);
                    if !text.is_empty() && !inbound.post(TransportEvent::Data(text)) {
                        break CloseReason::Local;
                    }
                }
                Err(e) => break CloseReason::ReadError(e.to_string()),
            }
        };

        let tail = decoder.finish();
        if !tail.is_empty() {
            inbound.post(TransportEvent::Data(tail));
        }
        tracing::debug!(session = %inbound.session(), %reason, "stream read loop ended");
        inbound.post(TransportEvent::Closed(reason));
    }

    async fn write_loop(
        mut writer: OwnedWriteHalf,
        mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
        peer: String,
    ) {
        while let Some(bytes) = rx.recv().await {
            if let Err(e) = writer.write_all(&bytes).await {
                // Not escalated: the read loop reports the loss.
                tracing::warn!(%peer, error = %e, "stream write failed");
            }
        }
        let _ = writer.shutdown().await;
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        if let Some(h) = self.read_handle.take() {
            h.abort();
        }
        if let Some(h) = self.write_handle.take() {
            h.abort();
        }
    }
}
