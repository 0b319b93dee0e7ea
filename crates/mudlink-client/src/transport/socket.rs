//! Raw-socket strategy: a blocking `std::net::TcpStream` driven by one
//! dedicated reader thread and one writer thread per connection.
//!
//! Closing shuts the descriptor down, which makes the blocking read return
//! and the reader thread exit.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;

use mudlink_core::codec::Utf8Decoder;
use mudlink_core::error::{MudError, MudResult};

use super::{CloseReason, Endpoint, Inbound, TransportEvent, Writer};

/// Blocking read size.
const READ_CHUNK: usize = 4 * 1024;

/// Back-off when a read reports would-block.
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(50);

/// A connected blocking socket.
#[derive(Debug)]
pub struct SocketTransport {
    peer: String,
    stream: TcpStream,
    outgoing: Option<mpsc::UnboundedSender<Vec<u8>>>,
    started: bool,
    closed: bool,
}

impl SocketTransport {
    /// Resolve and connect, blocking the calling thread. Run it on a
    /// blocking worker.
    pub fn connect(endpoint: &Endpoint, timeout: Duration) -> MudResult<Self> {
        let addrs: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| MudError::Resolve(format!("{endpoint}: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(MudError::Resolve(endpoint.to_string()));
        }

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    tracing::info!(%endpoint, %addr, "socket transport connected");
                    return Self::from_stream(stream, endpoint.to_string());
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "socket connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                MudError::Timeout
            }
            Some(e) => MudError::Connect(format!("{endpoint}: {e}")),
            None => MudError::Connect(endpoint.to_string()),
        })
    }

    /// Wrap a connected blocking stream and spawn its writer thread.
    pub fn from_stream(stream: TcpStream, peer: String) -> MudResult<Self> {
        stream.set_nonblocking(false)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay failed");
        }

        let mut write_half = stream.try_clone()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let writer_peer = peer.clone();
        thread::Builder::new()
            .name("mudlink-socket-writer".into())
            .spawn(move || {
                while let Some(bytes) = rx.blocking_recv() {
                    if let Err(e) = write_half.write_all(&bytes).and_then(|()| write_half.flush()) {
                        // Not escalated: the read loop reports the loss.
                        tracing::warn!(peer = %writer_peer, error = %e, "socket write failed");
                    }
                }
            })?;

        Ok(Self {
            peer,
            stream,
            outgoing: Some(tx),
            started: false,
            closed: false,
        })
    }

    pub fn start(&mut self, inbound: Inbound) {
        if self.started {
            tracing::warn!(peer = %self.peer, "socket read loop already started");
            return;
        }
        self.started = true;

        let reader = match self.stream.try_clone() {
            Ok(r) => r,
            Err(e) => {
                inbound.post(TransportEvent::Closed(CloseReason::ReadError(e.to_string())));
                return;
            }
        };

        let spawned = thread::Builder::new()
            .name("mudlink-socket-reader".into())
            .spawn({
                let inbound = inbound.clone();
                move || Self::read_loop(reader, inbound)
            });
        if let Err(e) = spawned {
            inbound.post(TransportEvent::Closed(CloseReason::ReadError(e.to_string())));
        }
    }

    pub fn writer(&self) -> Option<Writer> {
        self.outgoing.clone().map(Writer::new)
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.outgoing = None;
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            tracing::debug!(peer = %self.peer, error = %e, "socket shutdown");
        }
        tracing::debug!(peer = %self.peer, "socket transport closed");
    }

    fn read_loop(mut reader: TcpStream, inbound: Inbound) {
        let mut buf = [0u8; READ_CHUNK];
        let mut decoder = Utf8Decoder::new();

        let reason = loop {
            match reader.read(&mut buf) {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => {
                    let text = decoder.decode(&buf[..n]);
                    if !text.is_empty() && !inbound.post(TransportEvent::Data(text)) {
                        break CloseReason::Local;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(WOULD_BLOCK_BACKOFF),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => break CloseReason::ReadError(e.to_string()),
            }
        };

        let tail = decoder.finish();
        if !tail.is_empty() {
            inbound.post(TransportEvent::Data(tail));
        }
        tracing::debug!(session = %inbound.session(), %reason, "socket read loop ended");
        inbound.post(TransportEvent::Closed(reason));
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
