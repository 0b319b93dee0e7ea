//! Transport strategies for reaching a world.
//!
//! Two interchangeable strategies carry the same newline-delimited text:
//! - `Stream` — managed async stream (tokio `TcpStream`), tried first
//! - `Socket` — raw blocking socket on dedicated threads, the fallback
//!
//! Background read loops never touch session state. They post `Dispatch`
//! values into the owner's inbox, tagged with the session id and the
//! generation of the `TransportSession` that spawned them.

pub mod session;
pub mod socket;
pub mod stream;

pub use session::{TransportOutcome, TransportSession, TransportState};
pub use socket::SocketTransport;
pub use stream::StreamTransport;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use mudlink_core::error::{MudError, MudResult};
use mudlink_core::model::{SessionId, World};

/// Which strategy a transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Stream,
    Socket,
}

impl TransportKind {
    /// The strategy tried first.
    pub const PRIMARY: TransportKind = TransportKind::Stream;

    /// The other strategy.
    pub fn alternate(self) -> Self {
        match self {
            TransportKind::Stream => TransportKind::Socket,
            TransportKind::Socket => TransportKind::Stream,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stream => f.write_str("stream"),
            TransportKind::Socket => f.write_str("socket"),
        }
    }
}

/// Remote `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl From<&World> for Endpoint {
    fn from(world: &World) -> Self {
        Self::new(world.hostname.clone(), world.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Why a transport stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Orderly close by the remote side (zero-byte read).
    PeerClosed,
    /// Read failed mid-session.
    ReadError(String),
    /// Neither strategy could connect.
    ConnectFailed(String),
    /// The owner stopped listening.
    Local,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("closed by peer"),
            CloseReason::ReadError(e) => write!(f, "read error: {e}"),
            CloseReason::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            CloseReason::Local => f.write_str("closed locally"),
        }
    }
}

/// Something that happened on a transport, reported by a background task.
#[derive(Debug)]
pub enum TransportEvent {
    /// A strategy connected; the owner installs it.
    Established(AnyTransport),
    /// The primary strategy timed out; the alternate is coming after a delay.
    FallbackScheduled,
    /// Decoded text from the read loop.
    Data(String),
    Closed(CloseReason),
}

/// A transport event addressed to one session's current transport.
#[derive(Debug)]
pub struct Dispatch {
    pub session: SessionId,
    pub generation: u64,
    pub event: TransportEvent,
}

/// Sending side of an owner's inbox.
pub type Inbox = mpsc::UnboundedSender<Dispatch>;

/// Posts events for one transport generation into the owner's inbox.
#[derive(Debug, Clone)]
pub struct Inbound {
    tx: Inbox,
    session: SessionId,
    generation: u64,
}

impl Inbound {
    pub fn new(tx: Inbox, session: SessionId, generation: u64) -> Self {
        Self {
            tx,
            session,
            generation,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Post an event. Returns false once the owner has gone away.
    pub fn post(&self, event: TransportEvent) -> bool {
        self.tx
            .send(Dispatch {
                session: self.session.clone(),
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Handle onto a transport's single write path.
///
/// User commands and keep-alive bytes go through the same queue, so writes
/// to one transport are never concurrent.
#[derive(Debug, Clone)]
pub struct Writer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Writer {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx }
    }

    pub fn send(&self, bytes: Vec<u8>) -> MudResult<()> {
        self.tx.send(bytes).map_err(|_| MudError::Closed)
    }
}

/// Enum-dispatched transport, so the session can swap strategies on
/// fallback without branching on a kind flag everywhere.
#[derive(Debug)]
pub enum AnyTransport {
    Stream(StreamTransport),
    Socket(SocketTransport),
}

impl AnyTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stream(_) => TransportKind::Stream,
            Self::Socket(_) => TransportKind::Socket,
        }
    }

    /// Start the read loop. Each decoded chunk is posted as `Data`; the loop
    /// ends with a single `Closed`.
    pub fn start(&mut self, inbound: Inbound) {
        match self {
            Self::Stream(t) => t.start(inbound),
            Self::Socket(t) => t.start(inbound),
        }
    }

    pub fn writer(&self) -> Option<Writer> {
        match self {
            Self::Stream(t) => t.writer(),
            Self::Socket(t) => t.writer(),
        }
    }

    /// Queue raw bytes for writing. Failures of the write itself are logged
    /// by the writer; only a closed queue is reported here.
    pub fn send(&self, bytes: Vec<u8>) -> MudResult<()> {
        self.writer().ok_or(MudError::Closed)?.send(bytes)
    }

    /// Stop the read loop and release the connection.
    pub fn close(&mut self) {
        match self {
            Self::Stream(t) => t.close(),
            Self::Socket(t) => t.close(),
        }
    }
}

/// Produces connected transports.
pub trait Dialer: Send + Sync {
    fn dial<'a>(
        &'a self,
        kind: TransportKind,
        endpoint: &'a Endpoint,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = MudResult<AnyTransport>> + Send + 'a>>;
}

/// Dials real TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetDialer;

impl Dialer for NetDialer {
    fn dial<'a>(
        &'a self,
        kind: TransportKind,
        endpoint: &'a Endpoint,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = MudResult<AnyTransport>> + Send + 'a>> {
        Box::pin(async move {
            match kind {
                TransportKind::Stream => StreamTransport::connect(endpoint, timeout)
                    .await
                    .map(AnyTransport::Stream),
                TransportKind::Socket => {
                    let endpoint = endpoint.clone();
                    tokio::task::spawn_blocking(move || SocketTransport::connect(&endpoint, timeout))
                        .await
                        .map_err(|e| MudError::Other(format!("socket dial task failed: {e}")))?
                        .map(AnyTransport::Socket)
                }
            }
        })
    }
}
