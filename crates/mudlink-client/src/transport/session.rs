//! One outbound connection and its state machine.
//!
//! ```text
//! Idle --connect--> Connecting --ready--> Ready --close/EOF/error--> Closed
//!                        |                  ^
//!                        | timeout          | alternate ok
//!                        v                  |
//!                      Failed --------------+--alternate fails--> Closed
//! ```
//!
//! A non-timeout connect failure goes straight to `Closed`. `Closed` is
//! terminal; reconnecting builds a new `TransportSession`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time;

use mudlink_core::codec::encode_line;

use super::{
    AnyTransport, CloseReason, Dialer, Endpoint, Inbound, TransportEvent, TransportKind,
};
use crate::keepalive::KeepAliveTimer;
use crate::settings::EngineSettings;

/// Lifecycle of a `TransportSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Ready,
    /// Primary timed out; the alternate attempt is pending.
    Failed,
    Closed,
}

/// What handling a transport event means for the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Ready(TransportKind),
    FallbackScheduled,
    Data(String),
    Closed(CloseReason),
    /// Stale or out-of-state event; nothing changed.
    Ignored,
}

/// Owns exactly one connection attempt and, once ready, one live transport.
pub struct TransportSession {
    endpoint: Endpoint,
    settings: EngineSettings,
    dialer: Arc<dyn Dialer>,
    inbound: Inbound,
    state: TransportState,
    active: Option<AnyTransport>,
    keepalive: Option<KeepAliveTimer>,
    connector: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("generation", &self.inbound.generation())
            .field("active", &self.active_kind())
            .finish()
    }
}

impl TransportSession {
    pub fn new(
        endpoint: Endpoint,
        settings: EngineSettings,
        dialer: Arc<dyn Dialer>,
        inbound: Inbound,
    ) -> Self {
        Self {
            endpoint,
            settings,
            dialer,
            inbound,
            state: TransportState::Idle,
            active: None,
            keepalive: None,
            connector: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn generation(&self) -> u64 {
        self.inbound.generation()
    }

    pub fn active_kind(&self) -> Option<TransportKind> {
        self.active.as_ref().map(AnyTransport::kind)
    }

    pub fn keepalive_armed(&self) -> bool {
        self.keepalive.as_ref().is_some_and(KeepAliveTimer::is_armed)
    }

    /// Begin connecting. Only valid from `Idle`; any other state is a no-op.
    pub fn connect(&mut self) {
        if self.state != TransportState::Idle {
            tracing::debug!(endpoint = %self.endpoint, state = ?self.state, "connect ignored");
            return;
        }
        self.state = TransportState::Connecting;

        let dialer = Arc::clone(&self.dialer);
        let endpoint = self.endpoint.clone();
        let settings = self.settings.clone();
        let inbound = self.inbound.clone();
        self.connector = Some(tokio::spawn(async move {
            run_connector(dialer, endpoint, settings, inbound).await;
        }));
    }

    /// Apply an event posted by this session's background tasks.
    pub fn handle(&mut self, event: TransportEvent) -> TransportOutcome {
        match event {
            TransportEvent::Established(mut transport) => {
                if !matches!(self.state, TransportState::Connecting | TransportState::Failed) {
                    transport.close();
                    return TransportOutcome::Ignored;
                }
                self.connector = None;

                transport.start(self.inbound.clone());
                self.arm_keepalive(&transport);
                let kind = transport.kind();
                self.active = Some(transport);
                self.state = TransportState::Ready;
                tracing::info!(endpoint = %self.endpoint, transport = %kind, "transport ready");
                TransportOutcome::Ready(kind)
            }
            TransportEvent::FallbackScheduled => {
                if self.state != TransportState::Connecting {
                    return TransportOutcome::Ignored;
                }
                self.state = TransportState::Failed;
                TransportOutcome::FallbackScheduled
            }
            TransportEvent::Data(text) => {
                if self.state != TransportState::Ready {
                    return TransportOutcome::Ignored;
                }
                TransportOutcome::Data(text)
            }
            TransportEvent::Closed(reason) => {
                if self.state == TransportState::Closed {
                    return TransportOutcome::Ignored;
                }
                tracing::info!(endpoint = %self.endpoint, %reason, "transport closed");
                self.teardown();
                TransportOutcome::Closed(reason)
            }
        }
    }

    /// Send one line. Returns false when not ready or the write path is gone.
    pub fn send(&self, text: &str) -> bool {
        if self.state != TransportState::Ready {
            return false;
        }
        let Some(transport) = self.active.as_ref() else {
            return false;
        };
        match transport.send(encode_line(text)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "send failed");
                false
            }
        }
    }

    /// Stop everything. Safe from any state and safe to repeat.
    pub fn disconnect(&mut self) {
        if self.state == TransportState::Closed {
            return;
        }
        tracing::debug!(endpoint = %self.endpoint, state = ?self.state, "disconnecting");
        self.teardown();
    }

    fn arm_keepalive(&mut self, transport: &AnyTransport) {
        if let Some(mut old) = self.keepalive.take() {
            old.cancel();
        }
        if self.settings.keepalive_interval.is_zero() {
            return;
        }
        if let Some(writer) = transport.writer() {
            self.keepalive = Some(KeepAliveTimer::arm(self.settings.keepalive_interval, writer));
        }
    }

    fn teardown(&mut self) {
        // Timer first, so nothing is written to a dying handle.
        if let Some(mut keepalive) = self.keepalive.take() {
            keepalive.cancel();
        }
        if let Some(connector) = self.connector.take() {
            connector.abort();
        }
        if let Some(mut transport) = self.active.take() {
            transport.close();
        }
        self.state = TransportState::Closed;
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Primary attempt, then at most one alternate attempt after a timeout.
async fn run_connector(
    dialer: Arc<dyn Dialer>,
    endpoint: Endpoint,
    settings: EngineSettings,
    inbound: Inbound,
) {
    let primary = TransportKind::PRIMARY;
    let err = match dialer.dial(primary, &endpoint, settings.connect_timeout).await {
        Ok(transport) => {
            inbound.post(TransportEvent::Established(transport));
            return;
        }
        Err(e) => e,
    };

    if !err.is_timeout_class() {
        tracing::warn!(%endpoint, transport = %primary, error = %err, "connect failed");
        inbound.post(TransportEvent::Closed(CloseReason::ConnectFailed(err.to_string())));
        return;
    }

    let alternate = primary.alternate();
    tracing::info!(
        %endpoint,
        error = %err,
        delay_ms = settings.fallback_delay.as_millis() as u64,
        fallback = %alternate,
        "primary transport timed out, scheduling fallback"
    );
    if !inbound.post(TransportEvent::FallbackScheduled) {
        return;
    }
    time::sleep(settings.fallback_delay).await;

    match dialer.dial(alternate, &endpoint, settings.connect_timeout).await {
        Ok(transport) => {
            inbound.post(TransportEvent::Established(transport));
        }
        Err(e) => {
            tracing::warn!(%endpoint, transport = %alternate, error = %e, "fallback connect failed");
            inbound.post(TransportEvent::Closed(CloseReason::ConnectFailed(e.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;

    use mudlink_core::model::SessionId;

    use crate::testing::{loopback, next_dispatch, ScriptedDialer, Step};

    fn settings() -> EngineSettings {
        EngineSettings {
            connect_timeout: Duration::from_secs(2),
            fallback_delay: Duration::from_millis(1500),
            ..Default::default()
        }
    }

    fn session_with(
        dialer: Arc<dyn Dialer>,
        endpoint: Endpoint,
        settings: EngineSettings,
    ) -> (TransportSession, mpsc::UnboundedReceiver<super::super::Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inbound = Inbound::new(tx, SessionId::from("s1"), 1);
        (TransportSession::new(endpoint, settings, dialer, inbound), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_exactly_one_fallback_attempt() {
        let dialer = ScriptedDialer::new(Step::Timeout, Step::Refuse);
        let (mut ts, mut rx) = session_with(
            dialer.clone(),
            Endpoint::new("mud.example", 7007),
            settings(),
        );

        ts.connect();
        ts.connect(); // no-op while connecting
        assert_eq!(ts.state(), TransportState::Connecting);

        let d = next_dispatch(&mut rx).await;
        assert_eq!(ts.handle(d.event), TransportOutcome::FallbackScheduled);
        assert_eq!(ts.state(), TransportState::Failed);
        let scheduled_at = time::Instant::now();

        let d = next_dispatch(&mut rx).await;
        assert!(scheduled_at.elapsed() >= Duration::from_millis(1500));
        assert!(matches!(
            ts.handle(d.event),
            TransportOutcome::Closed(CloseReason::ConnectFailed(_))
        ));
        assert_eq!(ts.state(), TransportState::Closed);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(dialer.attempts(), vec![TransportKind::Stream, TransportKind::Socket]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn non_timeout_failure_skips_fallback() {
        let dialer = ScriptedDialer::new(Step::Refuse, Step::Connect);
        let (mut ts, mut rx) = session_with(
            dialer.clone(),
            Endpoint::new("mud.example", 7007),
            settings(),
        );

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        assert!(matches!(ts.handle(d.event), TransportOutcome::Closed(_)));

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(dialer.attempts(), vec![TransportKind::Stream]);
    }

    #[tokio::test]
    async fn fallback_reaches_ready_on_socket_transport() {
        let (listener, endpoint) = loopback().await;
        let dialer = ScriptedDialer::new(Step::Timeout, Step::Connect);
        let (mut ts, mut rx) = session_with(
            dialer.clone(),
            endpoint,
            EngineSettings {
                fallback_delay: Duration::from_millis(20),
                ..settings()
            },
        );

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        assert_eq!(ts.handle(d.event), TransportOutcome::FallbackScheduled);
        let d = next_dispatch(&mut rx).await;
        assert_eq!(ts.handle(d.event), TransportOutcome::Ready(TransportKind::Socket));
        assert_eq!(ts.active_kind(), Some(TransportKind::Socket));
        assert!(ts.keepalive_armed());

        let (mut server, _) = listener.accept().await.unwrap();
        assert!(ts.send("look"));
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"look\n");

        ts.disconnect();
        assert_eq!(ts.state(), TransportState::Closed);
        assert!(!ts.keepalive_armed());
        assert!(!ts.send("look"));

        // The socket was shut down, so the peer sees end of stream.
        let n = tokio::time::timeout(Duration::from_secs(5), server.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn keepalive_writes_a_space_while_ready() {
        let (listener, endpoint) = loopback().await;
        let dialer = ScriptedDialer::new(Step::Connect, Step::Refuse);
        let (mut ts, mut rx) = session_with(
            dialer,
            endpoint,
            EngineSettings {
                keepalive_interval: Duration::from_millis(50),
                ..settings()
            },
        );

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        assert_eq!(ts.handle(d.event), TransportOutcome::Ready(TransportKind::Stream));

        let (mut server, _) = listener.accept().await.unwrap();
        let mut byte = [0u8; 1];
        tokio::time::timeout(Duration::from_secs(5), server.read_exact(&mut byte))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(byte[0], b' ');
        ts.disconnect();
    }

    #[tokio::test]
    async fn peer_close_is_terminal() {
        let (listener, endpoint) = loopback().await;
        let dialer = ScriptedDialer::new(Step::Connect, Step::Refuse);
        let (mut ts, mut rx) = session_with(dialer.clone(), endpoint, settings());

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        assert!(matches!(ts.handle(d.event), TransportOutcome::Ready(_)));

        let (server, _) = listener.accept().await.unwrap();
        drop(server);

        let d = next_dispatch(&mut rx).await;
        assert_eq!(
            ts.handle(d.event),
            TransportOutcome::Closed(CloseReason::PeerClosed)
        );
        assert_eq!(ts.state(), TransportState::Closed);
        assert!(!ts.keepalive_armed());

        ts.connect(); // closed is terminal
        assert_eq!(ts.state(), TransportState::Closed);
        assert_eq!(dialer.attempts().len(), 1);
    }

    #[tokio::test]
    async fn connection_reset_closes_with_read_error() {
        let (listener, endpoint) = loopback().await;
        let dialer = ScriptedDialer::new(Step::Connect, Step::Refuse);
        let (mut ts, mut rx) = session_with(dialer, endpoint, settings());

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        assert!(matches!(ts.handle(d.event), TransportOutcome::Ready(_)));
        assert!(ts.keepalive_armed());

        let (server, _) = listener.accept().await.unwrap();
        // Zero linger turns the close into a reset.
        #[allow(deprecated)]
        server.set_linger(Some(Duration::ZERO)).unwrap();
        drop(server);

        let d = next_dispatch(&mut rx).await;
        assert!(matches!(
            ts.handle(d.event),
            TransportOutcome::Closed(CloseReason::ReadError(_))
        ));
        assert_eq!(ts.state(), TransportState::Closed);
        assert!(!ts.keepalive_armed());
        assert_eq!(ts.active_kind(), None);
        assert!(!ts.send("look"));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_from_any_state() {
        let dialer = ScriptedDialer::new(Step::Refuse, Step::Refuse);
        let (mut idle, _rx) = session_with(
            dialer.clone(),
            Endpoint::new("mud.example", 7007),
            settings(),
        );
        idle.disconnect();
        idle.disconnect();
        assert_eq!(idle.state(), TransportState::Closed);

        let (mut connecting, _rx2) = session_with(
            dialer,
            Endpoint::new("mud.example", 7007),
            settings(),
        );
        connecting.connect();
        connecting.disconnect();
        connecting.disconnect();
        assert_eq!(connecting.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn late_established_after_disconnect_is_closed_not_installed() {
        let (listener, endpoint) = loopback().await;
        let dialer = ScriptedDialer::new(Step::Connect, Step::Refuse);
        let (mut ts, mut rx) = session_with(dialer, endpoint, settings());

        ts.connect();
        let d = next_dispatch(&mut rx).await;
        ts.disconnect();
        assert_eq!(ts.handle(d.event), TransportOutcome::Ignored);
        assert_eq!(ts.active_kind(), None);

        // The server sees the connection go away.
        let (mut server, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1];
        let n = tokio::time::timeout(Duration::from_secs(5), server.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }
}
