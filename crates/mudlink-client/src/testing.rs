//! Test doubles shared by the unit tests in this crate.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mudlink_core::error::{MudError, MudResult};

use crate::transport::{AnyTransport, Dialer, Dispatch, Endpoint, NetDialer, TransportKind};

/// What a scripted dial attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Timeout,
    Refuse,
    /// Dial for real.
    Connect,
}

/// Dialer that follows a fixed script per strategy and records every attempt.
#[derive(Debug)]
pub struct ScriptedDialer {
    primary: Step,
    alternate: Step,
    attempts: Mutex<Vec<TransportKind>>,
}

impl ScriptedDialer {
    pub fn new(primary: Step, alternate: Step) -> Arc<Self> {
        Arc::new(Self {
            primary,
            alternate,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> Vec<TransportKind> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Dialer for ScriptedDialer {
    fn dial<'a>(
        &'a self,
        kind: TransportKind,
        endpoint: &'a Endpoint,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = MudResult<AnyTransport>> + Send + 'a>> {
        self.attempts.lock().unwrap().push(kind);
        let step = if kind == TransportKind::PRIMARY {
            self.primary
        } else {
            self.alternate
        };
        Box::pin(async move {
            match step {
                Step::Timeout => Err(MudError::Timeout),
                Step::Refuse => Err(MudError::Connect(format!("{endpoint}: refused"))),
                Step::Connect => NetDialer.dial(kind, endpoint, timeout).await,
            }
        })
    }
}

/// A listener on an ephemeral loopback port.
pub async fn loopback() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, Endpoint::new("127.0.0.1", port))
}

/// Next inbox item, failing the test after five seconds.
pub async fn next_dispatch(rx: &mut mpsc::UnboundedReceiver<Dispatch>) -> Dispatch {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for dispatch")
        .expect("inbox closed")
}
