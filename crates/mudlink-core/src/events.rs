//! In-process publish/subscribe bus for session events.
//!
//! Sessions publish here; notification and badge logic subscribe. The bus
//! handle is cheap to clone and every clone shares the same subscribers and
//! history.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::model::{ConnectionState, SessionId};

/// Text received by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    pub session_label: String,
    pub session_id: SessionId,
    pub message: String,
}

/// An event published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    NewMessage(MessageEvent),
    StateChanged {
        session: SessionId,
        state: ConnectionState,
    },
}

/// Subscription handle returned by `subscribe*`.
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn(&BusEvent) + Send + Sync>;

struct Inner {
    callbacks: Vec<(SubscriptionId, Callback)>,
    channels: Vec<(SubscriptionId, mpsc::UnboundedSender<BusEvent>)>,
    history: VecDeque<BusEvent>,
    history_limit: usize,
    next_sub_id: SubscriptionId,
}

/// Shared event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EventBus")
            .field("callbacks", &inner.callbacks.len())
            .field("channels", &inner.channels.len())
            .field("history", &inner.history.len())
            .finish()
    }
}

impl EventBus {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                callbacks: Vec::new(),
                channels: Vec::new(),
                history: VecDeque::new(),
                history_limit,
                next_sub_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a callback invoked synchronously on every publish.
    pub fn subscribe(&self, callback: Box<dyn Fn(&BusEvent) + Send + Sync>) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_sub_id;
        inner.next_sub_id += 1;
        inner.callbacks.push((id, Arc::from(callback)));
        id
    }

    /// Register an async receiver. Dropping the receiver ends the subscription.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<BusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_sub_id;
        inner.next_sub_id += 1;
        inner.channels.push((id, tx));
        (id, rx)
    }

    /// Remove a subscription. Returns true if it existed.
    pub fn unsubscribe(&self, sub_id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.callbacks.len() + inner.channels.len();
        inner.callbacks.retain(|(id, _)| *id != sub_id);
        inner.channels.retain(|(id, _)| *id != sub_id);
        inner.callbacks.len() + inner.channels.len() < before
    }

    /// Deliver an event to every subscriber and record it in history.
    pub fn publish(&self, event: BusEvent) {
        let callbacks: Vec<Callback> = {
            let mut inner = self.lock();
            inner.channels.retain(|(_, tx)| tx.send(event.clone()).is_ok());

            inner.history.push_back(event.clone());
            while inner.history.len() > inner.history_limit {
                inner.history.pop_front();
            }

            inner.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        // Invoked outside the lock so a callback may publish or subscribe.
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Snapshot of retained events, oldest first.
    pub fn history(&self) -> Vec<BusEvent> {
        self.lock().history.iter().cloned().collect()
    }

    /// Retained `NewMessage` events only.
    pub fn messages(&self) -> Vec<MessageEvent> {
        self.lock()
            .history
            .iter()
            .filter_map(|e| match e {
                BusEvent::NewMessage(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.lock();
        inner.callbacks.len() + inner.channels.len()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
