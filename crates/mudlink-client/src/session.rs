//! A session: one world, optionally one character, one transport at a time.
//!
//! `SessionConnection` is driven entirely by its owner. Background transport
//! tasks post `Dispatch` values into the engine inbox and the owner feeds
//! them back through `handle_dispatch`, so session state is only ever
//! mutated from one place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use mudlink_core::error::{MudError, MudResult};
use mudlink_core::events::{BusEvent, EventBus, MessageEvent};
use mudlink_core::model::{Character, ConnectionState, SessionId, World};
use mudlink_core::ring_buffer::RingBuffer;

use crate::session_log::SessionLog;
use crate::settings::EngineSettings;
use crate::transport::{
    Dialer, Dispatch, Endpoint, Inbound, Inbox, TransportKind, TransportOutcome,
    TransportSession, TransportState,
};

/// What every session of one engine shares.
#[derive(Clone)]
pub struct EngineContext {
    pub settings: EngineSettings,
    pub dialer: Arc<dyn Dialer>,
    pub bus: EventBus,
    inbox: Inbox,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("settings", &self.settings)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Build a context and the receiving end of its inbox.
    pub fn new(
        settings: EngineSettings,
        dialer: Arc<dyn Dialer>,
        bus: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<Dispatch>) {
        let (inbox, rx) = mpsc::unbounded_channel();
        (
            Self {
                settings,
                dialer,
                bus,
                inbox,
            },
            rx,
        )
    }
}

/// A logical session bound to a world.
#[derive(Debug)]
pub struct SessionConnection {
    id: SessionId,
    world: World,
    character: Option<Character>,
    secret: Option<String>,
    guest: bool,
    needs_character_creation: bool,
    state: ConnectionState,
    output: RingBuffer,
    change_count: u64,
    bytes_received: u64,
    last_activity: DateTime<Utc>,
    log: Option<SessionLog>,
    transport: Option<TransportSession>,
    generation: u64,
    login_sent: bool,
    ctx: EngineContext,
}

impl SessionConnection {
    fn build(ctx: EngineContext, world: World, character: Option<Character>) -> Self {
        Self {
            id: SessionId::generate(),
            world,
            character,
            secret: None,
            guest: false,
            needs_character_creation: false,
            state: ConnectionState::Disconnected,
            output: RingBuffer::new(ctx.settings.scrollback_bytes),
            change_count: 0,
            bytes_received: 0,
            last_activity: Utc::now(),
            log: None,
            transport: None,
            generation: 0,
            login_sent: false,
            ctx,
        }
    }

    /// Session for a known character. `secret` comes from the credential store.
    pub fn for_character(
        ctx: EngineContext,
        character: Character,
        world: World,
        secret: Option<String>,
    ) -> Self {
        let mut session = Self::build(ctx, world, Some(character));
        session.secret = secret;
        session
    }

    /// Anonymous session. Never logs in.
    pub fn guest(ctx: EngineContext, world: World) -> Self {
        let mut session = Self::build(ctx, world, None);
        session.guest = true;
        session
    }

    /// Session whose character will be created in-world after connecting.
    pub fn without_character(ctx: EngineContext, world: World) -> Self {
        let mut session = Self::build(ctx, world, None);
        session.needs_character_creation = true;
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn is_guest(&self) -> bool {
        self.guest
    }

    pub fn needs_character_creation(&self) -> bool {
        self.needs_character_creation
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn output(&self) -> &RingBuffer {
        &self.output
    }

    pub fn output_text(&self) -> String {
        self.output.full_text()
    }

    /// Bumped on every output mutation; renderers compare it to decide redraws.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Total bytes ever ingested, including text since trimmed away.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn is_logging(&self) -> bool {
        self.log.is_some()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(SessionLog::path)
    }

    pub fn transport_state(&self) -> Option<TransportState> {
        self.transport.as_ref().map(TransportSession::state)
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport.as_ref().and_then(TransportSession::active_kind)
    }

    /// Generation of the current transport (0 before the first connect).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn display_label(&self) -> String {
        match (&self.character, self.guest) {
            (Some(c), _) => format!("{}@{}", c.name, self.world.name),
            (None, true) => format!("Guest@{}", self.world.name),
            (None, false) => self.world.name.clone(),
        }
    }

    /// Start a fresh transport. Only acts from `Disconnected`.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!(session = %self.id, state = %self.state, "connect ignored");
            return;
        }

        // Any previous transport is closed; replacing it drops it.
        self.generation += 1;
        self.login_sent = false;
        let inbound = Inbound::new(self.ctx.inbox.clone(), self.id.clone(), self.generation);
        let mut transport = TransportSession::new(
            Endpoint::from(&self.world),
            self.ctx.settings.clone(),
            Arc::clone(&self.ctx.dialer),
            inbound,
        );
        tracing::info!(
            session = %self.id,
            host = %self.world.hostname,
            port = self.world.port,
            generation = self.generation,
            "connecting"
        );
        transport.connect();
        self.transport = Some(transport);
        self.set_state(ConnectionState::Connecting);
    }

    /// Route one inbox item. Returns true if anything observable changed.
    pub fn handle_dispatch(&mut self, dispatch: Dispatch) -> bool {
        if dispatch.session != self.id {
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        if dispatch.generation != self.generation {
            tracing::debug!(
                session = %self.id,
                stale = dispatch.generation,
                current = self.generation,
                "dropping stale transport event"
            );
            return false;
        }

        match transport.handle(dispatch.event) {
            TransportOutcome::Ready(kind) => {
                tracing::info!(session = %self.id, transport = %kind, "connected");
                self.set_state(ConnectionState::Connected);
                self.auto_login();
                true
            }
            TransportOutcome::FallbackScheduled => {
                tracing::info!(session = %self.id, "primary transport timed out, falling back");
                false
            }
            TransportOutcome::Data(text) => {
                self.append_to_output(&text);
                true
            }
            TransportOutcome::Closed(reason) => {
                tracing::info!(session = %self.id, %reason, "disconnected");
                self.set_state(ConnectionState::Disconnected);
                true
            }
            TransportOutcome::Ignored => false,
        }
    }

    /// Send a command line. No-op unless connected.
    pub fn send_command(&mut self, text: &str) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        let Some(transport) = self.transport.as_ref() else {
            return false;
        };
        let sent = transport.send(text);
        self.last_activity = Utc::now();
        sent
    }

    /// Ingest received text: scrollback, log, then the bus.
    pub fn append_to_output(&mut self, text: &str) {
        self.output.append(text);
        self.change_count += 1;
        self.bytes_received += text.len() as u64;
        self.last_activity = Utc::now();

        if let Some(log) = &self.log {
            log.write(text);
        }

        if text.trim().is_empty() {
            return;
        }
        self.ctx.bus.publish(BusEvent::NewMessage(MessageEvent {
            session_label: self.display_label(),
            session_id: self.id.clone(),
            message: text.to_string(),
        }));
    }

    /// Tear everything down. Safe from any state, safe to repeat.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect();
        }
        if let Some(mut log) = self.log.take() {
            log.close();
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Open a log at `path`, replacing any log already open.
    pub fn start_logging(&mut self, path: impl Into<PathBuf>) -> MudResult<PathBuf> {
        let _ = self.stop_logging();
        let log = SessionLog::open(path, &self.display_label())?;
        let path = log.path().to_path_buf();
        tracing::info!(session = %self.id, path = %path.display(), "logging started");
        self.log = Some(log);
        Ok(path)
    }

    /// Close the current log. The returned handle can be awaited with
    /// `SessionLog::finish` to wait for pending writes.
    pub fn stop_logging(&mut self) -> Option<SessionLog> {
        let mut log = self.log.take()?;
        log.close();
        tracing::info!(session = %self.id, path = %log.path().display(), "logging stopped");
        Some(log)
    }

    /// Bind a character created after connecting.
    pub fn assign_character(
        &mut self,
        character: Character,
        secret: Option<String>,
    ) -> MudResult<()> {
        if character.world_id != self.world.id {
            return Err(MudError::InvalidInput(format!(
                "character {} belongs to another world",
                character.name
            )));
        }
        self.character = Some(character);
        self.secret = secret;
        self.guest = false;
        self.needs_character_creation = false;
        Ok(())
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
        self.change_count += 1;
    }

    fn auto_login(&mut self) {
        if self.guest || self.login_sent {
            return;
        }
        let (Some(character), Some(secret)) = (&self.character, &self.secret) else {
            return;
        };
        if character.name.is_empty() || secret.is_empty() {
            return;
        }
        let command = self.ctx.settings.login_command(&character.name, secret);
        self.login_sent = true;
        if let Some(transport) = &self.transport {
            if transport.send(&command) {
                tracing::debug!(session = %self.id, character = %character.name, "auto-login sent");
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.ctx.bus.publish(BusEvent::StateChanged {
            session: self.id.clone(),
            state,
        });
    }
}
