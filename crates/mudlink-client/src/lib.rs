//! mudlink-client: the per-session connection engine.
//!
//! Opens line-oriented TCP sessions to text worlds, falls back from the
//! async stream transport to a raw blocking socket when the first attempt
//! times out, keeps idle connections alive, and accumulates received text in
//! a bounded scrollback while publishing it on the event bus.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mudlink_client::{EngineSettings, NetDialer, SessionRegistry};
//! use mudlink_core::{EventBus, MemoryCredentialStore, MemoryProfileStore, World};
//!
//! # async fn example() {
//! let mut registry = SessionRegistry::new(
//!     EngineSettings::default(),
//!     Arc::new(NetDialer),
//!     EventBus::default(),
//!     Arc::new(MemoryProfileStore::default()),
//!     Arc::new(MemoryCredentialStore::new()),
//! );
//!
//! let id = registry.add_guest_connection(World::new("Discworld", "discworld.starturtle.net", 4242));
//! while let Some(changed) = registry.next_dispatch().await {
//!     if let Some(session) = registry.session(&changed) {
//!         print!("{}", session.output_text());
//!     }
//!     # break;
//! }
//! registry.remove_connection(&id);
//! # }
//! ```

pub mod credentials;
pub mod keepalive;
pub mod profile_store;
pub mod registry;
pub mod session;
pub mod session_log;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export primary public types.
pub use credentials::FileCredentialStore;
pub use keepalive::{KeepAliveTimer, SystemClock, WallClock};
pub use profile_store::JsonProfileStore;
pub use registry::SessionRegistry;
pub use session::{EngineContext, SessionConnection};
pub use session_log::{default_log_path, SessionLog};
pub use settings::EngineSettings;
pub use transport::{
    AnyTransport, CloseReason, Dialer, Dispatch, Endpoint, NetDialer, TransportKind,
    TransportOutcome, TransportSession, TransportState,
};

// Re-export mudlink-core error types for convenience.
pub use mudlink_core::{MudError, MudResult};
