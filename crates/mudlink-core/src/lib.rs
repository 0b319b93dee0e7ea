//! mudlink-core: shared building blocks for the mudlink client.
//!
//! Provides the error taxonomy, the persisted entity model, the bounded
//! line-aware scrollback buffer, the streaming text codec, the session event
//! bus, and the storage traits the engine is written against.

pub mod codec;
pub mod error;
pub mod events;
pub mod model;
pub mod ring_buffer;
pub mod store;

// Re-export commonly used items at crate root.
pub use codec::{encode_line, Utf8Decoder, KEEPALIVE_BYTE};
pub use error::{MudError, MudResult};
pub use events::{BusEvent, EventBus, MessageEvent, SubscriptionId};
pub use model::{
    Character, CharacterId, ConnectionState, HighlightRule, Profile, SessionId, World, WorldId,
    DEFAULT_PORT,
};
pub use ring_buffer::RingBuffer;
pub use store::{
    decode_profile, CredentialStore, MemoryCredentialStore, MemoryProfileStore, ProfileStore,
};
