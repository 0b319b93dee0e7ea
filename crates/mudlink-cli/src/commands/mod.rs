//! CLI subcommand implementations.

pub mod characters;
pub mod connect;
pub mod console;
pub mod play;
pub mod worlds;

use std::sync::Arc;

use mudlink_client::{
    EngineSettings, FileCredentialStore, JsonProfileStore, NetDialer, SessionRegistry,
};
use mudlink_core::EventBus;

use crate::config::Paths;

/// Registry over the on-disk profile and secret stores.
pub fn open_registry(settings: EngineSettings, paths: &Paths) -> SessionRegistry {
    SessionRegistry::new(
        settings,
        Arc::new(NetDialer),
        EventBus::default(),
        Arc::new(JsonProfileStore::new(&paths.profile)),
        Arc::new(FileCredentialStore::new(&paths.secrets)),
    )
}
