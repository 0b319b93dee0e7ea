//! `mudlink connect <host>` — ad-hoc guest session.
//!
//! A configured world with the same address lends its name to the session
//! label; otherwise the host name is used.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use mudlink_client::SessionRegistry;
use mudlink_core::World;

use super::console;

pub async fn run(
    mut registry: SessionRegistry,
    host: &str,
    port: u16,
    log: Option<PathBuf>,
    logs_dir: &Path,
) -> Result<()> {
    let world = registry
        .profile()
        .worlds
        .iter()
        .find(|w| w.hostname == host && w.port == port)
        .cloned()
        .unwrap_or_else(|| World::new(host, host, port));
    info!(host = %host, port, world = %world.name, "connecting as guest");

    let id = registry.add_guest_connection(world);
    if let Some(path) = log {
        if let Some(session) = registry.session_mut(&id) {
            let path = session
                .start_logging(&path)
                .with_context(|| format!("failed to open log {}", path.display()))?;
            eprintln!("logging to {}", path.display());
        }
    }

    console::run(registry, logs_dir).await
}
