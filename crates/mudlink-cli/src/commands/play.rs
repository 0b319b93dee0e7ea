//! `mudlink play [<character>]` — open one character's session, or every
//! character flagged for auto-connect, then go interactive.

use std::path::Path;

use anyhow::{Context, Result};

use mudlink_client::SessionRegistry;

use super::{characters, console};

pub async fn run(
    mut registry: SessionRegistry,
    character: Option<&str>,
    logs_dir: &Path,
) -> Result<()> {
    match character {
        Some(key) => {
            let id = characters::character_id(&registry, key)?;
            registry
                .connect_character(&id)
                .with_context(|| format!("cannot connect '{key}'"))?;
        }
        None => {
            let opened = registry.auto_connect_characters();
            if opened.is_empty() {
                anyhow::bail!(
                    "no characters are set to auto-connect; \
                     use `mudlink autoconnect <character> on` or `mudlink play <character>`"
                );
            }
            eprintln!("auto-connecting {} session(s)", opened.len());
        }
    }

    console::run(registry, logs_dir).await
}
