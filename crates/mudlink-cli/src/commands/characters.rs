//! `mudlink characters` / `character-add` / `character-rm` / `autoconnect`.
//!
//! Secrets are prompted for and handed straight to the credential store;
//! they are never echoed or written to the profile.

use anyhow::{Context, Result};
use dialoguer::Password;

use mudlink_client::SessionRegistry;
use mudlink_core::{Character, CharacterId};

/// Print configured characters.
pub fn run_list(registry: &SessionRegistry) -> Result<()> {
    let profile = registry.profile();
    if profile.characters.is_empty() {
        println!("No characters configured. Run `mudlink character-add <world> <name>`.");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<6} {}", "NAME", "WORLD", "FAV", "AUTOCONNECT");
    println!(
        "{:<20} {:<20} {:<6} {}",
        "\u{2500}\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}"
    );

    for c in &profile.characters {
        let world = profile
            .world(&c.world_id)
            .map(|w| w.name.as_str())
            .unwrap_or("?");
        let fav = if c.favorite { "yes" } else { "" };
        let auto = if profile.auto_connect.contains(&c.id) { "on" } else { "" };
        println!("{:<20} {:<20} {:<6} {}", c.name, world, fav, auto);
    }

    println!("\n{} character(s).", profile.characters.len());
    Ok(())
}

pub fn run_add(registry: &mut SessionRegistry, world_key: &str, name: &str) -> Result<()> {
    let world_id = registry
        .profile()
        .world_by_key(world_key)
        .map(|w| w.id.clone())
        .with_context(|| format!("no world named '{world_key}'"))?;

    let secret = Password::new()
        .with_prompt(format!("Password for {name} (empty for none)"))
        .allow_empty_password(true)
        .interact()
        .context("failed to read password")?;

    registry
        .add_character(Character::new(name, world_id), Some(&secret))
        .with_context(|| format!("failed to add character '{name}'"))?;
    println!("Added character '{name}' on '{world_key}'.");
    Ok(())
}

pub fn run_remove(registry: &mut SessionRegistry, key: &str) -> Result<()> {
    let id = character_id(registry, key)?;
    let character = registry
        .remove_character(&id)
        .with_context(|| format!("failed to remove character '{key}'"))?;
    println!("Removed character '{}'.", character.name);
    Ok(())
}

pub fn run_autoconnect(registry: &mut SessionRegistry, key: &str, enabled: bool) -> Result<()> {
    let id = character_id(registry, key)?;
    registry
        .set_auto_connect(&id, enabled)
        .context("failed to update auto-connect")?;
    println!("Auto-connect for '{key}' is {}.", if enabled { "on" } else { "off" });
    Ok(())
}

pub(crate) fn character_id(registry: &SessionRegistry, key: &str) -> Result<CharacterId> {
    registry
        .profile()
        .character_by_key(key)
        .map(|c| c.id.clone())
        .with_context(|| format!("no character named '{key}'"))
}
