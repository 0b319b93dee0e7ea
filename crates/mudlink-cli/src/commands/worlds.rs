//! `mudlink worlds` / `world-add` / `world-rm` — manage configured worlds.

use anyhow::{Context, Result};

use mudlink_client::SessionRegistry;
use mudlink_core::World;

/// Print configured worlds.
pub fn run_list(registry: &SessionRegistry) -> Result<()> {
    let profile = registry.profile();
    if profile.worlds.is_empty() {
        println!("No worlds configured. Run `mudlink world-add <name> <host>` to add one.");
        return Ok(());
    }

    println!("{:<20} {:<32} {:<10} {}", "NAME", "ADDRESS", "CHARS", "DESCRIPTION");
    println!(
        "{:<20} {:<32} {:<10} {}",
        "\u{2500}\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}",
        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}"
    );

    for world in &profile.worlds {
        let chars = profile
            .characters
            .iter()
            .filter(|c| c.world_id == world.id)
            .count();
        let marker = if profile.default_world.as_ref() == Some(&world.id) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<20} {:<32} {:<10} {}",
            format!("{}{marker}", world.name),
            world.address(),
            chars,
            world.description
        );
    }

    println!("\n{} world(s).", profile.worlds.len());
    Ok(())
}

pub fn run_add(
    registry: &mut SessionRegistry,
    name: &str,
    host: &str,
    port: u16,
    description: &str,
) -> Result<()> {
    if registry.profile().world_by_key(name).is_some() {
        anyhow::bail!("a world named '{name}' already exists");
    }

    let mut world = World::new(name, host, port);
    world.description = description.to_string();
    let first = registry.profile().worlds.is_empty();
    let id = registry
        .add_world(world)
        .with_context(|| format!("failed to add world '{name}'"))?;
    if first {
        registry
            .set_default_world(Some(id))
            .context("failed to set default world")?;
    }

    println!("Added world '{name}' ({host}:{port}).");
    Ok(())
}

pub fn run_remove(registry: &mut SessionRegistry, key: &str) -> Result<()> {
    let id = registry
        .profile()
        .world_by_key(key)
        .map(|w| w.id.clone())
        .with_context(|| format!("no world named '{key}'"))?;
    let world = registry
        .remove_world(&id)
        .with_context(|| format!("failed to remove world '{key}'"))?;
    println!("Removed world '{}' and its characters.", world.name);
    Ok(())
}
