//! mudlink — line-mode client for MUD-style text worlds.
//!
//! Manages worlds and characters, opens sessions with auto-login and
//! transport fallback, and runs an interactive console over stdin/stdout.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use mudlink_core::DEFAULT_PORT;

/// mudlink — MUD client
#[derive(Parser)]
#[command(name = "mudlink", version, about = "Line-mode client for MUD-style text worlds")]
struct Cli {
    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Profile file path (overrides the config file)
    #[arg(long = "profile", global = true)]
    profile: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a guest session to a host
    Connect {
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Log received text to this file
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// List configured worlds
    Worlds,

    /// Add a world
    WorldAdd {
        name: String,
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Remove a world and its characters
    WorldRm {
        /// World name or id
        world: String,
    },

    /// List configured characters
    Characters,

    /// Add a character (prompts for the password)
    CharacterAdd {
        /// World name or id
        world: String,
        name: String,
    },

    /// Remove a character
    CharacterRm {
        /// Character name or id
        character: String,
    },

    /// Turn auto-connect on or off for a character
    Autoconnect {
        character: String,
        #[arg(value_enum)]
        mode: Toggle,
    },

    /// Connect a character, or all auto-connect characters, and go interactive
    Play {
        character: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries world text only.
    let default_filter = if cli.verbose {
        "mudlink=debug,mudlink_cli=debug,mudlink_client=debug,mudlink_core=debug"
    } else {
        "mudlink=warn,mudlink_cli=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("mudlink: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_path()?,
    };
    let cfg = config::Config::load(&config_path)?;

    let home = dirs::home_dir().context("cannot determine home directory")?;
    let mut paths = cfg.paths.resolve(&home);
    if let Some(profile) = cli.profile {
        paths.profile = profile;
    }

    let mut registry = commands::open_registry(cfg.engine.to_settings(), &paths);

    match cli.command {
        Command::Connect { host, port, log } => {
            commands::connect::run(registry, &host, port, log, &paths.logs).await
        }
        Command::Worlds => commands::worlds::run_list(&registry),
        Command::WorldAdd {
            name,
            host,
            port,
            description,
        } => commands::worlds::run_add(&mut registry, &name, &host, port, &description),
        Command::WorldRm { world } => commands::worlds::run_remove(&mut registry, &world),
        Command::Characters => commands::characters::run_list(&registry),
        Command::CharacterAdd { world, name } => {
            commands::characters::run_add(&mut registry, &world, &name)
        }
        Command::CharacterRm { character } => {
            commands::characters::run_remove(&mut registry, &character)
        }
        Command::Autoconnect { character, mode } => commands::characters::run_autoconnect(
            &mut registry,
            &character,
            matches!(mode, Toggle::On),
        ),
        Command::Play { character } => {
            commands::play::run(registry, character.as_deref(), &paths.logs).await
        }
    }
}
