//! Monster intelligence sandbox
//!
//! Drives the learning runtime from the command line: run arena episodes,
//! inspect what each species has learned, and reset knowledge.
//! Run with: `cargo run -p monster-sandbox -- <command>`

mod arena;
mod combat;
mod commands;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Inspect, Profiles, Reset, Run};
use intelligence_core::RoomTable;
use intelligence_runtime::{IntelligenceRuntime, ProfileRegistry, RuntimeConfig};

/// Monster intelligence sandbox
#[derive(Parser)]
#[command(name = "monster-sandbox")]
#[command(about = "Train and inspect monster intelligence", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RON file with species profiles
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    /// Directory holding species knowledge
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Exploration seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Reject room types that are not registered
    #[arg(long, global = true)]
    strict_rooms: bool,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Simulate arena episodes
    Run(Run),

    /// Inspect learned knowledge
    Inspect(Inspect),

    /// Reset learned knowledge
    Reset(Reset),

    /// List species profiles
    Profiles(Profiles),
}

impl Cli {
    fn runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::from_toml_file(path)?,
            None => RuntimeConfig::from_env()?,
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(seed) = self.seed {
            config.engine.game_seed = seed;
        }
        Ok(config)
    }

    fn rooms(&self) -> RoomTable {
        if self.strict_rooms {
            RoomTable::strict()
        } else {
            RoomTable::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (for MONSTER_AI_* and RUST_LOG)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.log_dir.as_deref())?;

    let config = cli.runtime_config()?;
    let rooms = cli.rooms();
    let mut builder = IntelligenceRuntime::builder()
        .config(config)
        .rooms(rooms.clone());
    if let Some(path) = &cli.profiles {
        builder = builder.profiles(ProfileRegistry::load(path)?);
    }
    let runtime = Arc::new(builder.build().await?);

    let outcome = match cli.command {
        Command::Run(cmd) => cmd.execute(Arc::clone(&runtime), rooms, cli.json).await,
        Command::Inspect(cmd) => cmd.execute(&runtime, cli.json).await,
        Command::Reset(cmd) => cmd.execute(&runtime).await,
        Command::Profiles(cmd) => cmd.execute(&runtime, cli.json),
    };

    // flush knowledge even when the command failed
    let runtime = Arc::into_inner(runtime).context("runtime still shared at exit")?;
    runtime.shutdown().await?;
    outcome
}
