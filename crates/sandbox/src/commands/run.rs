//! Run arena episodes against the live runtime.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use intelligence_core::RoomTable;
use intelligence_runtime::IntelligenceRuntime;

use super::print_json;
use crate::arena::{Arena, ArenaReport, ArenaSettings};

/// Simulate episodes and let the monsters learn
#[derive(Parser, Debug)]
pub struct Run {
    /// Number of episodes
    #[arg(short, long, default_value_t = 10)]
    pub episodes: u32,

    /// Ticks per episode
    #[arg(short, long, default_value_t = 100)]
    pub ticks: u64,

    /// Species to spawn (comma separated)
    #[arg(short, long, value_delimiter = ',', default_value = "goblin,orc")]
    pub species: Vec<String>,

    /// Monsters spawned per species
    #[arg(long, default_value_t = 3)]
    pub per_species: u32,

    /// Room type the arena takes place in
    #[arg(long, default_value = "armory")]
    pub room: String,
}

impl Run {
    pub async fn execute(
        self,
        runtime: Arc<IntelligenceRuntime>,
        rooms: RoomTable,
        json: bool,
    ) -> Result<()> {
        if self.species.is_empty() || self.per_species == 0 {
            bail!("at least one monster must be spawned");
        }
        // reject bad rooms before any episode starts
        rooms.categorize(&self.room)?;

        let settings = ArenaSettings {
            episodes: self.episodes,
            ticks: self.ticks,
            species: self.species,
            per_species: self.per_species,
            room: self.room,
            seed: runtime.config().engine.game_seed,
        };
        let report = Arena::new(runtime, settings, rooms).run().await?;

        if json {
            print_json(&report)
        } else {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &ArenaReport) {
    println!("seed {}", report.seed);
    println!(
        "{:>7} {:>9} {:>8} {:>10} {:>6} {:>6} {:>12}",
        "episode", "decisions", "explored", "overridden", "deaths", "kills", "reward"
    );
    for episode in &report.episodes {
        println!(
            "{:>7} {:>9} {:>8} {:>10} {:>6} {:>6} {:>12.1}",
            episode.episode,
            episode.decisions,
            episode.explored,
            episode.overridden,
            episode.deaths,
            episode.threat_kills,
            episode.total_reward,
        );
    }

    println!();
    for summary in &report.species {
        println!(
            "{:<10} generation {:>3}  steps {:>6}  ε {:.3}  q [{:.2}, {:.2}]",
            summary.species,
            summary.generation,
            summary.total_learning_steps,
            summary.exploration_rate,
            summary.min_q,
            summary.max_q,
        );
    }
}
