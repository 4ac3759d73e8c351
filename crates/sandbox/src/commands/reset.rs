//! Wipe learned knowledge.

use anyhow::{Result, bail};
use clap::Parser;
use intelligence_runtime::IntelligenceRuntime;
use tracing::info;

/// Reset species knowledge to an untrained table
#[derive(Parser, Debug)]
pub struct Reset {
    /// Species to reset
    pub species: Vec<String>,

    /// Reset every species with recorded knowledge
    #[arg(long, conflicts_with = "species")]
    pub all: bool,
}

impl Reset {
    pub async fn execute(self, runtime: &IntelligenceRuntime) -> Result<()> {
        let targets = if self.all {
            runtime.summaries().into_iter().map(|s| s.species).collect()
        } else {
            self.species
        };
        if targets.is_empty() {
            bail!("name at least one species or pass --all");
        }

        for species in &targets {
            runtime.reset(species);
        }
        let saved = runtime.flush().await?;
        info!(species = targets.len(), saved, "knowledge reset");
        Ok(())
    }
}
