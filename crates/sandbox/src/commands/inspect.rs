//! Inspect learned species knowledge.

use anyhow::{Result, bail};
use clap::Parser;
use intelligence_core::{Action, StateIndex, greedy_action};
use intelligence_runtime::IntelligenceRuntime;
use serde::Serialize;

use super::print_json;

/// Show species summaries, history and learned policy
#[derive(Parser, Debug)]
pub struct Inspect {
    /// Species to inspect; all species when omitted
    pub species: Option<String>,

    /// Number of history entries to show
    #[arg(long, default_value_t = 10)]
    pub history: usize,

    /// Print the greedy action of every trained state
    #[arg(long)]
    pub policy: bool,
}

#[derive(Serialize)]
struct PolicyRow {
    state: usize,
    description: String,
    action: Action,
    value: f64,
}

impl Inspect {
    pub async fn execute(self, runtime: &IntelligenceRuntime, json: bool) -> Result<()> {
        let Some(species) = self.species else {
            let summaries = runtime.summaries();
            if json {
                return print_json(&summaries);
            }
            if summaries.is_empty() {
                println!("no species knowledge recorded");
            }
            for summary in summaries {
                println!(
                    "{:<10} generation {:>3}  encounters {:>6}  steps {:>6}  trained cells {:>4}",
                    summary.species,
                    summary.generation,
                    summary.encounters,
                    summary.total_learning_steps,
                    summary.nonzero,
                );
            }
            return Ok(());
        };

        let Some(summary) = runtime.summary(&species) else {
            bail!("no knowledge recorded for species '{species}'");
        };
        let history = runtime.history(&species, self.history);
        let policy = if self.policy {
            policy_rows(runtime, &species)
        } else {
            Vec::new()
        };

        if json {
            return print_json(&serde_json::json!({
                "summary": summary,
                "history": history,
                "policy": policy,
            }));
        }

        println!("species         {}", summary.species);
        println!("generation      {}", summary.generation);
        println!("encounters      {}", summary.encounters);
        println!("learning steps  {}", summary.total_learning_steps);
        println!("exploration     {:.3}", summary.exploration_rate);
        println!("schema          v{}", summary.schema_version);
        println!(
            "q-values        mean {:.3}  min {:.3}  max {:.3}  ({} trained)",
            summary.mean_q, summary.min_q, summary.max_q, summary.nonzero
        );
        println!("last updated    {}", summary.last_updated.to_rfc3339());

        if !history.entries.is_empty() {
            println!();
            println!("{:>6} {:>5} {:<18} {:>8} {:>9} {:>9}", "tick", "state", "action", "reward", "before", "after");
            for entry in &history.entries {
                println!(
                    "{:>6} {:>5} {:<18} {:>8.2} {:>9.3} {:>9.3}",
                    entry.tick,
                    entry.state.get(),
                    entry.action,
                    entry.reward,
                    entry.q_before,
                    entry.q_after,
                );
            }
        }

        if !policy.is_empty() {
            println!();
            for row in &policy {
                println!("{:>5} {:<48} {:<18} {:>8.3}", row.state, row.description, row.action, row.value);
            }
        }
        Ok(())
    }
}

fn policy_rows(runtime: &IntelligenceRuntime, species: &str) -> Vec<PolicyRow> {
    let Some(rows) = runtime.q_table(species) else {
        return Vec::new();
    };

    rows.iter()
        .enumerate()
        .filter(|(_, values)| values.iter().any(|v| *v != 0.0))
        .filter_map(|(index, values)| {
            let state = StateIndex::new(index)?;
            let action = greedy_action(values);
            let d = runtime.describe_state(state);
            Some(PolicyRow {
                state: index,
                description: format!(
                    "hp={} enemies={} allies={} room={} distance={}",
                    d.hp, d.enemies, d.allies, d.room, d.distance
                ),
                action,
                value: values[action.index()],
            })
        })
        .collect()
}
