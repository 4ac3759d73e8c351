//! List behavior profiles.

use anyhow::Result;
use clap::Parser;
use intelligence_runtime::IntelligenceRuntime;

use super::print_json;

/// Show species personalities and override rules
#[derive(Parser, Debug)]
pub struct Profiles {
    /// Show only this species
    pub species: Option<String>,
}

impl Profiles {
    pub fn execute(self, runtime: &IntelligenceRuntime, json: bool) -> Result<()> {
        let mut views = runtime.profile_views();
        if let Some(species) = &self.species {
            views.retain(|view| &view.species == species);
            if views.is_empty() {
                anyhow::bail!("no profile registered for species '{species}'");
            }
        }
        if json {
            return print_json(&views);
        }

        for view in views {
            let p = view.personality;
            println!("{}: {}", view.species, view.description);
            println!(
                "    aggression {:.2}  caution {:.2}  cunning {:.2}  pack {:.2}",
                p.aggression, p.caution, p.cunning, p.pack_mentality
            );
            if !view.rules.is_empty() {
                println!("    rules: {}", view.rules.join(", "));
            }
        }
        Ok(())
    }
}
