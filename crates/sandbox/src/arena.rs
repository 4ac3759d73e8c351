//! Duel arena driving the simulation interface.
//!
//! A single threat stands in a room with a few monsters of each species.
//! Every tick all living monsters decide concurrently, then their actions are
//! resolved in spawn order with d20 combat and the rewards are fed back to
//! the runtime. Dead monsters are recorded, which advances their species
//! generation, and respawn at full health.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use intelligence_core::{
    Action, MonsterId, Observation, Position, RoomTable, StateEncoder, StateIndex,
};
use intelligence_runtime::{DecisionSnapshot, IntelligenceRuntime, MonsterObservation, SpeciesSummary};
use serde::Serialize;
use tracing::{debug, info};

use crate::combat::{Dice, Draw, reward};

/// Tiles within which the threat is seen and allies count as nearby.
const SIGHT_RADIUS: i32 = 5;

/// Combat profile of a species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub max_hp: u32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage_dice: u32,
    pub damage_sides: u32,
    pub intelligence: Option<u8>,
}

impl Stats {
    /// The arena's opponent.
    pub const THREAT: Stats = Stats {
        max_hp: 20,
        armor_class: 14,
        attack_bonus: 2,
        damage_dice: 1,
        damage_sides: 8,
        intelligence: None,
    };

    pub fn for_species(species: &str) -> Self {
        let (max_hp, armor_class, attack_bonus, damage_sides, intelligence) = match species {
            "goblin" => (7, 13, 1, 6, 10),
            "orc" => (15, 13, 3, 8, 7),
            "skeleton" => (13, 13, 2, 6, 6),
            "spider" => (11, 14, 2, 6, 8),
            "wolf" => (11, 13, 2, 6, 8),
            "troll" => (30, 15, 4, 10, 7),
            _ => (10, 12, 1, 6, 8),
        };
        Self {
            max_hp,
            armor_class,
            attack_bonus,
            damage_dice: 1,
            damage_sides,
            intelligence: Some(intelligence),
        }
    }
}

/// Parameters of one arena run.
#[derive(Clone, Debug)]
pub struct ArenaSettings {
    pub episodes: u32,
    pub ticks: u64,
    pub species: Vec<String>,
    pub per_species: u32,
    pub room: String,
    pub seed: u64,
}

#[derive(Clone, Debug)]
struct Monster {
    id: MonsterId,
    species: String,
    stats: Stats,
    spawn: Position,
    position: Position,
    hp: u32,
}

impl Monster {
    fn hp_ratio(&self) -> f64 {
        f64::from(self.hp) / f64::from(self.stats.max_hp.max(1))
    }
}

#[derive(Clone, Debug)]
struct Threat {
    position: Position,
    hp: u32,
}

/// Per-episode tallies.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EpisodeReport {
    pub episode: u32,
    pub decisions: u64,
    pub explored: u64,
    pub overridden: u64,
    pub deaths: u64,
    pub threat_kills: u64,
    pub total_reward: f64,
    pub actions: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ArenaReport {
    pub seed: u64,
    pub episodes: Vec<EpisodeReport>,
    pub species: Vec<SpeciesSummary>,
}

/// Outcome of resolving one decision.
#[derive(Debug, Default)]
struct Resolution {
    rewards: Vec<f64>,
    died: bool,
    called_allies: bool,
}

pub struct Arena {
    runtime: Arc<IntelligenceRuntime>,
    settings: ArenaSettings,
    rooms: RoomTable,
    encoder: StateEncoder,
    dice: Dice,
    clock: u64,
}

impl Arena {
    pub fn new(runtime: Arc<IntelligenceRuntime>, settings: ArenaSettings, rooms: RoomTable) -> Self {
        let dice = Dice::new(settings.seed);
        Self {
            runtime,
            settings,
            rooms,
            encoder: StateEncoder::new(),
            dice,
            clock: 0,
        }
    }

    pub async fn run(&mut self) -> Result<ArenaReport> {
        let mut episodes = Vec::with_capacity(self.settings.episodes as usize);
        for episode in 0..self.settings.episodes {
            let report = self.run_episode(episode).await?;
            info!(
                episode,
                decisions = report.decisions,
                deaths = report.deaths,
                threat_kills = report.threat_kills,
                total_reward = report.total_reward,
                "episode finished"
            );
            episodes.push(report);
        }

        Ok(ArenaReport {
            seed: self.settings.seed,
            episodes,
            species: self.runtime.summaries(),
        })
    }

    fn spawn(&self, episode: u32) -> Vec<Monster> {
        let mut monsters = Vec::new();
        for species in &self.settings.species {
            let stats = Stats::for_species(species);
            for _ in 0..self.settings.per_species {
                let index = monsters.len() as i32;
                let spawn = Position::new(3 + index % 4, (index / 4) * 2 - 2);
                let id = MonsterId(episode * 1_000 + index as u32);
                self.runtime.spawn_monster(id);
                monsters.push(Monster {
                    id,
                    species: species.clone(),
                    stats,
                    spawn,
                    position: spawn,
                    hp: stats.max_hp,
                });
            }
        }
        monsters
    }

    async fn run_episode(&mut self, episode: u32) -> Result<EpisodeReport> {
        let mut monsters = self.spawn(episode);
        let mut threat = Threat {
            position: Position::default(),
            hp: Stats::THREAT.max_hp,
        };
        let mut report = EpisodeReport {
            episode,
            ..EpisodeReport::default()
        };

        for _ in 0..self.settings.ticks {
            self.clock += 1;
            let tick = self.clock;

            let decisions = self.decide_all(&monsters, &threat, tick).await?;
            for (index, snapshot) in decisions.into_iter().enumerate() {
                report.decisions += 1;
                report.explored += u64::from(snapshot.explored);
                report.overridden += u64::from(snapshot.override_rule.is_some());
                *report.actions.entry(snapshot.action.to_string()).or_default() += 1;

                let resolution = self.resolve(&mut monsters, index, &mut threat, &snapshot, tick);
                report.total_reward += resolution.rewards.iter().sum::<f64>();

                if resolution.called_allies {
                    for ally in allies_of(&monsters, index) {
                        self.runtime.share_memory(monsters[index].id, monsters[ally].id);
                    }
                }

                if resolution.died {
                    for value in &resolution.rewards {
                        self.runtime.apply_reward(&snapshot, *value, snapshot.state);
                    }
                    let death = self.runtime.record_death(&snapshot);
                    report.deaths += 1;
                    report.total_reward += self.runtime.config().engine.death_penalty;
                    debug!(monster = %monsters[index].id, generation = death.generation, "monster slain");

                    let monster = &mut monsters[index];
                    monster.hp = monster.stats.max_hp;
                    monster.position = monster.spawn;
                    self.runtime.spawn_monster(monster.id);
                } else {
                    let next_state = self.state_of(&monsters, index, &threat)?;
                    for value in &resolution.rewards {
                        self.runtime.apply_reward(&snapshot, *value, next_state);
                    }
                }

                if threat.hp == 0 {
                    report.threat_kills += 1;
                    threat.hp = Stats::THREAT.max_hp;
                }
            }

            self.advance_threat(&monsters, &mut threat);
        }

        for monster in &monsters {
            self.runtime.despawn_monster(monster.id);
        }
        Ok(report)
    }

    /// Builds what `monsters[index]` perceives this tick.
    fn observe(&self, monsters: &[Monster], index: usize, threat: &Threat, tick: u64) -> MonsterObservation {
        let monster = &monsters[index];
        let visible = chebyshev(monster.position, threat.position) <= SIGHT_RADIUS;

        let mut observation =
            MonsterObservation::new(monster.id, tick, monster.hp_ratio(), self.settings.room.clone())
                .at(monster.position)
                .enemies(u32::from(visible))
                .allies(allies_of(monsters, index).count() as u32);
        if visible {
            observation = observation.threat_at(threat.position);
        }
        if let Some(score) = monster.stats.intelligence {
            observation = observation.intelligence(score);
        }
        observation
    }

    /// State after resolution, encoded from what the arena knows to be true.
    fn state_of(&self, monsters: &[Monster], index: usize, threat: &Threat) -> Result<StateIndex> {
        let monster = &monsters[index];
        let distance = monster.position.distance(&threat.position);
        let visible = chebyshev(monster.position, threat.position) <= SIGHT_RADIUS;
        let observation = Observation::new(
            monster.hp_ratio(),
            u32::from(visible),
            allies_of(monsters, index).count() as u32,
            self.rooms.categorize(&self.settings.room)?,
            visible.then_some(distance),
        )?;
        Ok(self.encoder.encode(&observation))
    }

    /// Decides for every monster concurrently, returning snapshots in
    /// spawn order.
    async fn decide_all(
        &self,
        monsters: &[Monster],
        threat: &Threat,
        tick: u64,
    ) -> Result<Vec<DecisionSnapshot>> {
        let tasks: Vec<_> = (0..monsters.len())
            .map(|index| {
                let runtime = Arc::clone(&self.runtime);
                let observation = self.observe(monsters, index, threat, tick);
                let species = monsters[index].species.clone();
                tokio::task::spawn_blocking(move || runtime.decide(&observation, &species))
            })
            .collect();

        let mut snapshots = Vec::with_capacity(tasks.len());
        for task in tasks {
            let decision = task.await.context("decision task panicked")??;
            snapshots.push(decision.snapshot);
        }
        Ok(snapshots)
    }

    fn resolve(
        &self,
        monsters: &mut [Monster],
        index: usize,
        threat: &mut Threat,
        snapshot: &DecisionSnapshot,
        tick: u64,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let monster = &mut monsters[index];
        let adjacent = chebyshev(monster.position, threat.position) <= 1;
        let actor = monster.id.0;

        if !adjacent {
            match snapshot.action {
                Action::AttackAggressive | Action::AttackDefensive => {
                    monster.position = step_towards(monster.position, threat.position);
                }
                Action::Flee => monster.position = step_away(monster.position, threat.position),
                Action::Patrol => {
                    monster.position = Position::new(
                        monster.position.x + self.dice.step(tick, actor, 0),
                        monster.position.y + self.dice.step(tick, actor, 1),
                    );
                }
                Action::CallAllies => resolution.called_allies = true,
                Action::Defend | Action::Ambush => {}
            }
            return resolution;
        }

        match snapshot.action {
            Action::AttackAggressive | Action::AttackDefensive | Action::Ambush => {
                let bonus = match snapshot.action {
                    Action::Ambush => monster.stats.attack_bonus + 2,
                    _ => monster.stats.attack_bonus,
                };
                let attack = self.dice.attack(
                    tick,
                    actor,
                    Draw::MonsterAttack,
                    bonus,
                    Stats::THREAT.armor_class,
                );
                if attack.hit {
                    let extra = i32::from(snapshot.action == Action::AttackAggressive) * 2;
                    let damage = self.dice.damage(
                        tick,
                        actor,
                        Draw::MonsterDamage,
                        monster.stats.damage_dice,
                        monster.stats.damage_sides,
                        extra,
                        attack.critical,
                    );
                    threat.hp = threat.hp.saturating_sub(damage);
                    resolution.rewards.push(f64::from(damage));
                } else {
                    resolution.rewards.push(reward::MISS);
                }

                if threat.hp > 0 && snapshot.action != Action::AttackDefensive {
                    let armor = match snapshot.action {
                        Action::AttackAggressive => monster.stats.armor_class - 2,
                        _ => monster.stats.armor_class,
                    };
                    self.threat_strikes(monster, armor, tick, &mut resolution);
                }
            }
            Action::Defend => {
                self.threat_strikes(monster, monster.stats.armor_class + 2, tick, &mut resolution);
                if !resolution.died {
                    resolution.rewards.push(reward::DEFENDED);
                }
            }
            Action::Flee => {
                self.threat_strikes(monster, monster.stats.armor_class, tick, &mut resolution);
                if resolution.died {
                    resolution.rewards.push(reward::DIED_FLEEING);
                } else {
                    resolution.rewards.push(reward::FLED);
                    let away = step_away(monster.position, threat.position);
                    monster.position = step_away(away, threat.position);
                }
            }
            Action::CallAllies => {
                resolution.called_allies = true;
                resolution.rewards.push(reward::CALLED_ALLIES);
            }
            Action::Patrol => resolution.rewards.push(reward::IDLE_NEAR_THREAT),
        }
        resolution
    }

    /// Threat attacks `monster`; a killing blow is left to the death penalty.
    fn threat_strikes(&self, monster: &mut Monster, armor_class: i32, tick: u64, resolution: &mut Resolution) {
        let threat = Stats::THREAT;
        let actor = monster.id.0;
        let attack = self
            .dice
            .attack(tick, actor, Draw::ThreatAttack, threat.attack_bonus, armor_class);
        if !attack.hit {
            resolution.rewards.push(reward::AVOIDED);
            return;
        }

        let damage = self.dice.damage(
            tick,
            actor,
            Draw::ThreatDamage,
            threat.damage_dice,
            threat.damage_sides,
            0,
            attack.critical,
        );
        monster.hp = monster.hp.saturating_sub(damage);
        if monster.hp == 0 {
            resolution.died = true;
        } else {
            resolution.rewards.push(-f64::from(damage));
        }
    }

    /// The threat closes in on the nearest monster unless already engaged.
    fn advance_threat(&self, monsters: &[Monster], threat: &mut Threat) {
        let nearest = monsters
            .iter()
            .min_by_key(|m| chebyshev(m.position, threat.position));
        if let Some(target) = nearest
            && chebyshev(target.position, threat.position) > 1
        {
            threat.position = step_towards(threat.position, target.position);
        }
    }
}

/// Indices of same-species monsters within sight of `monsters[index]`.
fn allies_of(monsters: &[Monster], index: usize) -> impl Iterator<Item = usize> + '_ {
    let me = &monsters[index];
    monsters.iter().enumerate().filter_map(move |(other, m)| {
        (other != index && m.species == me.species && chebyshev(m.position, me.position) <= SIGHT_RADIUS)
            .then_some(other)
    })
}

fn chebyshev(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

fn step_towards(from: Position, to: Position) -> Position {
    Position::new(from.x + (to.x - from.x).signum(), from.y + (to.y - from.y).signum())
}

fn step_away(from: Position, threat: Position) -> Position {
    let dx = (from.x - threat.x).signum();
    let dy = (from.y - threat.y).signum();
    // standing on the threat: back off along x
    let dx = if dx == 0 && dy == 0 { 1 } else { dx };
    Position::new(from.x + dx, from.y + dy)
}

#[cfg(test)]
mod tests {
    use intelligence_runtime::{InMemoryKnowledgeRepository, RuntimeConfig};

    use super::*;

    async fn arena(episodes: u32, seed: u64) -> Arena {
        let runtime = IntelligenceRuntime::builder()
            .config(RuntimeConfig::default())
            .repository(Arc::new(InMemoryKnowledgeRepository::new()))
            .build()
            .await
            .unwrap();
        let settings = ArenaSettings {
            episodes,
            ticks: 40,
            species: vec!["goblin".to_owned(), "orc".to_owned()],
            per_species: 3,
            room: "armory".to_owned(),
            seed,
        };
        Arena::new(Arc::new(runtime), settings, RoomTable::default())
    }

    #[test]
    fn movement_helpers() {
        let origin = Position::new(0, 0);
        assert_eq!(step_towards(Position::new(3, -2), origin), Position::new(2, -1));
        assert_eq!(step_away(Position::new(1, 0), origin), Position::new(2, 0));
        assert_eq!(step_away(origin, origin), Position::new(1, 0));
        assert_eq!(chebyshev(Position::new(3, -5), origin), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn episodes_teach_every_species() {
        let mut arena = arena(2, 1).await;
        let report = arena.run().await.unwrap();

        assert_eq!(report.episodes.len(), 2);
        for episode in &report.episodes {
            assert_eq!(episode.decisions, 40 * 6);
            assert_eq!(episode.actions.values().sum::<u64>(), episode.decisions);
        }
        assert_eq!(report.species.len(), 2);
        for summary in &report.species {
            assert_eq!(summary.encounters, 2 * 40 * 3);
            assert!(summary.total_learning_steps > 0, "{}", summary.species);
        }
        let deaths: u64 = report.episodes.iter().map(|e| e.deaths).sum();
        let generations: u64 = report.species.iter().map(|s| s.generation).sum();
        assert_eq!(deaths, generations);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_are_reproducible() {
        let first = arena(1, 99).await.run().await.unwrap();
        let second = arena(1, 99).await.run().await.unwrap();
        let a = &first.episodes[0];
        let b = &second.episodes[0];
        assert_eq!(a.actions, b.actions);
        assert_eq!(a.deaths, b.deaths);
        assert_eq!(a.total_reward, b.total_reward);
    }
}
