//! One-shot decisions and reward attribution.

use std::sync::Arc;

use intelligence_core::{
    Action, EpsilonGreedy, MonsterId, Observation, ObservationError, OverrideTable, PcgRng,
    Personality, Position, QUpdate, QValues, RoomTable, StateBins, StateEncoder, StateIndex,
    ThreatEvent, ThreatKind, compute_seed, confidence,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::knowledge::{SpeciesKnowledgeStore, Transition};
use crate::memory::MemorySystem;

/// Seed context of the ε-greedy draw.
const DECISION_CONTEXT: u32 = 0;

/// What a monster perceives on one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct MonsterObservation {
    pub monster_id: MonsterId,
    pub tick: u64,
    pub position: Position,
    pub hp_ratio: f64,
    pub nearby_enemies: u32,
    pub nearby_allies: u32,
    pub room_type: String,
    /// Position of a threat in sight this tick.
    pub visible_threat: Option<Position>,
    /// Intelligence score; `None` means fully perceptive.
    pub intelligence: Option<u8>,
}

impl MonsterObservation {
    pub fn new(monster_id: MonsterId, tick: u64, hp_ratio: f64, room_type: impl Into<String>) -> Self {
        Self {
            monster_id,
            tick,
            position: Position::default(),
            hp_ratio,
            nearby_enemies: 0,
            nearby_allies: 0,
            room_type: room_type.into(),
            visible_threat: None,
            intelligence: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn enemies(mut self, count: u32) -> Self {
        self.nearby_enemies = count;
        self
    }

    #[must_use]
    pub fn allies(mut self, count: u32) -> Self {
        self.nearby_allies = count;
        self
    }

    #[must_use]
    pub fn threat_at(mut self, position: Position) -> Self {
        self.visible_threat = Some(position);
        self
    }

    #[must_use]
    pub fn intelligence(mut self, score: u8) -> Self {
        self.intelligence = Some(score);
        self
    }
}

/// Encoded view of an observation after memory fill-in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perception {
    pub state: StateIndex,
    pub bins: StateBins,
    pub distance_to_threat: Option<f64>,
    /// True when the threat came from memory rather than sight.
    pub recalled: bool,
}

/// Everything needed to attribute a later reward to a decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecisionSnapshot {
    pub species: String,
    pub monster_id: MonsterId,
    pub tick: u64,
    pub state: StateIndex,
    pub bins: StateBins,
    /// Action returned to the caller.
    pub action: Action,
    /// Action picked by ε-greedy before any override.
    pub selected: Action,
    pub q_values: QValues,
    pub explored: bool,
    /// Override rule that replaced `selected`, if any.
    pub override_rule: Option<String>,
    pub confidence: f64,
    pub exploration_rate: f64,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub snapshot: DecisionSnapshot,
}

/// Result of attributing a reward to a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardOutcome {
    pub update: QUpdate,
    /// Row of the snapshot state when the decision was made.
    pub prior_q_values: QValues,
    /// Row of the snapshot state after the update.
    pub q_values: QValues,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeathOutcome {
    pub reward: RewardOutcome,
    pub generation: u64,
}

/// Stateless decision maker over a shared store and memory system.
///
/// The engine keeps no per-call state; every decision reads the species
/// table and the monster's memory, and every reward goes through the store.
pub struct DecisionEngine {
    store: Arc<SpeciesKnowledgeStore>,
    memory: Arc<MemorySystem>,
    encoder: StateEncoder,
    rooms: RoomTable,
    overrides: OverrideTable,
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(
        store: Arc<SpeciesKnowledgeStore>,
        memory: Arc<MemorySystem>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            memory,
            encoder: StateEncoder::new(),
            rooms: RoomTable::default(),
            overrides: OverrideTable::standard(),
            config,
        }
    }

    #[must_use]
    pub fn with_rooms(mut self, rooms: RoomTable) -> Self {
        self.rooms = rooms;
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn store(&self) -> &Arc<SpeciesKnowledgeStore> {
        &self.store
    }

    pub fn memory(&self) -> &Arc<MemorySystem> {
        &self.memory
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates and encodes an observation, updating and consulting the
    /// monster's memory.
    ///
    /// A visible threat is remembered. Without one, a fresh memory of the
    /// last sighting supplies the threat distance and at least one enemy.
    /// Oblivious monsters see no enemies and skip memory entirely.
    pub fn perceive(&self, observation: &MonsterObservation) -> Result<Perception, ObservationError> {
        let room = self.rooms.categorize(&observation.room_type)?;
        if !self.rooms.contains(&observation.room_type) {
            warn!(
                room_type = %observation.room_type,
                category = %room,
                "unknown room type, using fallback category"
            );
        }

        // reject malformed input before memory is touched
        Observation::new(
            observation.hp_ratio,
            observation.nearby_enemies,
            observation.nearby_allies,
            room,
            None,
        )?;

        let id = observation.monster_id;
        let tick = observation.tick;
        let perceptive = observation
            .intelligence
            .is_none_or(|score| score > self.config.oblivious_intelligence);

        let (enemies, distance, recalled) = if !perceptive {
            (0, None, false)
        } else {
            self.memory.decay(id, tick);
            if let Some(threat) = observation.visible_threat {
                self.memory
                    .observe(id, ThreatEvent::new(0, threat, tick, ThreatKind::Player));
                (
                    observation.nearby_enemies,
                    Some(observation.position.distance(&threat)),
                    false,
                )
            } else if let Some(sighting) = self.memory.recall(id, tick) {
                (
                    observation.nearby_enemies.max(1),
                    Some(observation.position.distance(&sighting.position)),
                    true,
                )
            } else {
                (observation.nearby_enemies, None, false)
            }
        };

        let validated = Observation::new(
            observation.hp_ratio,
            enemies,
            observation.nearby_allies,
            room,
            distance,
        )?;
        let bins = StateBins::from_observation(&validated);

        Ok(Perception {
            state: self.encoder.encode_bins(&bins),
            bins,
            distance_to_threat: distance,
            recalled,
        })
    }

    /// Picks an action with the engine's override table.
    pub fn decide(
        &self,
        observation: &MonsterObservation,
        personality: &Personality,
        species: &str,
    ) -> Result<Decision, ObservationError> {
        self.decide_with_rules(observation, personality, &self.overrides, species)
    }

    /// Picks an action with an explicit override table.
    ///
    /// Overrides only touch exploited actions; explored actions are returned
    /// as drawn so exploration stays measurable.
    pub fn decide_with_rules(
        &self,
        observation: &MonsterObservation,
        personality: &Personality,
        overrides: &OverrideTable,
        species: &str,
    ) -> Result<Decision, ObservationError> {
        let perception = self.perceive(observation)?;
        let view = self.store.decision_view(species, perception.state);
        self.store.record_encounter(species);

        let seed = compute_seed(
            self.config.game_seed,
            observation.tick,
            observation.monster_id.0,
            DECISION_CONTEXT,
        );
        let selection = EpsilonGreedy::new(view.exploration_rate).select(&view.q_values, &PcgRng, seed);

        let rule = if selection.explored {
            None
        } else {
            overrides.evaluate(selection.action, personality, &perception.bins)
        };
        let action = rule.map_or(selection.action, |rule| rule.replacement);

        debug!(
            species,
            monster = %observation.monster_id,
            tick = observation.tick,
            state = perception.state.get(),
            %action,
            explored = selection.explored,
            rule = rule.map(|r| r.name.as_str()),
            "decision"
        );

        let snapshot = DecisionSnapshot {
            species: species.to_owned(),
            monster_id: observation.monster_id,
            tick: observation.tick,
            state: perception.state,
            bins: perception.bins,
            action,
            selected: selection.action,
            q_values: view.q_values,
            explored: selection.explored,
            override_rule: rule.map(|r| r.name.clone()),
            confidence: confidence(&view.q_values),
            exploration_rate: view.exploration_rate,
            generation: view.generation,
        };

        Ok(Decision { action, snapshot })
    }

    /// Attributes `reward` to the action of `snapshot`.
    pub fn apply_reward(
        &self,
        snapshot: &DecisionSnapshot,
        reward: f64,
        next_state: StateIndex,
    ) -> RewardOutcome {
        self.learn(snapshot, reward, Some(next_state))
    }

    /// Applies the death penalty as a terminal reward, advances the species
    /// generation and forgets the monster's memory.
    pub fn record_death(&self, snapshot: &DecisionSnapshot) -> DeathOutcome {
        let reward = self.learn(snapshot, self.config.death_penalty, None);
        let generation = self.store.advance_generation(&snapshot.species);
        self.memory.remove(snapshot.monster_id);
        DeathOutcome { reward, generation }
    }

    /// Shares `from`'s threat memory with an ally.
    pub fn share_memory(&self, from: MonsterId, to: MonsterId) -> usize {
        self.memory.share(from, to, self.config.share_blend)
    }

    fn learn(
        &self,
        snapshot: &DecisionSnapshot,
        reward: f64,
        next_state: Option<StateIndex>,
    ) -> RewardOutcome {
        let applied = self.store.apply_reward(
            &snapshot.species,
            Transition {
                tick: snapshot.tick,
                state: snapshot.state,
                action: snapshot.action,
                reward,
                next_state,
            },
        );
        RewardOutcome {
            update: applied.update,
            prior_q_values: snapshot.q_values,
            q_values: applied.q_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use intelligence_core::{DistanceBin, HpBin, LearningConfig, MemoryConfig, RoomCategory};

    use super::*;

    fn engine(exploration_rate: f64) -> DecisionEngine {
        let learning = LearningConfig::default().with_exploration_rate(exploration_rate);
        let store = Arc::new(SpeciesKnowledgeStore::new(learning).unwrap());
        let memory = Arc::new(MemorySystem::new(MemoryConfig::default()).unwrap());
        DecisionEngine::new(store, memory, EngineConfig::default())
    }

    #[test]
    fn perceive_fills_in_recent_threat() {
        let engine = engine(0.0);
        let id = MonsterId(1);

        let seen = MonsterObservation::new(id, 1, 0.9, "armory")
            .enemies(1)
            .threat_at(Position::new(1, 0));
        let perception = engine.perceive(&seen).unwrap();
        assert_eq!(perception.bins.distance, DistanceBin::Close);
        assert!(!perception.recalled);

        let hidden = MonsterObservation::new(id, 4, 0.9, "armory").at(Position::new(-3, 0));
        let perception = engine.perceive(&hidden).unwrap();
        assert!(perception.recalled);
        assert_eq!(perception.bins.enemies, 1);
        assert_eq!(perception.bins.distance, DistanceBin::Medium);

        let later = MonsterObservation::new(id, 30, 0.9, "armory");
        let perception = engine.perceive(&later).unwrap();
        assert!(!perception.recalled);
        assert_eq!(perception.bins.enemies, 0);
        assert_eq!(perception.bins.distance, DistanceBin::Far);
    }

    #[test]
    fn oblivious_monsters_ignore_threats() {
        let engine = engine(0.0);
        let dull = MonsterObservation::new(MonsterId(2), 1, 0.2, "crypt")
            .enemies(3)
            .threat_at(Position::new(1, 1))
            .intelligence(4);
        let perception = engine.perceive(&dull).unwrap();
        assert_eq!(perception.bins.enemies, 0);
        assert_eq!(perception.bins.distance, DistanceBin::Far);
        assert_eq!(perception.bins.hp, HpBin::Low);
        assert_eq!(perception.bins.room, RoomCategory::Treasure);
        assert!(!engine.memory().contains(MonsterId(2)));
    }

    #[test]
    fn malformed_observations_are_rejected() {
        let engine = engine(0.0);
        let id = MonsterId(1);
        let bad_hp = MonsterObservation::new(id, 5, 1.7, "armory")
            .enemies(1)
            .threat_at(Position::new(1, 0));
        assert!(matches!(
            engine.decide(&bad_hp, &Personality::neutral(), "rat"),
            Err(ObservationError::HpRatioOutOfRange(_))
        ));
        let no_room = MonsterObservation::new(id, 6, 0.5, "  ").threat_at(Position::new(1, 0));
        assert!(engine.perceive(&no_room).is_err());

        assert!(!engine.store().contains("rat"));
        assert!(!engine.memory().contains(id));
        assert!(engine.memory().recall(id, 6).is_none());
    }

    #[test]
    fn death_is_terminal_and_forgets_memory() {
        let engine = engine(0.0);
        let id = MonsterId(5);
        let observation = MonsterObservation::new(id, 1, 0.1, "armory")
            .enemies(1)
            .threat_at(Position::new(1, 0));
        let decision = engine.decide(&observation, &Personality::neutral(), "rat").unwrap();

        let death = engine.record_death(&decision.snapshot);
        assert_eq!(death.generation, 1);
        assert!((death.reward.update.after + 10.0).abs() < 1e-12);
        assert_eq!(death.reward.prior_q_values, [0.0; 7]);
        assert!(!engine.memory().contains(id));
    }
}
