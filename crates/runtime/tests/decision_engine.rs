use std::sync::Arc;

use intelligence_core::{
    Action, LearningConfig, MonsterId, Personality, Position, StateIndex,
};
use intelligence_runtime::{
    InMemoryKnowledgeRepository, IntelligenceRuntime, MonsterObservation, ProfileRegistry,
    RuntimeConfig, Transition,
};

async fn runtime_with(exploration_rate: f64, profiles: ProfileRegistry) -> IntelligenceRuntime {
    let config = RuntimeConfig {
        learning: LearningConfig::default().with_exploration_rate(exploration_rate),
        ..RuntimeConfig::default()
    };
    IntelligenceRuntime::builder()
        .config(config)
        .repository(Arc::new(InMemoryKnowledgeRepository::new()))
        .profiles(profiles)
        .build()
        .await
        .unwrap()
}

async fn greedy_runtime() -> IntelligenceRuntime {
    runtime_with(0.0, ProfileRegistry::standard()).await
}

/// Makes `action` the strict maximum of `state` for `species`.
fn prefer(runtime: &IntelligenceRuntime, species: &str, state: StateIndex, action: Action) {
    runtime.store().apply_reward(
        species,
        Transition {
            tick: 0,
            state,
            action,
            reward: 5.0,
            next_state: None,
        },
    );
}

fn engaged(id: u32, tick: u64, hp_ratio: f64) -> MonsterObservation {
    MonsterObservation::new(MonsterId(id), tick, hp_ratio, "library")
        .enemies(2)
        .threat_at(Position::new(3, 0))
}

#[tokio::test]
async fn zero_epsilon_always_exploits_the_strict_maximum() {
    let runtime = greedy_runtime().await;
    let neutral = Personality::neutral();
    let state = runtime.perceive(&engaged(0, 0, 0.5)).unwrap().state;
    prefer(&runtime, "rat", state, Action::Flee);

    for tick in 1..200 {
        let observation = engaged(tick as u32 % 17, tick, 0.5);
        let decision = runtime.decide_as(&observation, "rat", &neutral).unwrap();
        assert_eq!(decision.snapshot.state, state);
        assert_eq!(decision.action, Action::Flee);
        assert_eq!(decision.action.index(), 3);
        assert!(!decision.snapshot.explored);
        assert_eq!(decision.snapshot.override_rule, None);
    }
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn full_epsilon_explores_without_overrides() {
    let runtime = runtime_with(1.0, ProfileRegistry::standard()).await;
    let mut seen = [false; 7];
    for tick in 0..300 {
        // goblins at low hp would otherwise be steered to DEFEND
        let decision = runtime.decide(&engaged(1, tick, 0.1), "goblin").unwrap();
        assert!(decision.snapshot.explored);
        assert_eq!(decision.action, decision.snapshot.selected);
        assert_eq!(decision.snapshot.override_rule, None);
        seen[decision.action.index()] = true;
    }
    assert!(seen.iter().all(|s| *s));
}

#[tokio::test]
async fn decisions_are_reproducible_for_a_seed() {
    let first = runtime_with(0.5, ProfileRegistry::standard()).await;
    let second = runtime_with(0.5, ProfileRegistry::standard()).await;
    for tick in 0..50 {
        let observation = engaged(9, tick, 0.9);
        let a = first.decide(&observation, "orc").unwrap();
        let b = second.decide(&observation, "orc").unwrap();
        assert_eq!(a.action, b.action);
        assert_eq!(a.snapshot.explored, b.snapshot.explored);
    }
}

#[tokio::test]
async fn cautious_species_guard_when_hurt() {
    let runtime = greedy_runtime().await;
    let decision = runtime.decide(&engaged(1, 1, 0.2), "goblin").unwrap();

    // untrained row exploits ATTACK_AGGRESSIVE, which the goblin profile vetoes
    assert_eq!(decision.snapshot.selected, Action::AttackAggressive);
    assert_eq!(decision.action, Action::Defend);
    assert_eq!(decision.snapshot.override_rule.as_deref(), Some("cautious_guard"));

    let reckless = Personality::new(0.5, 0.1, 0.5, 0.5);
    let decision = runtime.decide_as(&engaged(2, 1, 0.2), "goblin", &reckless).unwrap();
    assert_eq!(decision.action, Action::AttackAggressive);
}

#[tokio::test]
async fn pack_species_call_allies_instead_of_defending() {
    let runtime = greedy_runtime().await;
    let observation = engaged(4, 1, 0.5).allies(2);
    let state = runtime.perceive(&observation).unwrap().state;
    prefer(&runtime, "wolf", state, Action::Defend);

    let decision = runtime.decide(&observation, "wolf").unwrap();
    assert_eq!(decision.snapshot.selected, Action::Defend);
    assert_eq!(decision.action, Action::CallAllies);
    assert_eq!(decision.snapshot.override_rule.as_deref(), Some("pack_call"));
}

#[tokio::test]
async fn data_file_profiles_carry_their_own_rules() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/profiles.ron");
    let profiles = ProfileRegistry::load(path).unwrap();
    assert!(profiles.contains("troll"));
    let runtime = runtime_with(0.0, profiles).await;

    let decision = runtime.decide(&engaged(1, 1, 0.2), "troll").unwrap();
    assert_eq!(decision.action, Action::Defend);
    assert_eq!(decision.snapshot.override_rule.as_deref(), Some("troll_regroup"));

    // skeletons opt out of every rule
    let fearless = Personality::new(0.5, 1.0, 0.5, 0.5);
    let decision = runtime
        .decide_as(&engaged(2, 1, 0.2), "skeleton", &fearless)
        .unwrap();
    assert_eq!(decision.action, Action::AttackAggressive);
}

#[tokio::test]
async fn unknown_species_are_registered_on_first_decision() {
    let runtime = greedy_runtime().await;
    assert!(runtime.summary("basilisk").is_none());

    let decision = runtime.decide(&engaged(1, 1, 0.9), "basilisk").unwrap();
    assert_eq!(decision.snapshot.q_values, [0.0; 7]);
    assert_eq!(decision.snapshot.confidence, 0.5);

    let summary = runtime.summary("basilisk").unwrap();
    assert_eq!(summary.encounters, 1);
    assert_eq!(summary.total_learning_steps, 0);
}

#[tokio::test]
async fn rewards_report_prior_and_updated_values() {
    let runtime = greedy_runtime().await;
    let decision = runtime.decide(&engaged(1, 1, 0.9), "orc").unwrap();
    let next = runtime.perceive(&engaged(1, 2, 0.8)).unwrap().state;

    let outcome = runtime.apply_reward(&decision.snapshot, 10.0, next);
    let column = decision.action.index();
    assert_eq!(outcome.prior_q_values[column], 0.0);
    assert!((outcome.q_values[column] - 1.0).abs() < 1e-12);
    assert_eq!(outcome.update.before, 0.0);

    let page = runtime.history("orc", 10);
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].action, decision.action);
    assert_eq!(page.entries[0].reward, 10.0);
}

#[tokio::test]
async fn remembered_threats_fill_in_hidden_enemies() {
    let runtime = greedy_runtime().await;
    let scout = MonsterId(1);
    let ally = MonsterId(2);
    runtime.spawn_monster(scout);
    runtime.spawn_monster(ally);

    runtime.decide(&engaged(1, 1, 0.9), "wolf").unwrap();
    assert_eq!(runtime.share_memory(scout, ally), 1);

    let hidden = MonsterObservation::new(ally, 2, 0.9, "library").at(Position::new(1, 0));
    let perception = runtime.perceive(&hidden).unwrap();
    assert!(perception.recalled);
    assert_eq!(perception.bins.enemies, 1);
    assert_eq!(perception.distance_to_threat, Some(2.0));

    let oblivious = hidden.clone().intelligence(3);
    let perception = runtime.perceive(&oblivious).unwrap();
    assert!(!perception.recalled);
    assert_eq!(perception.bins.enemies, 0);
}

#[tokio::test]
async fn death_penalizes_and_advances_generation() {
    let runtime = greedy_runtime().await;
    let decision = runtime.decide(&engaged(8, 3, 0.1), "orc").unwrap();
    assert!(runtime.memory().contains(MonsterId(8)));

    let death = runtime.record_death(&decision.snapshot);
    assert_eq!(death.generation, 1);
    assert_eq!(death.reward.update.next_max, 0.0);
    assert!((death.reward.update.after + 10.0).abs() < 1e-12);
    assert!(!runtime.memory().contains(MonsterId(8)));

    let summary = runtime.summary("orc").unwrap();
    assert_eq!(summary.generation, 1);
    assert_eq!(summary.history_len, 1);
}

#[tokio::test]
async fn malformed_observations_are_rejected() {
    let runtime = greedy_runtime().await;
    let negative = MonsterObservation::new(MonsterId(1), 1, -0.1, "library");
    assert!(runtime.decide(&negative, "orc").is_err());

    let strict = IntelligenceRuntime::builder()
        .repository(Arc::new(InMemoryKnowledgeRepository::new()))
        .rooms(intelligence_core::RoomTable::strict())
        .build()
        .await
        .unwrap();
    let unknown = MonsterObservation::new(MonsterId(1), 1, 0.5, "ballroom");
    assert!(strict.decide(&unknown, "orc").is_err());
    assert!(runtime.decide(&unknown, "orc").is_ok());
}
