use std::sync::Arc;

use intelligence_core::{Action, LearningConfig, MonsterId, Position, StateIndex};
use intelligence_runtime::{
    InMemoryKnowledgeRepository, IntelligenceRuntime, MonsterObservation, RuntimeConfig,
    SpeciesKnowledgeStore, Transition,
};

fn state(raw: usize) -> StateIndex {
    StateIndex::new(raw).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_rewards_lose_no_updates() {
    let store = Arc::new(SpeciesKnowledgeStore::new(LearningConfig::default()).unwrap());
    let before = store.summary("orc").map_or(0, |s| s.total_learning_steps);

    let mut tasks = Vec::with_capacity(1000);
    for tick in 0..1000u64 {
        let store = Arc::clone(&store);
        tasks.push(tokio::task::spawn_blocking(move || {
            store.apply_reward(
                "orc",
                Transition {
                    tick,
                    state: state(7),
                    action: Action::AttackAggressive,
                    reward: 1.0,
                    next_state: Some(state(8)),
                },
            )
        }));
    }
    for task in tasks {
        let applied = task.await.unwrap();
        // the returned row is the one this update produced
        assert_eq!(
            applied.q_values[Action::AttackAggressive.index()],
            applied.update.after
        );
    }

    let summary = store.summary("orc").unwrap();
    assert_eq!(summary.total_learning_steps - before, 1000);
    assert_eq!(summary.history_len, 100);

    // every update moved the cell towards 1.0, none were overwritten by a stale read
    let q = store.get_q_values("orc", state(7))[Action::AttackAggressive.index()];
    let expected = 1.0 - 0.9f64.powi(1000);
    assert!((q - expected).abs() < 1e-9, "q = {q}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn species_are_updated_independently() {
    let store = Arc::new(SpeciesKnowledgeStore::new(LearningConfig::default()).unwrap());
    let species = ["goblin", "wolf", "spider", "orc"];

    let mut tasks = Vec::new();
    for (i, name) in species.iter().enumerate() {
        for tick in 0..250u64 {
            let store = Arc::clone(&store);
            let name = (*name).to_owned();
            tasks.push(tokio::spawn(async move {
                store.record_encounter(&name);
                store.apply_reward(
                    &name,
                    Transition {
                        tick,
                        state: state(i),
                        action: Action::Defend,
                        reward: -1.0,
                        next_state: None,
                    },
                );
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    for name in species {
        let summary = store.summary(name).unwrap();
        assert_eq!(summary.total_learning_steps, 250, "{name}");
        assert_eq!(summary.encounters, 250, "{name}");
        assert_eq!(summary.nonzero, 1, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn monsters_decide_concurrently_within_a_tick() {
    let runtime = Arc::new(
        IntelligenceRuntime::builder()
            .config(RuntimeConfig::default())
            .repository(Arc::new(InMemoryKnowledgeRepository::new()))
            .build()
            .await
            .unwrap(),
    );

    let mut tasks = Vec::new();
    for id in 0..64u32 {
        let runtime = Arc::clone(&runtime);
        tasks.push(tokio::spawn(async move {
            let observation = MonsterObservation::new(MonsterId(id), 1, 0.8, "armory")
                .enemies(1)
                .threat_at(Position::new(1, 0));
            let decision = runtime.decide(&observation, "goblin").unwrap();
            runtime.apply_reward(&decision.snapshot, 1.0, decision.snapshot.state);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let summary = runtime.summary("goblin").unwrap();
    assert_eq!(summary.encounters, 64);
    assert_eq!(summary.total_learning_steps, 64);
    assert_eq!(runtime.memory().len(), 64);

    let runtime = Arc::into_inner(runtime).unwrap();
    runtime.shutdown().await.unwrap();
}
