//! Registry of per-monster threat memories.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use intelligence_core::{ConfigError, MemoryConfig, MonsterId, Sighting, ThreatEvent, ThreatMemory};
use tracing::debug;

/// Owns one [`ThreatMemory`] per live monster.
///
/// Memories are created on spawn (or on first observation) and dropped when
/// the monster leaves the simulation. Nothing here is persisted.
pub struct MemorySystem {
    config: MemoryConfig,
    memories: Mutex<HashMap<MonsterId, ThreatMemory>>,
}

impl MemorySystem {
    pub fn new(config: MemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            memories: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn memories(&self) -> MutexGuard<'_, HashMap<MonsterId, ThreatMemory>> {
        self.memories.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an empty memory; an existing one is kept.
    pub fn spawn(&self, monster: MonsterId) {
        self.memories()
            .entry(monster)
            .or_insert_with(|| ThreatMemory::new(&self.config));
    }

    /// Forgets a monster. Returns whether it was known.
    pub fn remove(&self, monster: MonsterId) -> bool {
        let removed = self.memories().remove(&monster).is_some();
        if removed {
            debug!(%monster, "memory released");
        }
        removed
    }

    pub fn contains(&self, monster: MonsterId) -> bool {
        self.memories().contains_key(&monster)
    }

    pub fn len(&self) -> usize {
        self.memories().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a perceived threat for `monster`, spawning its memory if needed.
    pub fn observe(&self, monster: MonsterId, event: ThreatEvent) {
        self.memories()
            .entry(monster)
            .or_insert_with(|| ThreatMemory::new(&self.config))
            .observe(event);
    }

    /// Applies intensity decay up to `tick`.
    pub fn decay(&self, monster: MonsterId, tick: u64) {
        if let Some(memory) = self.memories().get_mut(&monster) {
            memory.decay(tick);
        }
    }

    /// Last sighting that is still fresh at `tick`.
    pub fn recall(&self, monster: MonsterId, tick: u64) -> Option<Sighting> {
        self.memories().get(&monster)?.recall(tick)
    }

    /// Copies `from`'s events into `to` scaled by `blend`. Returns the number
    /// of events `to` holds afterwards; zero if `from` is unknown.
    pub fn share(&self, from: MonsterId, to: MonsterId, blend: f64) -> usize {
        if from == to {
            return self.memories().get(&from).map_or(0, ThreatMemory::len);
        }

        let mut memories = self.memories();
        let Some(source) = memories.get(&from).cloned() else {
            return 0;
        };
        let target = memories
            .entry(to)
            .or_insert_with(|| ThreatMemory::new(&self.config));
        source.share_with(target, blend);
        debug!(%from, %to, blend, events = target.len(), "memory shared");
        target.len()
    }
}

#[cfg(test)]
mod tests {
    use intelligence_core::{Position, ThreatKind};

    use super::*;

    fn system() -> MemorySystem {
        MemorySystem::new(MemoryConfig::default()).unwrap()
    }

    fn sighting(tick: u64) -> ThreatEvent {
        ThreatEvent::new(99, Position::new(4, 4), tick, ThreatKind::Player)
    }

    #[test]
    fn lifecycle_follows_spawn_and_remove() {
        let memory = system();
        memory.spawn(MonsterId(1));
        assert!(memory.contains(MonsterId(1)));
        assert!(memory.recall(MonsterId(1), 0).is_none());

        memory.observe(MonsterId(1), sighting(3));
        assert_eq!(memory.recall(MonsterId(1), 5).map(|s| s.tick), Some(3));

        assert!(memory.remove(MonsterId(1)));
        assert!(!memory.remove(MonsterId(1)));
        assert!(memory.recall(MonsterId(1), 5).is_none());
    }

    #[test]
    fn stale_sightings_are_not_recalled() {
        let memory = system();
        memory.observe(MonsterId(2), sighting(0));
        assert!(memory.recall(MonsterId(2), 10).is_some());
        assert!(memory.recall(MonsterId(2), 11).is_none());
    }

    #[test]
    fn memories_are_not_shared_implicitly() {
        let memory = system();
        memory.observe(MonsterId(1), sighting(1));
        memory.spawn(MonsterId(2));
        assert!(memory.recall(MonsterId(2), 1).is_none());

        assert_eq!(memory.share(MonsterId(1), MonsterId(2), 0.5), 1);
        assert!(memory.recall(MonsterId(2), 1).is_some());
        assert_eq!(memory.share(MonsterId(7), MonsterId(2), 0.5), 0);
    }

    #[test]
    fn rejects_oversized_capacity() {
        let config = MemoryConfig {
            capacity: 64,
            ..MemoryConfig::default()
        };
        assert!(MemorySystem::new(config).is_err());
    }
}
