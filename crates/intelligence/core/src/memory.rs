//! Short-term threat memory of a single monster.
//!
//! A [`ThreatMemory`] remembers where a threat was last seen and keeps a small
//! fixed-capacity list of recent [`ThreatEvent`]s. It lives only as long as
//! the monster instance and is never persisted.

use arrayvec::ArrayVec;

use crate::config::MemoryConfig;

/// Hard upper bound on events kept per monster.
pub const MAX_THREAT_EVENTS: usize = 16;

/// Events whose intensity falls to this value or below are forgotten.
const INTENSITY_FLOOR: f64 = 0.05;

/// Identifier of one monster instance in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MonsterId(pub u32);

impl std::fmt::Display for MonsterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "monster#{}", self.0)
    }
}

/// Grid position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in tiles.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ThreatKind {
    Player,
    Trap,
    Environment,
    #[default]
    Unknown,
}

/// One remembered danger.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreatEvent {
    /// Entity that caused the event.
    pub source: u32,
    pub position: Position,
    pub intensity: f64,
    /// Tick of the sighting.
    pub tick: u64,
    pub kind: ThreatKind,
    /// Tick up to which `intensity` has been decayed.
    pub decayed_at: u64,
}

impl ThreatEvent {
    pub fn new(source: u32, position: Position, tick: u64, kind: ThreatKind) -> Self {
        Self {
            source,
            position,
            intensity: 1.0,
            tick,
            kind,
            decayed_at: tick,
        }
    }

    #[must_use]
    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    fn decay(&mut self, current_tick: u64, rate: f64) {
        let elapsed = current_tick.saturating_sub(self.decayed_at) as f64;
        self.intensity *= (1.0 - rate * elapsed).max(0.0);
        self.decayed_at = self.decayed_at.max(current_tick);
    }
}

/// Last confirmed sighting of a threat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sighting {
    pub position: Position,
    pub tick: u64,
}

/// Per-monster threat memory.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatMemory {
    capacity: usize,
    intensity_decay: f64,
    stale_after_ticks: u64,
    last_sighting: Option<Sighting>,
    last_decay_tick: u64,
    events: ArrayVec<ThreatEvent, MAX_THREAT_EVENTS>,
}

impl ThreatMemory {
    /// `config.capacity` is clamped into `1..=MAX_THREAT_EVENTS`.
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            capacity: config.capacity.clamp(1, MAX_THREAT_EVENTS),
            intensity_decay: config.intensity_decay,
            stale_after_ticks: config.stale_after_ticks,
            last_sighting: None,
            last_decay_tick: 0,
            events: ArrayVec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Oldest first.
    pub fn events(&self) -> &[ThreatEvent] {
        &self.events
    }

    pub fn last_sighting(&self) -> Option<Sighting> {
        self.last_sighting
    }

    /// Records a perceived threat: updates the last sighting and remembers
    /// the event.
    pub fn observe(&mut self, event: ThreatEvent) {
        let newer = self
            .last_sighting
            .is_none_or(|sighting| sighting.tick <= event.tick);
        if newer {
            self.last_sighting = Some(Sighting {
                position: event.position,
                tick: event.tick,
            });
        }
        self.remember(event);
    }

    /// Appends an event, evicting the oldest when at capacity.
    pub fn remember(&mut self, event: ThreatEvent) {
        if self.events.len() >= self.capacity {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    /// Applies intensity decay up to `current_tick` and prunes faded events.
    /// Idempotent within a tick.
    pub fn decay(&mut self, current_tick: u64) {
        if current_tick == self.last_decay_tick {
            return;
        }
        let rate = self.intensity_decay;
        for event in self.events.iter_mut() {
            event.decay(current_tick, rate);
        }
        self.events.retain(|event| event.intensity > INTENSITY_FLOOR);
        self.last_decay_tick = current_tick;
    }

    /// Last sighting if it is not older than `stale_after_ticks`.
    pub fn recall(&self, current_tick: u64) -> Option<Sighting> {
        self.last_sighting
            .filter(|sighting| current_tick.saturating_sub(sighting.tick) <= self.stale_after_ticks)
    }

    /// Copies every event into `other` with intensity scaled by `blend`
    /// (clamped to `[0, 1]`). The receiver's last sighting is refreshed from
    /// the newest shared event and keeps its original sighting tick.
    pub fn share_with(&self, other: &mut ThreatMemory, blend: f64) {
        let blend = if blend.is_nan() { 0.0 } else { blend.clamp(0.0, 1.0) };
        for event in &self.events {
            let scaled = event.clone().with_intensity(event.intensity * blend);
            if scaled.intensity > INTENSITY_FLOOR {
                other.observe(scaled);
            }
        }
    }

    /// Drops every event and the last sighting.
    pub fn clear(&mut self) {
        self.events.clear();
        self.last_sighting = None;
    }
}

impl Default for ThreatMemory {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tick: u64) -> ThreatEvent {
        ThreatEvent::new(1, Position::new(tick as i32, 0), tick, ThreatKind::Player)
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut memory = ThreatMemory::default();
        for tick in 0..8 {
            memory.observe(event(tick));
        }
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.events()[0].tick, 3);
        assert_eq!(memory.events()[4].tick, 7);
    }

    #[test]
    fn recall_expires_after_stale_window() {
        let mut memory = ThreatMemory::default();
        memory.observe(event(20));
        assert_eq!(memory.recall(25).map(|s| s.tick), Some(20));
        assert!(memory.recall(30).is_some());
        assert!(memory.recall(31).is_none());
    }

    #[test]
    fn older_events_do_not_move_the_sighting_back() {
        let mut memory = ThreatMemory::default();
        memory.observe(event(10));
        memory.observe(event(4));
        assert_eq!(memory.last_sighting().map(|s| s.tick), Some(10));
    }

    #[test]
    fn decay_prunes_faded_events() {
        let mut memory = ThreatMemory::default();
        memory.observe(event(0));
        memory.observe(event(0).with_intensity(0.055));

        memory.decay(2);
        assert_eq!(memory.len(), 1);
        assert!((memory.events()[0].intensity - 0.9).abs() < 1e-12);

        // second call within the same tick is a no-op
        memory.decay(2);
        assert!((memory.events()[0].intensity - 0.9).abs() < 1e-12);

        memory.decay(40);
        assert!(memory.is_empty());
        assert!(memory.last_sighting().is_some());
    }

    #[test]
    fn shared_sightings_keep_their_age() {
        let mut scout = ThreatMemory::default();
        scout.observe(event(5));
        scout.decay(8);
        assert_eq!(scout.events()[0].tick, 5);
        assert_eq!(scout.events()[0].decayed_at, 8);

        let mut ally = ThreatMemory::default();
        scout.share_with(&mut ally, 1.0);
        assert_eq!(ally.last_sighting().map(|s| s.tick), Some(5));
        assert!(ally.recall(15).is_some());
        assert!(ally.recall(16).is_none());
    }

    #[test]
    fn decay_is_measured_from_the_last_pass() {
        let mut memory = ThreatMemory::default();
        memory.observe(event(0));
        memory.decay(2);
        memory.decay(4);
        // 1.0 * 0.9 * 0.9
        assert!((memory.events()[0].intensity - 0.81).abs() < 1e-12);
        assert_eq!(memory.events()[0].tick, 0);
    }

    #[test]
    fn share_scales_intensity() {
        let mut scout = ThreatMemory::default();
        scout.observe(event(5));
        let mut ally = ThreatMemory::default();

        scout.share_with(&mut ally, 0.5);
        assert_eq!(ally.len(), 1);
        assert!((ally.events()[0].intensity - 0.5).abs() < 1e-12);
        assert_eq!(ally.recall(6).map(|s| s.position), Some(Position::new(5, 0)));

        let mut deaf = ThreatMemory::default();
        scout.share_with(&mut deaf, 0.0);
        assert!(deaf.is_empty());
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Position::new(0, 0).distance(&Position::new(3, 4)), 5.0);
    }
}
