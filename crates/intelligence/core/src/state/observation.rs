//! Validated encoder input.
//!
//! Observations are checked once at construction so the encoder itself is a
//! total function. Malformed data fails here with a caller-correctable error
//! instead of silently landing in bin 0.

use std::collections::HashMap;

use super::RoomCategory;
use crate::error::{ErrorSeverity, IntelligenceError};

/// Rejected observation input.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ObservationError {
    #[error("hp ratio {0} is not within [0, 1]")]
    HpRatioOutOfRange(f64),

    #[error("distance to threat {0} is negative or not finite")]
    InvalidDistance(f64),

    #[error("room type is empty")]
    EmptyRoomType,

    #[error("room type {0:?} has no category and the room table has no fallback")]
    UnknownRoomType(String),

    #[error("state index {0} is outside the state space")]
    StateOutOfRange(usize),
}

impl IntelligenceError for ObservationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::HpRatioOutOfRange(_) => "hp_ratio_out_of_range",
            Self::InvalidDistance(_) => "invalid_distance",
            Self::EmptyRoomType => "empty_room_type",
            Self::UnknownRoomType(_) => "unknown_room_type",
            Self::StateOutOfRange(_) => "state_out_of_range",
        }
    }
}

/// A monster's situation, already validated.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Observation {
    hp_ratio: f64,
    nearby_enemies: u32,
    nearby_allies: u32,
    room: RoomCategory,
    distance_to_threat: Option<f64>,
}

impl Observation {
    /// Validates raw fields into an observation.
    ///
    /// `distance_to_threat` is `None` when no threat is known.
    pub fn new(
        hp_ratio: f64,
        nearby_enemies: u32,
        nearby_allies: u32,
        room: RoomCategory,
        distance_to_threat: Option<f64>,
    ) -> Result<Self, ObservationError> {
        if !(0.0..=1.0).contains(&hp_ratio) {
            return Err(ObservationError::HpRatioOutOfRange(hp_ratio));
        }
        if let Some(distance) = distance_to_threat
            && !(distance.is_finite() && distance >= 0.0)
        {
            return Err(ObservationError::InvalidDistance(distance));
        }

        Ok(Self {
            hp_ratio,
            nearby_enemies,
            nearby_allies,
            room,
            distance_to_threat,
        })
    }

    pub fn hp_ratio(&self) -> f64 {
        self.hp_ratio
    }

    pub fn nearby_enemies(&self) -> u32 {
        self.nearby_enemies
    }

    pub fn nearby_allies(&self) -> u32 {
        self.nearby_allies
    }

    pub fn room(&self) -> RoomCategory {
        self.room
    }

    pub fn distance_to_threat(&self) -> Option<f64> {
        self.distance_to_threat
    }
}

/// Lookup table from concrete room types to [`RoomCategory`].
///
/// The default table maps every room type the dungeon generator produces and
/// falls back to [`RoomCategory::Safe`] for anything else. [`RoomTable::strict`]
/// drops the fallback so unknown room types are rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomTable {
    rooms: HashMap<String, RoomCategory>,
    fallback: Option<RoomCategory>,
}

impl RoomTable {
    const DEFAULT_ROOMS: &'static [(&'static str, RoomCategory)] = &[
        ("armory", RoomCategory::Combat),
        ("guard_post", RoomCategory::Combat),
        ("throne_room", RoomCategory::Combat),
        ("chamber", RoomCategory::Safe),
        ("bedroom", RoomCategory::Safe),
        ("library", RoomCategory::Safe),
        ("storage", RoomCategory::Safe),
        ("dining_hall", RoomCategory::Safe),
        ("treasury", RoomCategory::Treasure),
        ("crypt", RoomCategory::Treasure),
        ("dungeon_cell", RoomCategory::Treasure),
        ("alchemy_lab", RoomCategory::Treasure),
    ];

    /// Default table without a fallback.
    pub fn strict() -> Self {
        Self {
            rooms: Self::DEFAULT_ROOMS
                .iter()
                .map(|(name, category)| ((*name).to_owned(), *category))
                .collect(),
            fallback: None,
        }
    }

    /// Empty table; every room must be registered with [`RoomTable::with_room`].
    pub fn empty() -> Self {
        Self {
            rooms: HashMap::new(),
            fallback: None,
        }
    }

    /// Registers or replaces a room type (builder pattern).
    #[must_use]
    pub fn with_room(mut self, room_type: impl Into<String>, category: RoomCategory) -> Self {
        self.rooms
            .insert(room_type.into().to_ascii_lowercase(), category);
        self
    }

    /// Sets the category used for unregistered room types (builder pattern).
    #[must_use]
    pub fn with_fallback(mut self, fallback: Option<RoomCategory>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Option<RoomCategory> {
        self.fallback
    }

    /// Whether `room_type` is registered explicitly.
    pub fn contains(&self, room_type: &str) -> bool {
        self.rooms.contains_key(&room_type.trim().to_ascii_lowercase())
    }

    /// Resolves a room type, case-insensitively.
    pub fn categorize(&self, room_type: &str) -> Result<RoomCategory, ObservationError> {
        let key = room_type.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(ObservationError::EmptyRoomType);
        }

        self.rooms
            .get(&key)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| ObservationError::UnknownRoomType(room_type.to_owned()))
    }
}

impl Default for RoomTable {
    fn default() -> Self {
        Self::strict().with_fallback(Some(RoomCategory::Safe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_hp_outside_unit_interval() {
        for hp in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            let err = Observation::new(hp, 0, 0, RoomCategory::Safe, None).unwrap_err();
            assert!(matches!(err, ObservationError::HpRatioOutOfRange(_)));
            assert_eq!(err.severity(), ErrorSeverity::Validation);
        }
        assert!(Observation::new(0.0, 0, 0, RoomCategory::Safe, None).is_ok());
        assert!(Observation::new(1.0, 0, 0, RoomCategory::Safe, None).is_ok());
    }

    #[test]
    fn rejects_negative_or_infinite_distance() {
        for distance in [-1.0, f64::NAN, f64::INFINITY] {
            let err =
                Observation::new(0.5, 1, 0, RoomCategory::Combat, Some(distance)).unwrap_err();
            assert_eq!(err.error_code(), "invalid_distance");
        }
    }

    #[test]
    fn default_table_falls_back_to_safe() {
        let table = RoomTable::default();
        assert_eq!(table.categorize("Armory").unwrap(), RoomCategory::Combat);
        assert_eq!(table.categorize("treasury").unwrap(), RoomCategory::Treasure);
        assert_eq!(table.categorize("ballroom").unwrap(), RoomCategory::Safe);
        assert_eq!(table.categorize("  ").unwrap_err(), ObservationError::EmptyRoomType);
    }

    #[test]
    fn strict_table_rejects_unknown_rooms() {
        let table = RoomTable::strict();
        assert_eq!(
            table.categorize("ballroom").unwrap_err(),
            ObservationError::UnknownRoomType("ballroom".into())
        );

        let table = table.with_room("Ballroom", RoomCategory::Combat);
        assert_eq!(table.categorize("ballroom").unwrap(), RoomCategory::Combat);
    }
}
