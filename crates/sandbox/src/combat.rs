//! Dice combat and the reward table of a duel.

use intelligence_core::{PcgRng, RngOracle, compute_seed};

/// Reward for every combat outcome.
pub mod reward {
    pub const MISS: f64 = -1.0;
    pub const DEFENDED: f64 = 1.0;
    pub const AVOIDED: f64 = 1.0;
    pub const FLED: f64 = 2.0;
    pub const DIED_FLEEING: f64 = -50.0;
    pub const CALLED_ALLIES: f64 = 0.5;
    pub const IDLE_NEAR_THREAT: f64 = -0.5;
}

/// Independent draws made for one monster on one tick.
#[derive(Clone, Copy, Debug)]
#[repr(u32)]
pub enum Draw {
    MonsterAttack = 10,
    MonsterDamage = 11,
    ThreatAttack = 12,
    ThreatDamage = 13,
    Wander = 14,
}

/// Deterministic dice keyed by run seed, tick and monster.
#[derive(Clone, Copy, Debug)]
pub struct Dice {
    seed: u64,
}

impl Dice {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn roll(&self, tick: u64, actor: u32, draw: Draw, salt: u32, sides: u32) -> u32 {
        let seed = compute_seed(self.seed, tick, actor, ((draw as u32) << 8) | salt);
        PcgRng.range(seed, 1, sides.max(1))
    }

    /// d20 attack roll against `armor_class`. Natural 20 always hits and
    /// crits, natural 1 always misses.
    pub fn attack(&self, tick: u64, actor: u32, draw: Draw, bonus: i32, armor_class: i32) -> Attack {
        let natural = self.roll(tick, actor, draw, 0, 20);
        let critical = natural == 20;
        let hit = critical || (natural != 1 && natural as i32 + bonus >= armor_class);
        Attack { hit, critical }
    }

    /// `dice`d`sides` + `bonus`, dice doubled on a critical. Never negative.
    pub fn damage(
        &self,
        tick: u64,
        actor: u32,
        draw: Draw,
        dice: u32,
        sides: u32,
        bonus: i32,
        critical: bool,
    ) -> u32 {
        let count = if critical { dice * 2 } else { dice };
        let rolled: u32 = (0..count)
            .map(|i| self.roll(tick, actor, draw, i + 1, sides))
            .sum();
        (rolled as i32 + bonus).max(0) as u32
    }

    /// Uniform step in `-1..=1`.
    pub fn step(&self, tick: u64, actor: u32, axis: u32) -> i32 {
        self.roll(tick, actor, Draw::Wander, axis, 3) as i32 - 2
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attack {
    pub hit: bool,
    pub critical: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolls_are_reproducible() {
        let dice = Dice::new(7);
        for tick in 0..50 {
            assert_eq!(
                dice.attack(tick, 1, Draw::MonsterAttack, 2, 14),
                dice.attack(tick, 1, Draw::MonsterAttack, 2, 14)
            );
        }
    }

    #[test]
    fn hit_rate_follows_armor_class() {
        let dice = Dice::new(3);
        let hits = |ac| {
            (0..2_000u64)
                .filter(|tick| dice.attack(*tick, 1, Draw::ThreatAttack, 2, ac).hit)
                .count()
        };
        let easy = hits(5);
        let hard = hits(30);
        assert!(easy > 1_800, "easy {easy}");
        // only natural 20s land
        assert!(hard < 200, "hard {hard}");
    }

    #[test]
    fn criticals_double_the_dice() {
        let dice = Dice::new(11);
        for tick in 0..200 {
            let normal = dice.damage(tick, 2, Draw::MonsterDamage, 1, 6, 0, false);
            let critical = dice.damage(tick, 2, Draw::MonsterDamage, 1, 6, 0, true);
            assert!((1..=6).contains(&normal));
            assert!((2..=12).contains(&critical));
        }
        assert_eq!(dice.damage(0, 2, Draw::MonsterDamage, 1, 4, -10, false), 0);
    }

    #[test]
    fn steps_stay_adjacent() {
        let dice = Dice::new(5);
        for tick in 0..100 {
            assert!((-1..=1).contains(&dice.step(tick, 4, 0)));
        }
    }
}
