//! Skill levels and experience.
//!
//! # Level curve
//!
//! Advancing from level `n` to `n + 1` costs `25 * 2^n` experience points.
//! Points beyond a threshold carry over, so one large award can promote
//! several levels at once. Levels cap at [`MAX_SKILL_LEVEL`].
//!
//! # Effective level
//!
//! A tired or hungry agent works below their trained level: the effective
//! level is the trained level scaled by the performance rating, rounded to
//! the nearest whole level.

use std::collections::BTreeMap;

use marsim_types::SkillType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest reachable skill level.
pub const MAX_SKILL_LEVEL: u32 = 20;

/// Experience needed to start level 1.
const BASE_EXPERIENCE: f64 = 25.0;

/// Experience needed to advance from `level` to `level + 1`.
pub fn experience_to_next(level: u32) -> f64 {
    let exponent = i32::try_from(level.min(MAX_SKILL_LEVEL)).unwrap_or(0);
    BASE_EXPERIENCE * 2.0_f64.powi(exponent)
}

/// One trained skill.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Skill {
    /// Current level.
    pub level: u32,
    /// Experience accumulated toward the next level.
    pub experience: f64,
}

/// An agent's skills.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillManager {
    skills: BTreeMap<SkillType, Skill>,
}

impl SkillManager {
    /// No skills at all.
    pub const fn new() -> Self {
        Self {
            skills: BTreeMap::new(),
        }
    }

    /// Roll starting levels for a new colonist.
    ///
    /// Each skill starts at zero and gains a level on a 50% roll; the chance
    /// halves after every promotion.
    pub fn random(rng: &mut impl Rng) -> Self {
        let mut skills = BTreeMap::new();
        for skill in SkillType::ALL {
            let mut level = 0_u32;
            let mut chance = 0.5;
            while level < MAX_SKILL_LEVEL && rng.random_bool(chance) {
                level = level.saturating_add(1);
                chance /= 2.0;
            }
            if level > 0 {
                skills.insert(skill, Skill { level, experience: 0.0 });
            }
        }
        Self { skills }
    }

    /// Trained level. Unknown skills are level 0.
    pub fn skill_level(&self, skill: SkillType) -> u32 {
        self.skills.get(&skill).map_or(0, |entry| entry.level)
    }

    /// Experience toward the next level.
    pub fn experience(&self, skill: SkillType) -> f64 {
        self.skills.get(&skill).map_or(0.0, |entry| entry.experience)
    }

    /// Set a level directly, keeping no partial experience.
    pub fn set_skill_level(&mut self, skill: SkillType, level: u32) {
        self.skills.insert(
            skill,
            Skill {
                level: level.min(MAX_SKILL_LEVEL),
                experience: 0.0,
            },
        );
    }

    /// Level scaled by a performance rating in `0..=1`.
    pub fn effective_skill_level(&self, skill: SkillType, performance: f64) -> u32 {
        let scaled = (f64::from(self.skill_level(skill)) * performance.clamp(0.0, 1.0)).round();
        // Bounded by MAX_SKILL_LEVEL, so the conversion is exact.
        (0..=MAX_SKILL_LEVEL)
            .rev()
            .find(|level| f64::from(*level) <= scaled)
            .unwrap_or(0)
    }

    /// Add experience, creating the skill if needed. Returns the number of
    /// levels gained.
    pub fn add_experience(&mut self, skill: SkillType, points: f64) -> u32 {
        if !(points.is_finite() && points > 0.0) {
            return 0;
        }
        let entry = self.skills.entry(skill).or_default();
        if entry.level >= MAX_SKILL_LEVEL {
            return 0;
        }
        entry.experience += points;

        let start = entry.level;
        while entry.level < MAX_SKILL_LEVEL {
            let needed = experience_to_next(entry.level);
            if entry.experience < needed {
                break;
            }
            entry.experience -= needed;
            entry.level = entry.level.saturating_add(1);
        }
        if entry.level >= MAX_SKILL_LEVEL {
            entry.experience = 0.0;
        }
        let gained = entry.level.saturating_sub(start);
        if gained > 0 {
            debug!(?skill, level = entry.level, "skill promoted");
        }
        gained
    }

    /// Number of skills worth showing (level above zero).
    pub fn displayable_skill_count(&self) -> usize {
        self.skills.values().filter(|entry| entry.level > 0).count()
    }

    /// Levels of every known skill.
    pub fn levels(&self) -> BTreeMap<SkillType, u32> {
        self.skills
            .iter()
            .map(|(skill, entry)| (*skill, entry.level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn unknown_skill_is_level_zero() {
        let skills = SkillManager::new();
        assert_eq!(skills.skill_level(SkillType::Botany), 0);
    }

    #[test]
    fn experience_creates_and_promotes() {
        let mut skills = SkillManager::new();
        assert_eq!(skills.add_experience(SkillType::Mechanics, 10.0), 0);
        assert_eq!(skills.skill_level(SkillType::Mechanics), 0);
        // 25 for level 1, 50 for level 2: 10 + 70 = 80 leaves 5 over.
        assert_eq!(skills.add_experience(SkillType::Mechanics, 70.0), 2);
        assert_eq!(skills.skill_level(SkillType::Mechanics), 2);
        assert!((skills.experience(SkillType::Mechanics) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn promotion_is_deterministic() {
        let mut a = SkillManager::new();
        let mut b = SkillManager::new();
        for points in [3.0, 40.0, 0.5, 120.0] {
            a.add_experience(SkillType::Driving, points);
        }
        b.add_experience(SkillType::Driving, 163.5);
        assert_eq!(a.skill_level(SkillType::Driving), b.skill_level(SkillType::Driving));
        assert!((a.experience(SkillType::Driving) - b.experience(SkillType::Driving)).abs() < 1e-9);
    }

    #[test]
    fn levels_cap_at_maximum() {
        let mut skills = SkillManager::new();
        skills.add_experience(SkillType::Cooking, 1e12);
        assert_eq!(skills.skill_level(SkillType::Cooking), MAX_SKILL_LEVEL);
        assert_eq!(skills.add_experience(SkillType::Cooking, 100.0), 0);
    }

    #[test]
    fn nonsense_experience_is_ignored() {
        let mut skills = SkillManager::new();
        assert_eq!(skills.add_experience(SkillType::Cooking, -5.0), 0);
        assert_eq!(skills.add_experience(SkillType::Cooking, f64::NAN), 0);
        assert_eq!(skills.displayable_skill_count(), 0);
    }

    #[test]
    fn poor_performance_lowers_effective_level() {
        let mut skills = SkillManager::new();
        skills.set_skill_level(SkillType::Construction, 4);
        assert_eq!(skills.effective_skill_level(SkillType::Construction, 1.0), 4);
        assert_eq!(skills.effective_skill_level(SkillType::Construction, 0.5), 2);
        assert_eq!(skills.effective_skill_level(SkillType::Construction, 0.0), 0);
    }

    #[test]
    fn random_levels_are_reproducible() {
        let a = SkillManager::random(&mut SmallRng::seed_from_u64(5));
        let b = SkillManager::random(&mut SmallRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
