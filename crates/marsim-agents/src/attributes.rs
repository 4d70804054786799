//! Natural attributes.
//!
//! Every agent carries a score from 0 to 100 for each
//! [`NaturalAttribute`]. New colonists roll each score as the sum of four
//! draws in `0..=25`, which centers the population on 50.

use std::collections::BTreeMap;

use marsim_types::NaturalAttribute;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Highest attribute score.
pub const MAX_ATTRIBUTE: u8 = 100;

/// Score of an attribute nobody set.
pub const NEUTRAL_ATTRIBUTE: u8 = 50;

/// An agent's natural attribute scores.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NaturalAttributes {
    scores: BTreeMap<NaturalAttribute, u8>,
}

impl NaturalAttributes {
    /// Every attribute at the neutral score.
    pub fn neutral() -> Self {
        Self {
            scores: NaturalAttribute::ALL
                .iter()
                .map(|attribute| (*attribute, NEUTRAL_ATTRIBUTE))
                .collect(),
        }
    }

    /// Roll a fresh set of scores.
    pub fn random(rng: &mut impl Rng) -> Self {
        let scores = NaturalAttribute::ALL
            .iter()
            .map(|attribute| {
                let score = (0..4).fold(0_u8, |sum, _| sum.saturating_add(rng.random_range(0..=25)));
                (*attribute, score.min(MAX_ATTRIBUTE))
            })
            .collect();
        Self { scores }
    }

    /// Score of one attribute. Unset attributes read as neutral.
    pub fn get(&self, attribute: NaturalAttribute) -> u8 {
        self.scores
            .get(&attribute)
            .copied()
            .unwrap_or(NEUTRAL_ATTRIBUTE)
    }

    /// Set a score, clamped to `0..=100`.
    pub fn set(&mut self, attribute: NaturalAttribute, score: u8) {
        self.scores.insert(attribute, score.min(MAX_ATTRIBUTE));
    }

    /// Signed distance from the neutral score as a fraction, in `-0.5..=0.5`.
    ///
    /// Used to scale capabilities and experience gains.
    pub fn modifier(&self, attribute: NaturalAttribute) -> f64 {
        (f64::from(self.get(attribute)) - f64::from(NEUTRAL_ATTRIBUTE)) / 100.0
    }

    /// All scores in attribute order.
    pub fn iter(&self) -> impl Iterator<Item = (NaturalAttribute, u8)> + '_ {
        NaturalAttribute::ALL
            .iter()
            .map(|attribute| (*attribute, self.get(*attribute)))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn set_clamps_to_one_hundred() {
        let mut attributes = NaturalAttributes::neutral();
        attributes.set(NaturalAttribute::Strength, 250);
        assert_eq!(attributes.get(NaturalAttribute::Strength), 100);
    }

    #[test]
    fn unset_attributes_read_neutral() {
        let attributes = NaturalAttributes::default();
        assert_eq!(attributes.get(NaturalAttribute::Teaching), NEUTRAL_ATTRIBUTE);
        assert!(attributes.modifier(NaturalAttribute::Teaching).abs() < f64::EPSILON);
    }

    #[test]
    fn random_scores_stay_in_range() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            let attributes = NaturalAttributes::random(&mut rng);
            assert_eq!(attributes.iter().count(), NaturalAttribute::ALL.len());
            assert!(attributes.iter().all(|(_, score)| score <= MAX_ATTRIBUTE));
        }
    }
}
