use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{check_familiarity_increment, ConfigError};
use crate::personality::{CompatibilityTable, TraitSet};
use crate::types::{AgentId, AgentPair};

/// What two agents know and think of each other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub familiarity: f32, // 0.0 to 1.0, never decreases
    pub friendship: f32,  // -1.0 to 1.0
    pub interaction_count: u32,
}

impl RelationshipRecord {
    pub fn new() -> Self {
        Self {
            familiarity: 0.0,
            friendship: 0.0,
            interaction_count: 0,
        }
    }

    pub fn level(&self) -> RelationshipLevel {
        RelationshipLevel::of(self)
    }
}

impl Default for RelationshipRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse reading of a relationship, used to flavor dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLevel {
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
    Rival,
}

impl RelationshipLevel {
    pub fn of(record: &RelationshipRecord) -> Self {
        match (record.friendship, record.familiarity) {
            _ if record.interaction_count == 0 => RelationshipLevel::Stranger,
            (f, _) if f <= -0.3 => RelationshipLevel::Rival,
            (f, fam) if f >= 0.6 && fam >= 0.5 => RelationshipLevel::CloseFriend,
            (f, fam) if f >= 0.3 && fam >= 0.15 => RelationshipLevel::Friend,
            _ => RelationshipLevel::Acquaintance,
        }
    }

    /// Level for a pair that may not have a record yet
    pub fn of_optional(record: Option<&RelationshipRecord>) -> Self {
        record.map_or(RelationshipLevel::Stranger, RelationshipLevel::of)
    }

    pub fn describe(self) -> &'static str {
        match self {
            RelationshipLevel::Stranger => "a stranger",
            RelationshipLevel::Acquaintance => "an acquaintance",
            RelationshipLevel::Friend => "a friend",
            RelationshipLevel::CloseFriend => "a close friend",
            RelationshipLevel::Rival => "someone you don't get along with",
        }
    }
}

/// Relationship records for every pair that has completed a conversation
#[derive(Debug, Clone)]
pub struct RelationshipStore {
    records: BTreeMap<AgentPair, RelationshipRecord>,
    compatibility: CompatibilityTable,
    familiarity_increment: f32,
}

impl RelationshipStore {
    /// Fails when `familiarity_increment` is not in `(0, 1]`
    pub fn new(
        compatibility: CompatibilityTable,
        familiarity_increment: f32,
    ) -> Result<Self, ConfigError> {
        check_familiarity_increment(familiarity_increment)?;
        Ok(Self {
            records: BTreeMap::new(),
            compatibility,
            familiarity_increment,
        })
    }

    pub fn get(&self, pair: &AgentPair) -> Option<&RelationshipRecord> {
        self.records.get(pair)
    }

    pub fn between(&self, a: AgentId, b: AgentId) -> Option<&RelationshipRecord> {
        self.get(&AgentPair::new(a, b))
    }

    /// Records one completed conversation between the pair.
    ///
    /// `traits_a` and `traits_b` may be given in either order; the
    /// compatibility score is symmetric.
    pub fn update(
        &mut self,
        pair: AgentPair,
        traits_a: &TraitSet,
        traits_b: &TraitSet,
    ) -> &RelationshipRecord {
        let mut delta = self.compatibility.score(traits_a, traits_b);
        if !delta.is_finite() {
            log::warn!("Compatibility score for {} overflowed, ignoring it", pair);
            delta = 0.0;
        }
        let increment = self.familiarity_increment;

        let record = self.records.entry(pair).or_insert_with(RelationshipRecord::new);
        record.familiarity = (record.familiarity + increment).min(1.0);
        record.friendship = (record.friendship + delta).clamp(-1.0, 1.0);
        record.interaction_count = record.interaction_count.saturating_add(1);

        log::debug!(
            "Relationship {} now familiarity={:.2} friendship={:+.2} count={}",
            pair,
            record.familiarity,
            record.friendship,
            record.interaction_count
        );
        record
    }

    /// Records in pair order
    pub fn iter(&self) -> impl Iterator<Item = (&AgentPair, &RelationshipRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::PersonalityTrait::*;

    fn store() -> RelationshipStore {
        RelationshipStore::new(CompatibilityTable::default(), 0.05).unwrap()
    }

    #[test]
    fn first_update_creates_record() {
        let mut store = store();
        let pair = AgentPair::new(AgentId(1), AgentId(2));
        assert!(store.get(&pair).is_none());

        let record = store
            .update(pair, &TraitSet::from([Friendly]), &TraitSet::from([Shy]))
            .clone();
        assert!((record.familiarity - 0.05).abs() < 1e-6);
        assert!((record.friendship - 0.1).abs() < 1e-6);
        assert_eq!(record.interaction_count, 1);
        assert_eq!(store.between(AgentId(2), AgentId(1)), Some(&record));
    }

    #[test]
    fn values_saturate_at_bounds() {
        let mut store = store();
        let pair = AgentPair::new(AgentId(1), AgentId(2));
        let serious = TraitSet::from([Serious, Stern]);
        let playful = TraitSet::from([Playful]);
        for _ in 0..100 {
            store.update(pair, &serious, &playful);
        }
        let record = store.get(&pair).unwrap();
        assert_eq!(record.familiarity, 1.0);
        assert_eq!(record.friendship, -1.0);
        assert_eq!(record.interaction_count, 100);
        assert_eq!(record.level(), RelationshipLevel::Rival);
    }

    #[test]
    fn unlisted_traits_leave_friendship_alone() {
        let mut store = store();
        let pair = AgentPair::new(AgentId(4), AgentId(9));
        let record = store.update(pair, &TraitSet::from([Wise]), &TraitSet::from([Kind]));
        assert_eq!(record.friendship, 0.0);
        assert_eq!(record.level(), RelationshipLevel::Acquaintance);
    }

    #[test]
    fn rejects_increments_that_break_bounds() {
        for increment in [0.0, -0.5, 1.5, f32::NAN, f32::INFINITY] {
            assert!(
                RelationshipStore::new(CompatibilityTable::default(), increment).is_err(),
                "accepted {}",
                increment
            );
        }
        assert!(RelationshipStore::new(CompatibilityTable::empty(), 1.0).is_ok());
    }

    #[test]
    fn overflowing_score_leaves_friendship_finite() {
        let table = CompatibilityTable::empty()
            .with_delta(Friendly, Shy, f32::MAX)
            .and_then(|t| t.with_delta(Friendly, Calm, f32::MAX))
            .unwrap();
        let mut store = RelationshipStore::new(table, 0.05).unwrap();
        let pair = AgentPair::new(AgentId(1), AgentId(2));
        let record = store.update(pair, &TraitSet::from([Friendly]), &TraitSet::from([Shy, Calm]));
        assert_eq!(record.friendship, 0.0);
        assert!((record.familiarity - 0.05).abs() < 1e-6);
    }

    #[test]
    fn levels_follow_metrics() {
        assert_eq!(RelationshipLevel::of_optional(None), RelationshipLevel::Stranger);
        let friend = RelationshipRecord {
            familiarity: 0.2,
            friendship: 0.4,
            interaction_count: 4,
        };
        assert_eq!(friend.level(), RelationshipLevel::Friend);
        let close = RelationshipRecord {
            familiarity: 0.8,
            friendship: 0.9,
            interaction_count: 16,
        };
        assert_eq!(close.level(), RelationshipLevel::CloseFriend);
    }
}
