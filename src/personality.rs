//! Personality traits and the trait-compatibility table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::types::Pair;

/// Friendship change contributed by a complementary trait pair
pub const COMPLEMENTARY_BONUS: f32 = 0.1;

/// Friendship change contributed by a clashing trait pair
pub const CLASH_PENALTY: f32 = -0.1;

/// A single personality trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityTrait {
    Friendly,
    Shy,
    Serious,
    Playful,
    Talkative,
    Reserved,
    Wise,
    Curious,
    Kind,
    Stern,
    Cautious,
    Gossipy,
    Calm,
    Mysterious,
    Hardworking,
    Creative,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 16] = [
        PersonalityTrait::Friendly,
        PersonalityTrait::Shy,
        PersonalityTrait::Serious,
        PersonalityTrait::Playful,
        PersonalityTrait::Talkative,
        PersonalityTrait::Reserved,
        PersonalityTrait::Wise,
        PersonalityTrait::Curious,
        PersonalityTrait::Kind,
        PersonalityTrait::Stern,
        PersonalityTrait::Cautious,
        PersonalityTrait::Gossipy,
        PersonalityTrait::Calm,
        PersonalityTrait::Mysterious,
        PersonalityTrait::Hardworking,
        PersonalityTrait::Creative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PersonalityTrait::Friendly => "friendly",
            PersonalityTrait::Shy => "shy",
            PersonalityTrait::Serious => "serious",
            PersonalityTrait::Playful => "playful",
            PersonalityTrait::Talkative => "talkative",
            PersonalityTrait::Reserved => "reserved",
            PersonalityTrait::Wise => "wise",
            PersonalityTrait::Curious => "curious",
            PersonalityTrait::Kind => "kind",
            PersonalityTrait::Stern => "stern",
            PersonalityTrait::Cautious => "cautious",
            PersonalityTrait::Gossipy => "gossipy",
            PersonalityTrait::Calm => "calm",
            PersonalityTrait::Mysterious => "mysterious",
            PersonalityTrait::Hardworking => "hardworking",
            PersonalityTrait::Creative => "creative",
        }
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityTrait {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PersonalityTrait::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown personality trait: '{}'", s.trim()))
    }
}

/// The traits of one agent. Ordered so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitSet(BTreeSet<PersonalityTrait>);

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, personality_trait: PersonalityTrait) -> bool {
        self.0.insert(personality_trait)
    }

    pub fn contains(&self, personality_trait: PersonalityTrait) -> bool {
        self.0.contains(&personality_trait)
    }

    pub fn iter(&self) -> impl Iterator<Item = PersonalityTrait> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The trait used to pick a voice for template lines
    pub fn dominant(&self) -> Option<PersonalityTrait> {
        self.0.first().copied()
    }
}

impl FromIterator<PersonalityTrait> for TraitSet {
    fn from_iter<I: IntoIterator<Item = PersonalityTrait>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[PersonalityTrait; N]> for TraitSet {
    fn from(traits: [PersonalityTrait; N]) -> Self {
        traits.into_iter().collect()
    }
}

/// Parses the comma-separated form, e.g. `"friendly,hardworking"`
impl FromStr for TraitSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PersonalityTrait::from_str)
            .collect()
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(PersonalityTrait::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// One entry of a compatibility table as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub a: PersonalityTrait,
    pub b: PersonalityTrait,
    pub delta: f32,
}

/// Friendship deltas keyed by unordered trait pairs.
///
/// Pairs without an entry contribute nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityTable {
    entries: HashMap<Pair<PersonalityTrait>, f32>,
}

impl CompatibilityTable {
    /// A table with no entries; every score is zero
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_complementary(self, a: PersonalityTrait, b: PersonalityTrait) -> Self {
        self.with_entry(a, b, COMPLEMENTARY_BONUS)
    }

    pub fn with_clash(self, a: PersonalityTrait, b: PersonalityTrait) -> Self {
        self.with_entry(a, b, CLASH_PENALTY)
    }

    /// Sets the delta for a trait pair. Non-finite deltas are rejected.
    pub fn with_delta(
        self,
        a: PersonalityTrait,
        b: PersonalityTrait,
        delta: f32,
    ) -> Result<Self, ConfigError> {
        if !delta.is_finite() {
            return Err(ConfigError::InvalidCompatibility { a, b, delta });
        }
        Ok(self.with_entry(a, b, delta))
    }

    /// Applies configured rules on top of this table, replacing existing entries
    pub fn with_rules<'a>(
        self,
        rules: impl IntoIterator<Item = &'a CompatibilityRule>,
    ) -> Result<Self, ConfigError> {
        rules
            .into_iter()
            .try_fold(self, |table, rule| table.with_delta(rule.a, rule.b, rule.delta))
    }

    fn with_entry(mut self, a: PersonalityTrait, b: PersonalityTrait, delta: f32) -> Self {
        self.entries.insert(Pair::new(a, b), delta);
        self
    }

    pub fn delta(&self, a: PersonalityTrait, b: PersonalityTrait) -> f32 {
        self.entries.get(&Pair::new(a, b)).copied().unwrap_or(0.0)
    }

    /// Sum of the deltas over every cross pair of the two trait sets
    pub fn score(&self, a: &TraitSet, b: &TraitSet) -> f32 {
        a.iter()
            .flat_map(|ta| b.iter().map(move |tb| (ta, tb)))
            .map(|(ta, tb)| self.delta(ta, tb))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        use PersonalityTrait::*;

        Self::empty()
            .with_complementary(Friendly, Shy)
            .with_complementary(Talkative, Reserved)
            .with_complementary(Wise, Curious)
            .with_complementary(Kind, Cautious)
            .with_complementary(Calm, Talkative)
            .with_complementary(Hardworking, Creative)
            .with_clash(Serious, Playful)
            .with_clash(Stern, Playful)
            .with_clash(Gossipy, Mysterious)
            .with_clash(Stern, Shy)
            .with_clash(Gossipy, Reserved)
    }
}
