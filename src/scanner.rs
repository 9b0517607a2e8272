//! Proximity scan: which pairs of agents may start talking this tick.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::types::{Agent, AgentId, AgentPair};

/// Last completed or aborted session per pair, in simulated time
pub type CooldownLedger = HashMap<AgentPair, Duration>;

/// Source of candidate pairs for the scanner.
///
/// Implementations may prune with a spatial index but must return every
/// pair within `max_distance`; the scanner re-checks distance and ordering
/// so extra candidates are harmless.
pub trait ProximityIndex: Send + Sync {
    /// Candidate pairs as indices into `agents`
    fn candidates(&self, agents: &[&Agent], max_distance: f32) -> Vec<(usize, usize)>;
}

/// Every pair, O(n²)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairs;

impl ProximityIndex for AllPairs {
    fn candidates(&self, agents: &[&Agent], _max_distance: f32) -> Vec<(usize, usize)> {
        let n = agents.len();
        let mut pairs = Vec::with_capacity(n.saturating_sub(1) * n / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }
}

/// Finds pairs that are close enough, idle, and off cooldown
pub struct SpatialScanner {
    interaction_distance: f32,
    interaction_cooldown: Duration,
    index: Box<dyn ProximityIndex>,
}

impl SpatialScanner {
    pub fn new(interaction_distance: f32, interaction_cooldown: Duration) -> Self {
        Self {
            interaction_distance,
            interaction_cooldown,
            index: Box::new(AllPairs),
        }
    }

    pub fn with_index(mut self, index: Box<dyn ProximityIndex>) -> Self {
        self.index = index;
        self
    }

    /// Eligible pairs sorted by (lower id, higher id).
    ///
    /// Agents sharing an id are considered once, using the first snapshot.
    pub fn scan(
        &self,
        agents: &[Agent],
        busy: &HashSet<AgentId>,
        ledger: &CooldownLedger,
        now: Duration,
    ) -> Vec<AgentPair> {
        let mut seen = HashSet::with_capacity(agents.len());
        let candidates: Vec<&Agent> = agents
            .iter()
            .filter(|agent| {
                if seen.insert(agent.id) {
                    true
                } else {
                    log::warn!("Duplicate agent id {} in scan input, ignoring", agent.id);
                    false
                }
            })
            .filter(|agent| !busy.contains(&agent.id))
            .collect();

        if candidates.len() < 2 {
            return Vec::new();
        }

        let eligible: BTreeSet<AgentPair> = self
            .index
            .candidates(&candidates, self.interaction_distance)
            .into_iter()
            .filter_map(|(i, j)| Some((*candidates.get(i)?, *candidates.get(j)?)))
            .filter(|(a, b)| a.id != b.id)
            .filter(|(a, b)| a.distance_to(b) <= self.interaction_distance)
            .map(|(a, b)| AgentPair::new(a.id, b.id))
            .filter(|pair| self.cooldown_elapsed(pair, ledger, now))
            .collect();

        log::debug!(
            "Scan at {:?}: {} idle agents, {} eligible pairs",
            now,
            candidates.len(),
            eligible.len()
        );
        eligible.into_iter().collect()
    }

    /// True when the pair has never talked or its cooldown has run out
    pub fn cooldown_elapsed(&self, pair: &AgentPair, ledger: &CooldownLedger, now: Duration) -> bool {
        match ledger.get(pair) {
            Some(last) => now.saturating_sub(*last) >= self.interaction_cooldown,
            None => true,
        }
    }
}
