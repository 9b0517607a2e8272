//! Property-based checks over random worlds and tick sequences

use std::collections::HashSet;
use std::time::Duration;

use npc_interactions::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_trait() -> impl Strategy<Value = PersonalityTrait> {
    prop::sample::select(PersonalityTrait::ALL.to_vec())
}

fn arb_traits() -> impl Strategy<Value = TraitSet> {
    prop::collection::vec(arb_trait(), 0..4).prop_map(|traits| traits.into_iter().collect())
}

/// Up to eight agents in a 400x400 square. Ids may repeat.
fn arb_world() -> impl Strategy<Value = Vec<Agent>> {
    prop::collection::vec(
        (0u64..8, 0.0f32..400.0, 0.0f32..400.0, arb_traits()),
        0..8,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(id, x, y, traits)| {
                Agent::new(id, format!("npc{}", id), Vec2::new(x, y)).with_traits(traits)
            })
            .collect()
    })
}

fn arb_frame() -> impl Strategy<Value = Duration> {
    (0u64..1_500).prop_map(Duration::from_millis)
}

fn small_config() -> InteractionConfig {
    InteractionConfig::default()
        .with_interaction_cooldown(Duration::from_millis(2_000))
        .with_interaction_duration(Duration::from_millis(1_000))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn agents_are_never_in_two_sessions(
        worlds in prop::collection::vec((arb_world(), arb_frame()), 1..40),
    ) {
        let mut manager = InteractionManager::new(small_config(), TemplateDialogue).unwrap();

        for (agents, frame) in &worlds {
            let report = manager.tick(agents, *frame);

            let mut busy = HashSet::new();
            for session in manager.active_sessions() {
                prop_assert!(busy.insert(session.initiator()));
                prop_assert!(busy.insert(session.responder()));
                prop_assert_ne!(session.initiator(), session.responder());
            }

            let mut started = report.started.clone();
            started.sort();
            prop_assert_eq!(&started, &report.started);
        }
    }

    #[test]
    fn relationships_stay_in_bounds(
        worlds in prop::collection::vec((arb_world(), arb_frame()), 1..60),
    ) {
        let mut manager = InteractionManager::new(small_config(), TemplateDialogue).unwrap();
        let mut previous: Vec<(AgentPair, RelationshipRecord)> = Vec::new();

        for (agents, frame) in &worlds {
            manager.tick(agents, *frame);

            for (pair, record) in manager.relationships().iter() {
                prop_assert!((0.0..=1.0).contains(&record.familiarity));
                prop_assert!((-1.0..=1.0).contains(&record.friendship));
                prop_assert!(record.interaction_count >= 1);

                if let Some((_, before)) = previous.iter().find(|(p, _)| p == pair) {
                    prop_assert!(record.familiarity >= before.familiarity);
                    prop_assert!(record.interaction_count >= before.interaction_count);
                }
            }
            previous = manager
                .relationships()
                .iter()
                .map(|(pair, record)| (*pair, record.clone()))
                .collect();
        }
    }

    #[test]
    fn repeated_updates_saturate(
        a in arb_traits(),
        b in arb_traits(),
        increment in prop_oneof![-2.0f32..2.0, Just(f32::NAN), Just(f32::INFINITY)],
        rounds in 1usize..80,
    ) {
        let store = RelationshipStore::new(CompatibilityTable::default(), increment);
        let valid = increment.is_finite() && increment > 0.0 && increment <= 1.0;
        prop_assert_eq!(store.is_ok(), valid);
        let Ok(mut store) = store else {
            return Ok(());
        };
        let pair = AgentPair::new(AgentId(1), AgentId(2));

        let mut previous = 0.0f32;
        for round in 1..=rounds {
            let record = store.update(pair, &a, &b);
            prop_assert!((0.0..=1.0).contains(&record.familiarity));
            prop_assert!(record.familiarity >= previous);
            prop_assert!((-1.0..=1.0).contains(&record.friendship));
            prop_assert_eq!(record.interaction_count as usize, round);
            previous = record.familiarity;
        }
    }

    #[test]
    fn compatibility_is_symmetric(a in arb_traits(), b in arb_traits()) {
        let table = CompatibilityTable::default();
        prop_assert!((table.score(&a, &b) - table.score(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn scan_yields_sorted_pairs_within_range(agents in arb_world(), distance in 1.0f32..300.0) {
        let scanner = SpatialScanner::new(distance, Duration::from_secs(15));
        let pairs = scanner.scan(&agents, &HashSet::new(), &CooldownLedger::new(), Duration::ZERO);

        prop_assert!(pairs.windows(2).all(|w| w[0] < w[1]));
        for pair in &pairs {
            prop_assert!(pair.low() < pair.high());
            let first = |id: AgentId| agents.iter().find(|agent| agent.id == id);
            let (Some(a), Some(b)) = (first(pair.low()), first(pair.high())) else {
                return Err(TestCaseError::fail("scanned pair names an unknown agent"));
            };
            prop_assert!(a.distance_to(b) <= distance);
        }
    }
}
