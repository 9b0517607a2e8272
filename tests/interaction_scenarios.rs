//! End-to-end conversations driven through the interaction manager

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use npc_interactions::dialogue::fallback_greeting;
use npc_interactions::*;

const FRAME: Duration = Duration::from_millis(100);

#[derive(Default)]
struct RecordingRenderer {
    bubbles: Mutex<Vec<(AgentId, String, Duration)>>,
}

impl Renderer for RecordingRenderer {
    fn show_bubble(&self, agent: AgentId, text: &str, duration: Duration) -> Result<()> {
        self.bubbles
            .lock()
            .unwrap()
            .push((agent, text.to_string(), duration));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingMovement {
    faces: Mutex<Vec<(AgentId, Direction)>>,
    steps: Mutex<Vec<(AgentId, Vec2)>>,
}

impl MovementSystem for RecordingMovement {
    fn request_face(&self, agent: AgentId, direction: Direction) -> Result<()> {
        self.faces.lock().unwrap().push((agent, direction));
        Ok(())
    }

    fn request_step(&self, agent: AgentId, step: Vec2) -> Result<()> {
        self.steps.lock().unwrap().push((agent, step));
        Ok(())
    }
}

fn villager(id: u64, name: &str, x: f32, traits: &str) -> Agent {
    Agent::new(id, name, Vec2::new(x, 0.0)).with_traits(traits.parse().unwrap())
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Ticks until a report lists a completion or the frame budget runs out
fn run_until_completed(
    manager: &mut InteractionManager,
    agents: &[Agent],
    max_frames: usize,
) -> Option<TickReport> {
    (0..max_frames)
        .map(|_| manager.tick(agents, FRAME))
        .find(|report| !report.completed.is_empty())
}

#[test]
fn complementary_pair_becomes_friendlier() {
    let renderer = Arc::new(RecordingRenderer::default());
    let movement = Arc::new(RecordingMovement::default());
    let mut manager = InteractionManager::builder(InteractionConfig::default())
        .dialogue(TemplateDialogue)
        .renderer(renderer.clone())
        .movement(movement.clone())
        .build()
        .unwrap();
    let agents = vec![
        villager(1, "Alice", 0.0, "friendly"),
        villager(2, "Bob", 100.0, "shy"),
    ];

    let first = manager.tick(&agents, FRAME);
    let pair = AgentPair::new(AgentId(1), AgentId(2));
    assert_eq!(first.started, vec![pair]);
    assert_eq!(
        manager.session_for(AgentId(2)).unwrap().state(),
        SessionState::Displaying
    );

    // 3 seconds of display at 100ms per frame
    let done = run_until_completed(&mut manager, &agents, 40).unwrap();
    assert_eq!(done.completed, vec![pair]);
    assert_eq!(done.now, Duration::from_millis(3_100));

    let record = manager.relationship(AgentId(2), AgentId(1)).unwrap();
    assert_close(record.familiarity, 0.05);
    assert_close(record.friendship, 0.1);
    assert_eq!(record.interaction_count, 1);
    assert_eq!(record.level(), RelationshipLevel::Acquaintance);

    let bubbles = renderer.bubbles.lock().unwrap();
    assert_eq!(bubbles.len(), 2);
    assert_eq!(bubbles[0].0, AgentId(1));
    assert_eq!(bubbles[1].0, AgentId(2));
    assert!(bubbles.iter().all(|(_, _, d)| *d == Duration::from_secs(3)));

    let faces = movement.faces.lock().unwrap();
    assert!(faces.contains(&(AgentId(1), Direction::Right)));
    assert!(faces.contains(&(AgentId(2), Direction::Left)));
    assert!(!movement.steps.lock().unwrap().is_empty());
}

#[test]
fn clashing_pair_drifts_apart() {
    let mut manager = InteractionManager::new(InteractionConfig::default(), TemplateDialogue).unwrap();
    let agents = vec![
        villager(1, "Greta", 0.0, "serious"),
        villager(2, "Pip", 50.0, "playful"),
    ];

    run_until_completed(&mut manager, &agents, 40).unwrap();

    let record = manager.relationship(AgentId(1), AgentId(2)).unwrap();
    assert_close(record.familiarity, 0.05);
    assert_close(record.friendship, -0.1);
    assert_eq!(record.interaction_count, 1);
}

#[test]
fn cooldown_blocks_repeat_conversations() {
    let mut manager = InteractionManager::new(InteractionConfig::default(), TemplateDialogue).unwrap();
    let agents = vec![
        villager(1, "Alice", 0.0, "friendly"),
        villager(2, "Bob", 100.0, "shy"),
    ];

    let done = run_until_completed(&mut manager, &agents, 40).unwrap();
    let finished_at = done.now;
    assert_eq!(
        manager.last_interaction(AgentId(1), AgentId(2)),
        Some(finished_at)
    );

    // Still in range the whole time, but the pair must wait out the cooldown
    let cooldown = manager.config().interaction_cooldown();
    while manager.now() + FRAME < finished_at + cooldown {
        let report = manager.tick(&agents, FRAME);
        assert!(report.started.is_empty(), "restarted at {:?}", report.now);
    }

    let report = manager.tick(&agents, FRAME);
    assert_eq!(report.now, finished_at + cooldown);
    assert_eq!(report.started.len(), 1);

    run_until_completed(&mut manager, &agents, 40).unwrap();
    let record = manager.relationship(AgentId(1), AgentId(2)).unwrap();
    assert_eq!(record.interaction_count, 2);
    assert_close(record.familiarity, 0.1);
    assert_close(record.friendship, 0.2);
}

#[test]
fn vanished_agent_aborts_without_credit() {
    let mut manager = InteractionManager::new(InteractionConfig::default(), TemplateDialogue).unwrap();
    let alice = villager(1, "Alice", 0.0, "friendly");
    let bob = villager(2, "Bob", 100.0, "shy");

    manager.tick(&[alice.clone(), bob.clone()], FRAME);
    manager.tick(&[alice.clone(), bob.clone()], FRAME);
    assert_eq!(
        manager.session_for(AgentId(1)).unwrap().state(),
        SessionState::Displaying
    );

    // Alice despawns mid-conversation
    let report = manager.tick(&[bob.clone()], FRAME);
    assert_eq!(report.aborted, vec![AgentPair::new(AgentId(1), AgentId(2))]);
    assert!(report.completed.is_empty());
    assert!(!manager.is_busy(AgentId(2)));
    assert!(manager.relationship(AgentId(1), AgentId(2)).is_none());
    assert_eq!(
        manager.last_interaction(AgentId(1), AgentId(2)),
        Some(Duration::from_millis(300))
    );

    // Back again, but the abandoned pair still honours the cooldown
    let report = manager.tick(&[alice, bob], FRAME);
    assert!(report.started.is_empty());
}

#[test]
fn out_of_range_agents_never_talk() {
    let config = InteractionConfig::default().with_interaction_distance(50.0);
    let mut manager = InteractionManager::new(config, TemplateDialogue).unwrap();
    let agents = vec![
        villager(1, "Alice", 0.0, "friendly"),
        villager(2, "Bob", 50.5, "shy"),
    ];

    for _ in 0..50 {
        assert!(manager.tick(&agents, FRAME).is_empty());
    }
    assert!(manager.relationships().is_empty());
}

#[test]
fn sessions_start_in_pair_order() {
    let mut manager = InteractionManager::new(InteractionConfig::default(), TemplateDialogue).unwrap();
    // Listed out of order; 4 and 3 are close, 2 and 1 are close, the groups are far apart
    let agents = vec![
        villager(4, "Dara", 1_010.0, ""),
        villager(2, "Bob", 10.0, ""),
        villager(3, "Cole", 1_000.0, ""),
        villager(1, "Alice", 0.0, ""),
    ];

    let report = manager.tick(&agents, FRAME);
    assert_eq!(
        report.started,
        vec![
            AgentPair::new(AgentId(1), AgentId(2)),
            AgentPair::new(AgentId(3), AgentId(4)),
        ]
    );
    assert_eq!(manager.active_sessions().len(), 2);
}

#[test]
fn config_loaded_from_json_drives_manager() {
    let json = r#"{
        "interaction_distance": 40.0,
        "interaction_duration_ms": 500,
        "compatibility": [{ "a": "curious", "b": "creative", "delta": 0.25 }]
    }"#;
    let config = InteractionConfig::from_json_str(json).unwrap();
    let mut manager = InteractionManager::new(config, TemplateDialogue).unwrap();
    let agents = vec![
        villager(1, "Iris", 0.0, "curious"),
        villager(2, "Jon", 30.0, "creative"),
    ];

    let done = run_until_completed(&mut manager, &agents, 10).unwrap();
    assert_eq!(done.now, Duration::from_millis(600));
    assert_close(manager.relationship(AgentId(1), AgentId(2)).unwrap().friendship, 0.25);
}

#[test]
fn model_dialogue_outside_runtime_falls_back() {
    let dialogue = LlmDialogue::new(llm::OllamaClient::new("llama3.2:latest"));
    let mut manager = InteractionManager::new(InteractionConfig::default(), dialogue).unwrap();
    let agents = vec![
        villager(1, "Alice", 0.0, "friendly"),
        villager(2, "Bob", 10.0, "shy"),
    ];

    // Plain thread, no Tokio runtime
    let report = manager.tick(&agents, FRAME);
    assert_eq!(report.started.len(), 1);

    let session = manager.session_for(AgentId(1)).unwrap();
    assert_eq!(session.state(), SessionState::Displaying);
    assert_eq!(
        session.greeting().unwrap(),
        &DialogueLine {
            text: fallback_greeting(AgentId(1), "Bob"),
            fallback: true,
        }
    );
    assert!(session.reply().unwrap().fallback);

    let done = run_until_completed(&mut manager, &agents, 40).unwrap();
    assert_eq!(done.completed.len(), 1);
}

fn replay() -> (Vec<TickReport>, Vec<(AgentPair, RelationshipRecord)>, Vec<(AgentId, String, Duration)>) {
    let renderer = Arc::new(RecordingRenderer::default());
    let mut manager = InteractionManager::builder(InteractionConfig::default())
        .renderer(renderer.clone())
        .build()
        .unwrap();

    let mut reports = Vec::new();
    for frame in 0..400u32 {
        // Agents wander on a fixed schedule
        let drift = (frame % 80) as f32 * 2.0;
        let agents = vec![
            villager(1, "Alice", 0.0, "friendly, talkative"),
            villager(2, "Bob", 60.0 + drift, "shy"),
            villager(3, "Cole", 150.0 - drift, "stern"),
            villager(4, "Dara", 260.0, "playful, curious"),
            villager(5, "Eli", 300.0 - drift, "wise"),
        ];
        reports.push(manager.tick(&agents, FRAME));
    }

    let records = manager
        .relationships()
        .iter()
        .map(|(pair, record)| (*pair, record.clone()))
        .collect();
    let bubbles = renderer.bubbles.lock().unwrap().clone();
    (reports, records, bubbles)
}

#[test]
fn identical_inputs_replay_identically() {
    let (reports_a, records_a, bubbles_a) = replay();
    let (reports_b, records_b, bubbles_b) = replay();

    assert!(reports_a.iter().any(|report| !report.completed.is_empty()));
    assert_eq!(reports_a, reports_b);
    assert_eq!(records_a, records_b);
    assert_eq!(bubbles_a, bubbles_b);
}
