use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use npc_interactions::llm::OllamaClient;
use npc_interactions::{
    Agent, AgentId, Direction, InteractionConfig, InteractionManager, LlmDialogue,
    MovementSystem, Renderer, TemplateDialogue, Vec2,
};

const FRAME: Duration = Duration::from_millis(100);
const FRAMES: usize = 250;

/// Prints speech bubbles to stdout
struct ConsoleRenderer {
    names: HashMap<AgentId, String>,
}

impl Renderer for ConsoleRenderer {
    fn show_bubble(&self, agent: AgentId, text: &str, duration: Duration) -> Result<()> {
        let name = self.names.get(&agent).map(String::as_str).unwrap_or("?");
        println!("  💬 {}: \"{}\" ({:.1}s)", name, text, duration.as_secs_f32());
        Ok(())
    }
}

/// Queues facing and step requests; the village loop applies them between ticks
#[derive(Default)]
struct QueuedMovement {
    faces: Mutex<Vec<(AgentId, Direction)>>,
    steps: Mutex<Vec<(AgentId, Vec2)>>,
}

impl MovementSystem for QueuedMovement {
    fn request_face(&self, agent: AgentId, direction: Direction) -> Result<()> {
        self.faces
            .lock()
            .map_err(|_| anyhow::anyhow!("movement queue poisoned"))?
            .push((agent, direction));
        Ok(())
    }

    fn request_step(&self, agent: AgentId, step: Vec2) -> Result<()> {
        self.steps
            .lock()
            .map_err(|_| anyhow::anyhow!("movement queue poisoned"))?
            .push((agent, step));
        Ok(())
    }
}

impl QueuedMovement {
    fn apply(&self, agents: &mut [Agent]) {
        let faces = self.faces.lock().map(|mut q| std::mem::take(&mut *q)).unwrap_or_default();
        let steps = self.steps.lock().map(|mut q| std::mem::take(&mut *q)).unwrap_or_default();

        for agent in agents.iter_mut() {
            for (_, direction) in faces.iter().filter(|(id, _)| *id == agent.id) {
                agent.facing = *direction;
            }
            for (_, step) in steps.iter().filter(|(id, _)| *id == agent.id) {
                agent.position = agent.position + *step;
            }
        }
    }
}

fn villagers() -> Result<Vec<Agent>> {
    Ok(vec![
        Agent::new(1, "Alice", Vec2::new(0.0, 0.0)).with_traits("friendly, talkative".parse()?),
        Agent::new(2, "Bob", Vec2::new(90.0, 10.0)).with_traits("shy, hardworking".parse()?),
        Agent::new(3, "Cora", Vec2::new(400.0, 0.0))
            .with_traits("serious, stern".parse()?)
            .with_facing(Direction::Left),
        Agent::new(4, "Dmitri", Vec2::new(600.0, 0.0))
            .with_traits("playful, curious".parse()?)
            .with_facing(Direction::Left),
        Agent::new(5, "Elsie", Vec2::new(200.0, 300.0)).with_traits("wise, calm".parse()?),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("=== Village Square ===\n");

    let mut agents = villagers()?;
    let names = agents.iter().map(|a| (a.id, a.name.clone())).collect();
    let movement = Arc::new(QueuedMovement::default());

    let config = match std::env::args().nth(1) {
        Some(path) => InteractionConfig::from_json_file(path)?,
        None => InteractionConfig::default(),
    };
    let builder = InteractionManager::builder(config)
        .renderer(Arc::new(ConsoleRenderer { names }))
        .movement(movement.clone());

    // Set NPC_MODEL to an Ollama model name to generate lines with it
    let mut manager = match std::env::var("NPC_MODEL") {
        Ok(model) => {
            println!("Using Ollama model {}\n", model);
            builder.dialogue(LlmDialogue::new(OllamaClient::new(model))).build()?
        }
        Err(_) => builder.dialogue(TemplateDialogue).build()?,
    };

    for frame in 0..FRAMES {
        // Cora and Dmitri walk toward the square, Elsie wanders past
        let drift = if frame < 120 { 2.5 } else { 0.0 };
        for agent in agents.iter_mut() {
            match agent.id.0 {
                3 => agent.position.x -= drift,
                4 => agent.position.x -= drift * 1.2,
                5 => agent.position.y -= 1.5,
                _ => {}
            }
        }

        let report = manager.tick(&agents, FRAME);
        for pair in &report.started {
            println!("[{:>5.1}s] {} meets {}", report.now.as_secs_f32(), pair.low(), pair.high());
        }
        for pair in &report.completed {
            println!("[{:>5.1}s] {} parted ways", report.now.as_secs_f32(), pair);
        }
        for pair in &report.aborted {
            println!("[{:>5.1}s] {} was interrupted", report.now.as_secs_f32(), pair);
        }

        movement.apply(&mut agents);

        // Let the runtime drive any pending model requests
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    println!("\nRelationships after {:.0}s:", manager.now().as_secs_f32());
    for (pair, record) in manager.relationships().iter() {
        println!(
            "- {}: {} (familiarity {:.2}, friendship {:+.2}, {} chats)",
            pair,
            record.level().describe(),
            record.familiarity,
            record.friendship,
            record.interaction_count
        );
    }

    Ok(())
}
