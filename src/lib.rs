//! # NPC Interactions
//!
//! Ambient conversations between NPCs that share a 2-D world, and the
//! relationships those conversations build over time.
//!
//! ## Features
//!
//! - **Proximity detection**: Pairs of idle NPCs within range start talking, deterministic order
//! - **Conversation sessions**: Greeting, reply, speech bubbles, then completion
//! - **Cooldowns**: The same pair will not chat again until the cooldown has passed
//! - **Relationships**: Familiarity and friendship driven by personality compatibility
//! - **Pluggable collaborators**: Dialogue generation, rendering and movement are injected
//! - **LLM Integration**: Built-in Ollama support for generated lines, with canned fallbacks
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use npc_interactions::{Agent, InteractionConfig, InteractionManager, TemplateDialogue, Vec2};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut manager = InteractionManager::new(InteractionConfig::default(), TemplateDialogue)?;
//!
//! let agents = vec![
//!     Agent::new(1, "Alice", Vec2::new(0.0, 0.0)).with_traits("friendly".parse()?),
//!     Agent::new(2, "Bob", Vec2::new(100.0, 0.0)).with_traits("shy".parse()?),
//! ];
//!
//! // Once per frame
//! let report = manager.tick(&agents, Duration::from_millis(16));
//! for pair in &report.completed {
//!     println!("{} finished talking", pair);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialogue;
pub mod engine;
pub mod llm;
pub mod parser;
pub mod personality;
pub mod prompts;
pub mod relationship;
pub mod scanner;
pub mod session;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use config::{ConfigError, InteractionConfig};
pub use dialogue::{LlmDialogue, TemplateDialogue};
pub use engine::{InteractionManager, InteractionManagerBuilder, TickReport};
pub use personality::{CompatibilityRule, CompatibilityTable, PersonalityTrait, TraitSet};
pub use relationship::{RelationshipLevel, RelationshipRecord, RelationshipStore};
pub use scanner::{AllPairs, CooldownLedger, ProximityIndex, SpatialScanner};
pub use session::{ConversationSession, DialogueLine, SessionState};
pub use traits::{
    DialogueContext, DialogueGenerator, MovementSystem, NullMovement, NullRenderer, Renderer,
    Speaker,
};
pub use types::{Agent, AgentId, AgentPair, Direction, Pair, Vec2};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
