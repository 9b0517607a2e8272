use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::personality::TraitSet;
use crate::relationship::RelationshipLevel;
use crate::types::{Agent, AgentId, Direction, Vec2};

/// Produces the lines NPCs say to each other.
///
/// Calls may fail or take longer than the session is willing to wait; the
/// session then falls back to a canned line.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    /// Opening line spoken by `context.speaker` to `context.listener`
    async fn generate(&self, context: &DialogueContext) -> Result<String>;

    /// Reply by `context.speaker` to what the listener just said
    async fn respond(&self, context: &DialogueContext, prior_text: &str) -> Result<String>;
}

/// Displays speech bubbles above agents
pub trait Renderer: Send + Sync {
    fn show_bubble(&self, agent: AgentId, text: &str, duration: Duration) -> Result<()>;
}

/// Turns and nudges agents. The host decides whether a step is possible.
pub trait MovementSystem: Send + Sync {
    fn request_face(&self, agent: AgentId, direction: Direction) -> Result<()>;

    fn request_step(&self, agent: AgentId, step: Vec2) -> Result<()>;
}

/// One side of a conversation as the dialogue generator sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: AgentId,
    pub name: String,
    pub traits: TraitSet,
}

impl From<&Agent> for Speaker {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            traits: agent.traits.clone(),
        }
    }
}

/// Everything a generator may use to phrase a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    pub speaker: Speaker,
    pub listener: Speaker,
    pub relationship: RelationshipLevel,
}

impl DialogueContext {
    pub fn new(speaker: &Agent, listener: &Agent) -> Self {
        Self {
            speaker: Speaker::from(speaker),
            listener: Speaker::from(listener),
            relationship: RelationshipLevel::Stranger,
        }
    }

    pub fn with_relationship(mut self, relationship: RelationshipLevel) -> Self {
        self.relationship = relationship;
        self
    }

    /// The same conversation seen from the listener's side
    pub fn swapped(&self) -> Self {
        Self {
            speaker: self.listener.clone(),
            listener: self.speaker.clone(),
            relationship: self.relationship,
        }
    }
}

/// Renderer for hosts without speech bubbles
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn show_bubble(&self, _agent: AgentId, _text: &str, _duration: Duration) -> Result<()> {
        Ok(())
    }
}

/// Movement system for hosts that keep agents in place
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMovement;

impl MovementSystem for NullMovement {
    fn request_face(&self, _agent: AgentId, _direction: Direction) -> Result<()> {
        Ok(())
    }

    fn request_step(&self, _agent: AgentId, _step: Vec2) -> Result<()> {
        Ok(())
    }
}
