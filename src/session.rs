//! One conversation between two agents.
//!
//! A session runs `Initiating -> Responding -> Displaying -> Completed`. It
//! can be `Aborted` from any non-terminal state when a participant
//! disappears. Dialogue requests are futures polled once per advance with a
//! no-op waker, so a slow generator never stalls the host loop; after
//! `dialogue_timeout` of simulated waiting the session uses a fallback line.

use anyhow::Result;
use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::config::InteractionConfig;
use crate::dialogue;
use crate::parser;
use crate::personality::TraitSet;
use crate::relationship::RelationshipLevel;
use crate::traits::{DialogueContext, DialogueGenerator, MovementSystem, Renderer};
use crate::types::{Agent, AgentId, AgentPair, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Initiating,
    Responding,
    Displaying,
    Completed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

/// A spoken line and whether it came from the fallback pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub text: String,
    pub fallback: bool,
}

/// Collaborators and tunables shared by every session
pub struct SessionServices<'a> {
    pub dialogue: &'a Arc<dyn DialogueGenerator>,
    pub renderer: &'a dyn Renderer,
    pub movement: &'a dyn MovementSystem,
    pub config: &'a InteractionConfig,
}

/// This tick's snapshots of the two participants; `None` if the host no longer lists them
#[derive(Debug, Clone, Copy)]
pub struct Participants<'a> {
    pub initiator: Option<&'a Agent>,
    pub responder: Option<&'a Agent>,
    pub relationship: RelationshipLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Greeting,
    Reply,
}

struct PendingLine {
    request: BoxFuture<'static, Result<String>>,
    waited: Duration,
}

pub struct ConversationSession {
    pair: AgentPair,
    initiator: AgentId,
    responder: AgentId,
    state: SessionState,
    started_at: Duration,
    elapsed: Duration,
    state_elapsed: Duration,
    greeting: Option<DialogueLine>,
    reply: Option<DialogueLine>,
    pending: Option<PendingLine>,
    /// Whether the approach step has been requested
    stepped: bool,
    initiator_traits: TraitSet,
    responder_traits: TraitSet,
}

impl ConversationSession {
    /// The lower id of the pair speaks first
    pub fn new(pair: AgentPair, started_at: Duration) -> Self {
        Self {
            pair,
            initiator: pair.low(),
            responder: pair.high(),
            state: SessionState::Initiating,
            started_at,
            elapsed: Duration::ZERO,
            state_elapsed: Duration::ZERO,
            greeting: None,
            reply: None,
            pending: None,
            stepped: false,
            initiator_traits: TraitSet::default(),
            responder_traits: TraitSet::default(),
        }
    }

    pub fn pair(&self) -> AgentPair {
        self.pair
    }

    pub fn initiator(&self) -> AgentId {
        self.initiator
    }

    pub fn responder(&self) -> AgentId {
        self.responder
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn involves(&self, agent: AgentId) -> bool {
        self.pair.contains(agent)
    }

    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Simulated time since the session was created
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn greeting(&self) -> Option<&DialogueLine> {
        self.greeting.as_ref()
    }

    pub fn reply(&self) -> Option<&DialogueLine> {
        self.reply.as_ref()
    }

    /// Traits of (initiator, responder) as last seen
    pub fn participant_traits(&self) -> (&TraitSet, &TraitSet) {
        (&self.initiator_traits, &self.responder_traits)
    }

    /// Moves the session forward by `delta` of simulated time.
    ///
    /// Keeps transitioning while progress is possible, so a generator that
    /// answers immediately gets greeting and reply done in one call. While
    /// displaying, facing is re-requested whenever a partner is turned away;
    /// the approach step is requested at most once per session.
    pub fn advance(
        &mut self,
        delta: Duration,
        participants: Participants<'_>,
        services: &SessionServices<'_>,
    ) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.elapsed += delta;

        let (initiator, responder) = match (participants.initiator, participants.responder) {
            (Some(initiator), Some(responder)) => (initiator, responder),
            (None, _) => {
                self.abort(self.initiator);
                return self.state;
            }
            (_, None) => {
                self.abort(self.responder);
                return self.state;
            }
        };
        self.initiator_traits = initiator.traits.clone();
        self.responder_traits = responder.traits.clone();

        let mut budget = delta;
        loop {
            match self.state {
                SessionState::Initiating => {
                    let context = DialogueContext::new(initiator, responder)
                        .with_relationship(participants.relationship);
                    match self.poll_line(LineKind::Greeting, context, budget, services) {
                        Some(line) => {
                            self.greeting = Some(line);
                            self.enter(SessionState::Responding, services);
                            budget = Duration::ZERO;
                        }
                        None => break,
                    }
                }
                SessionState::Responding => {
                    let context = DialogueContext::new(responder, initiator)
                        .with_relationship(participants.relationship);
                    match self.poll_line(LineKind::Reply, context, budget, services) {
                        Some(line) => {
                            self.reply = Some(line);
                            self.enter(SessionState::Displaying, services);
                            budget = Duration::ZERO;
                        }
                        None => break,
                    }
                }
                SessionState::Displaying => {
                    self.state_elapsed += budget;
                    if self.state_elapsed >= services.config.interaction_duration() {
                        self.enter(SessionState::Completed, services);
                    } else {
                        face_partners(initiator, responder, services);
                        if !self.stepped {
                            self.stepped = approach(initiator, responder, services);
                        }
                    }
                    break;
                }
                SessionState::Completed | SessionState::Aborted => break,
            }
        }
        self.state
    }

    /// Ends the session without a relationship update. No-op once terminal.
    pub fn abort(&mut self, missing: AgentId) {
        if self.state.is_terminal() {
            return;
        }
        log::info!(
            "✂️  Conversation {} aborted in {:?}: {} is gone",
            self.pair,
            self.state,
            missing
        );
        self.pending = None;
        self.state = SessionState::Aborted;
    }

    fn enter(&mut self, next: SessionState, services: &SessionServices<'_>) {
        log::debug!("Conversation {}: {:?} -> {:?}", self.pair, self.state, next);
        self.state = next;
        self.state_elapsed = Duration::ZERO;

        if next == SessionState::Displaying {
            let duration = services.config.interaction_duration();
            for (agent, line) in [(self.initiator, &self.greeting), (self.responder, &self.reply)] {
                if let Some(line) = line {
                    skip_on_error(
                        "show speech bubble",
                        agent,
                        services.renderer.show_bubble(agent, &line.text, duration),
                    );
                }
            }
        }
    }

    fn poll_line(
        &mut self,
        kind: LineKind,
        context: DialogueContext,
        budget: Duration,
        services: &SessionServices<'_>,
    ) -> Option<DialogueLine> {
        let speaker = context.speaker.id;
        let speaker_name = context.speaker.name.clone();
        let listener_name = context.listener.name.clone();

        match self.pending.as_mut() {
            Some(pending) => pending.waited += budget,
            None => {
                let prior = self.greeting.as_ref().map(|line| line.text.clone());
                let request = start_request(kind, Arc::clone(services.dialogue), context, prior);
                self.pending = Some(PendingLine {
                    request,
                    waited: Duration::ZERO,
                });
            }
        }
        let pending = self.pending.as_mut()?;

        let mut cx = Context::from_waker(noop_waker_ref());
        let generated = match pending.request.poll_unpin(&mut cx) {
            Poll::Ready(Ok(raw)) => {
                let cleaned = parser::clean_line(&raw);
                if cleaned.is_none() {
                    log::warn!("Empty {:?} from {}, using fallback", kind, speaker);
                }
                cleaned
            }
            Poll::Ready(Err(e)) => {
                log::warn!("Failed to generate {:?} for {}: {}", kind, speaker, e);
                None
            }
            Poll::Pending if pending.waited >= services.config.dialogue_timeout() => {
                log::warn!(
                    "{:?} for {} timed out after {:?}, using fallback",
                    kind,
                    speaker,
                    pending.waited
                );
                None
            }
            Poll::Pending => return None,
        };

        self.pending = None;
        let line = match generated {
            Some(text) => DialogueLine {
                text,
                fallback: false,
            },
            None => {
                let text = match kind {
                    LineKind::Greeting => dialogue::fallback_greeting(speaker, &listener_name),
                    LineKind::Reply => dialogue::fallback_reply(speaker, &listener_name),
                };
                DialogueLine {
                    text,
                    fallback: true,
                }
            }
        };
        log::debug!("  🗨️  {}: {}", speaker_name, line.text);
        Some(line)
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("pair", &self.pair)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("elapsed", &self.elapsed)
            .field("greeting", &self.greeting)
            .field("reply", &self.reply)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

fn start_request(
    kind: LineKind,
    generator: Arc<dyn DialogueGenerator>,
    context: DialogueContext,
    prior: Option<String>,
) -> BoxFuture<'static, Result<String>> {
    match kind {
        LineKind::Greeting => async move { generator.generate(&context).await }.boxed(),
        LineKind::Reply => {
            let prior = prior.unwrap_or_default();
            async move { generator.respond(&context, &prior).await }.boxed()
        }
    }
}

/// Turns both agents toward each other
fn face_partners(a: &Agent, b: &Agent, services: &SessionServices<'_>) {
    let offset = b.position - a.position;
    for (agent, toward) in [(a, offset), (b, offset.scaled(-1.0))] {
        let direction = Direction::toward(toward);
        if agent.facing != direction {
            skip_on_error(
                "face partner",
                agent.id,
                services.movement.request_face(agent.id, direction),
            );
        }
    }
}

/// Closes the gap by one step each when the pair stands too far apart.
/// Returns whether a step was requested.
fn approach(a: &Agent, b: &Agent, services: &SessionServices<'_>) -> bool {
    let offset = b.position - a.position;
    let config = services.config;
    if offset.length() <= config.comfortable_distance || config.approach_step <= 0.0 {
        return false;
    }
    let step = offset.normalized().scaled(config.approach_step);
    let movement = services.movement;
    skip_on_error("step toward partner", a.id, movement.request_step(a.id, step));
    skip_on_error("step toward partner", b.id, movement.request_step(b.id, step.scaled(-1.0)));
    true
}

fn skip_on_error(what: &str, agent: AgentId, result: Result<()>) {
    if let Err(e) = result {
        log::warn!("Could not {} for {}: {}", what, agent, e);
    }
}
