use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, InteractionConfig};
use crate::relationship::{RelationshipLevel, RelationshipRecord, RelationshipStore};
use crate::scanner::{CooldownLedger, ProximityIndex, SpatialScanner};
use crate::session::{ConversationSession, Participants, SessionServices, SessionState};
use crate::traits::{DialogueGenerator, MovementSystem, NullMovement, NullRenderer, Renderer};
use crate::types::{Agent, AgentId, AgentPair};

/// What changed during one call to [`InteractionManager::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Simulated time after the tick
    pub now: Duration,
    /// Pairs that started talking, in creation order
    pub started: Vec<AgentPair>,
    pub completed: Vec<AgentPair>,
    pub aborted: Vec<AgentPair>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.completed.is_empty() && self.aborted.is_empty()
    }
}

/// Drives ambient NPC conversations.
///
/// The host owns one manager and calls [`tick`](Self::tick) once per frame
/// with the current agent snapshots. The manager never moves or draws agents
/// itself; it asks the injected collaborators to.
pub struct InteractionManager {
    config: InteractionConfig,
    scanner: SpatialScanner,
    relationships: RelationshipStore,
    cooldowns: CooldownLedger,
    /// Live sessions in creation order
    sessions: Vec<ConversationSession>,
    dialogue: Arc<dyn DialogueGenerator>,
    renderer: Arc<dyn Renderer>,
    movement: Arc<dyn MovementSystem>,
    now: Duration,
    enabled: bool,
}

impl InteractionManager {
    /// Create a manager with the given dialogue generator and no-op rendering and movement
    pub fn new(
        config: InteractionConfig,
        dialogue: impl DialogueGenerator + 'static,
    ) -> Result<Self, ConfigError> {
        Self::builder(config).dialogue(dialogue).build()
    }

    pub fn builder(config: InteractionConfig) -> InteractionManagerBuilder {
        InteractionManagerBuilder {
            config,
            dialogue: None,
            renderer: None,
            movement: None,
            index: None,
        }
    }

    /// Advance the simulation by `delta`.
    ///
    /// Order within a tick: sessions whose agents vanished are aborted, new
    /// pairs start in scan order, then existing sessions advance. Never fails;
    /// collaborator errors are logged and skipped.
    pub fn tick(&mut self, agents: &[Agent], delta: Duration) -> TickReport {
        self.now += delta;
        let mut report = TickReport::default();

        let mut by_id: HashMap<AgentId, &Agent> = HashMap::with_capacity(agents.len());
        for agent in agents {
            by_id.entry(agent.id).or_insert(agent);
        }

        for session in &mut self.sessions {
            let pair = session.pair();
            if let Some(missing) = [pair.low(), pair.high()]
                .into_iter()
                .find(|id| !by_id.contains_key(id))
            {
                session.abort(missing);
            }
        }
        self.reap(&mut report);

        let existing = self.sessions.len();
        self.start_sessions(agents, &by_id, &mut report);

        // New sessions took their first step in start_sessions
        for index in 0..existing {
            self.advance_session(index, delta, &by_id);
        }
        self.reap(&mut report);

        report.now = self.now;
        report
    }

    fn start_sessions(
        &mut self,
        agents: &[Agent],
        by_id: &HashMap<AgentId, &Agent>,
        report: &mut TickReport,
    ) {
        if !self.enabled {
            return;
        }
        let mut capacity = match self.config.max_concurrent_sessions {
            Some(max) => max.saturating_sub(self.sessions.len()),
            None => usize::MAX,
        };
        if capacity == 0 {
            return;
        }

        let mut busy = self.busy_agents();
        let eligible = self.scanner.scan(agents, &busy, &self.cooldowns, self.now);

        for pair in eligible {
            if capacity == 0 {
                log::debug!("Session cap reached, deferring remaining pairs");
                break;
            }
            if busy.contains(&pair.low()) || busy.contains(&pair.high()) {
                continue;
            }
            busy.insert(pair.low());
            busy.insert(pair.high());
            capacity -= 1;

            log::info!("💬 {} starts talking to {}", pair.low(), pair.high());
            self.sessions.push(ConversationSession::new(pair, self.now));
            report.started.push(pair);

            let index = self.sessions.len() - 1;
            self.advance_session(index, Duration::ZERO, by_id);
        }
    }

    fn advance_session(&mut self, index: usize, delta: Duration, by_id: &HashMap<AgentId, &Agent>) {
        let Self {
            config,
            relationships,
            sessions,
            dialogue,
            renderer,
            movement,
            ..
        } = self;
        let Some(session) = sessions.get_mut(index) else {
            return;
        };

        let participants = Participants {
            initiator: by_id.get(&session.initiator()).copied(),
            responder: by_id.get(&session.responder()).copied(),
            relationship: RelationshipLevel::of_optional(relationships.get(&session.pair())),
        };
        let services = SessionServices {
            dialogue,
            renderer: &**renderer,
            movement: &**movement,
            config,
        };
        session.advance(delta, participants, &services);
    }

    /// Removes finished sessions, stamps their cooldown and applies completions
    fn reap(&mut self, report: &mut TickReport) {
        let (finished, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(|session| session.state().is_terminal());
        self.sessions = live;

        for session in finished {
            let pair = session.pair();
            self.cooldowns.insert(pair, self.now);

            match session.state() {
                SessionState::Completed => {
                    let (initiator_traits, responder_traits) = session.participant_traits();
                    let record = self
                        .relationships
                        .update(pair, initiator_traits, responder_traits);
                    log::info!(
                        "🤝 {} finished talking after {:?}: familiarity {:.2}, friendship {:+.2}",
                        pair,
                        self.now.saturating_sub(session.started_at()),
                        record.familiarity,
                        record.friendship
                    );
                    report.completed.push(pair);
                }
                SessionState::Aborted => report.aborted.push(pair),
                state => log::warn!("Reaped session {} in non-terminal state {:?}", pair, state),
            }
        }
    }

    /// Aborts any live session containing `agent` right away.
    ///
    /// Hosts that despawn an NPC mid-frame can call this instead of waiting
    /// for the next tick to notice.
    pub fn remove_agent(&mut self, agent: AgentId) -> Option<AgentPair> {
        let session = self.sessions.iter_mut().find(|s| s.involves(agent))?;
        session.abort(agent);
        let pair = session.pair();
        let mut report = TickReport::default();
        self.reap(&mut report);
        Some(pair)
    }

    fn busy_agents(&self) -> HashSet<AgentId> {
        self.sessions
            .iter()
            .flat_map(|s| [s.initiator(), s.responder()])
            .collect()
    }

    /// Turns ambient conversations on or off. Live sessions run to completion.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("NPC interactions {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Flips the enabled flag and returns the new value
    pub fn toggle_enabled(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn relationships(&self) -> &RelationshipStore {
        &self.relationships
    }

    pub fn relationship(&self, a: AgentId, b: AgentId) -> Option<&RelationshipRecord> {
        self.relationships.between(a, b)
    }

    pub fn cooldown_ledger(&self) -> &CooldownLedger {
        &self.cooldowns
    }

    /// When the pair last finished or abandoned a conversation
    pub fn last_interaction(&self, a: AgentId, b: AgentId) -> Option<Duration> {
        self.cooldowns.get(&AgentPair::new(a, b)).copied()
    }

    pub fn active_sessions(&self) -> &[ConversationSession] {
        &self.sessions
    }

    pub fn session_for(&self, agent: AgentId) -> Option<&ConversationSession> {
        self.sessions.iter().find(|s| s.involves(agent))
    }

    pub fn is_busy(&self, agent: AgentId) -> bool {
        self.session_for(agent).is_some()
    }
}

/// Wires collaborators into an [`InteractionManager`]
pub struct InteractionManagerBuilder {
    config: InteractionConfig,
    dialogue: Option<Arc<dyn DialogueGenerator>>,
    renderer: Option<Arc<dyn Renderer>>,
    movement: Option<Arc<dyn MovementSystem>>,
    index: Option<Box<dyn ProximityIndex>>,
}

impl InteractionManagerBuilder {
    pub fn dialogue(self, dialogue: impl DialogueGenerator + 'static) -> Self {
        self.shared_dialogue(Arc::new(dialogue))
    }

    pub fn shared_dialogue(mut self, dialogue: Arc<dyn DialogueGenerator>) -> Self {
        self.dialogue = Some(dialogue);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn movement(mut self, movement: Arc<dyn MovementSystem>) -> Self {
        self.movement = Some(movement);
        self
    }

    /// Replace the all-pairs candidate search with a spatial index
    pub fn proximity_index(mut self, index: impl ProximityIndex + 'static) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    /// Validates the configuration and builds the manager.
    ///
    /// Without a dialogue generator every line is a fallback line.
    pub fn build(self) -> Result<InteractionManager, ConfigError> {
        self.config.validate()?;
        let compatibility = self.config.compatibility_table()?;

        let mut scanner = SpatialScanner::new(
            self.config.interaction_distance,
            self.config.interaction_cooldown(),
        );
        if let Some(index) = self.index {
            scanner = scanner.with_index(index);
        }

        log::debug!(
            "Interaction manager ready: distance {}, cooldown {:?}, duration {:?}",
            self.config.interaction_distance,
            self.config.interaction_cooldown(),
            self.config.interaction_duration()
        );

        Ok(InteractionManager {
            relationships: RelationshipStore::new(compatibility, self.config.familiarity_increment)?,
            scanner,
            cooldowns: CooldownLedger::new(),
            sessions: Vec::new(),
            dialogue: self
                .dialogue
                .unwrap_or_else(|| Arc::new(FallbackOnly) as Arc<dyn DialogueGenerator>),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(NullRenderer) as Arc<dyn Renderer>),
            movement: self
                .movement
                .unwrap_or_else(|| Arc::new(NullMovement) as Arc<dyn MovementSystem>),
            now: Duration::ZERO,
            enabled: true,
            config: self.config,
        })
    }
}

/// Generator that always declines, so sessions use fallback lines
struct FallbackOnly;

#[async_trait::async_trait]
impl DialogueGenerator for FallbackOnly {
    async fn generate(&self, _context: &crate::traits::DialogueContext) -> anyhow::Result<String> {
        anyhow::bail!("no dialogue generator configured")
    }

    async fn respond(
        &self,
        _context: &crate::traits::DialogueContext,
        _prior_text: &str,
    ) -> anyhow::Result<String> {
        anyhow::bail!("no dialogue generator configured")
    }
}
