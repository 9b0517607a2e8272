use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::personality::{CompatibilityRule, CompatibilityTable, PersonalityTrait};

/// Rejected configuration. Values are never clamped into range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("familiarity_increment must not exceed 1.0, got {0}")]
    IncrementTooLarge(f32),
    #[error("compatibility delta for {a}+{b} must be finite, got {delta}")]
    InvalidCompatibility {
        a: PersonalityTrait,
        b: PersonalityTrait,
        delta: f32,
    },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for proximity detection, conversation timing and relationship growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum distance between two agents for a conversation to start
    pub interaction_distance: f32,
    /// Minimum time between two sessions of the same pair
    pub interaction_cooldown_ms: u64,
    /// How long both lines stay on screen
    pub interaction_duration_ms: u64,
    pub familiarity_increment: f32,
    /// Simulated time a dialogue request may stay pending before the fallback line is used
    pub dialogue_timeout_ms: u64,
    /// Agents farther apart than this step toward each other while talking
    pub comfortable_distance: f32,
    pub approach_step: f32,
    /// Cap on simultaneously live sessions; `None` means unlimited
    pub max_concurrent_sessions: Option<usize>,
    /// Overrides applied on top of the default compatibility table
    pub compatibility: Vec<CompatibilityRule>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            interaction_distance: 120.0,
            interaction_cooldown_ms: 15_000,
            interaction_duration_ms: 3_000,
            familiarity_increment: 0.05,
            dialogue_timeout_ms: 2_000,
            comfortable_distance: 60.0,
            approach_step: 2.0,
            max_concurrent_sessions: None,
            compatibility: Vec::new(),
        }
    }
}

impl InteractionConfig {
    pub fn with_interaction_distance(mut self, distance: f32) -> Self {
        self.interaction_distance = distance;
        self
    }

    pub fn with_interaction_cooldown(mut self, cooldown: Duration) -> Self {
        self.interaction_cooldown_ms = duration_ms(cooldown);
        self
    }

    pub fn with_interaction_duration(mut self, duration: Duration) -> Self {
        self.interaction_duration_ms = duration_ms(duration);
        self
    }

    pub fn with_familiarity_increment(mut self, increment: f32) -> Self {
        self.familiarity_increment = increment;
        self
    }

    pub fn with_dialogue_timeout(mut self, timeout: Duration) -> Self {
        self.dialogue_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = Some(max);
        self
    }

    pub fn with_compatibility_rule(mut self, rule: CompatibilityRule) -> Self {
        self.compatibility.push(rule);
        self
    }

    pub fn interaction_cooldown(&self) -> Duration {
        Duration::from_millis(self.interaction_cooldown_ms)
    }

    pub fn interaction_duration(&self) -> Duration {
        Duration::from_millis(self.interaction_duration_ms)
    }

    pub fn dialogue_timeout(&self) -> Duration {
        Duration::from_millis(self.dialogue_timeout_ms)
    }

    /// Parses a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Loading interaction config from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_f32("interaction_distance", self.interaction_distance)?;
        positive_ms("interaction_cooldown_ms", self.interaction_cooldown_ms)?;
        positive_ms("interaction_duration_ms", self.interaction_duration_ms)?;
        check_familiarity_increment(self.familiarity_increment)?;
        positive_ms("dialogue_timeout_ms", self.dialogue_timeout_ms)?;
        non_negative_f32("comfortable_distance", self.comfortable_distance)?;
        non_negative_f32("approach_step", self.approach_step)?;
        if self.max_concurrent_sessions == Some(0) {
            return Err(ConfigError::NotPositive {
                field: "max_concurrent_sessions",
                value: 0.0,
            });
        }
        self.compatibility_table()?;
        Ok(())
    }

    /// The default table with this config's overrides applied
    pub fn compatibility_table(&self) -> Result<CompatibilityTable, ConfigError> {
        CompatibilityTable::default().with_rules(&self.compatibility)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Increments must keep familiarity inside `[0, 1]` and never lower it
pub(crate) fn check_familiarity_increment(increment: f32) -> Result<(), ConfigError> {
    positive_f32("familiarity_increment", increment)?;
    if increment > 1.0 {
        return Err(ConfigError::IncrementTooLarge(increment));
    }
    Ok(())
}

fn positive_f32(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: f64::from(value),
        })
    }
}

fn non_negative_f32(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative {
            field,
            value: f64::from(value),
        })
    }
}

fn positive_ms(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value: 0.0 })
    }
}
