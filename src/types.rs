use serde::{Deserialize, Serialize};
use std::fmt;

use crate::personality::TraitSet;

/// Stable identifier of an agent tracked by the host simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A point or displacement in world space. `y` grows downward, as on screen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > f32::EPSILON {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }

    pub fn scaled(self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Cardinal facing of an agent sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    #[default]
    Down,
    Left,
}

impl Direction {
    /// Cardinal direction that best matches a displacement.
    ///
    /// Horizontal wins only when it strictly dominates, so exact diagonals face
    /// up or down.
    pub fn toward(delta: Vec2) -> Direction {
        if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if delta.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// Read-only snapshot of an NPC, handed to the manager by the host every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub position: Vec2,
    #[serde(default)]
    pub facing: Direction,
    #[serde(default)]
    pub traits: TraitSet,
}

impl Agent {
    /// Creates an agent snapshot at the given position with no traits
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            facing: Direction::default(),
            traits: TraitSet::default(),
        }
    }

    pub fn with_traits(mut self, traits: TraitSet) -> Self {
        self.traits = traits;
        self
    }

    pub fn with_facing(mut self, facing: Direction) -> Self {
        self.facing = facing;
        self
    }

    pub fn distance_to(&self, other: &Agent) -> f32 {
        self.position.distance(other.position)
    }
}

/// Unordered pair, stored with the smaller element first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pair<T> {
    low: T,
    high: T,
}

impl<T: Ord> Pair<T> {
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

impl<T: Copy + PartialEq> Pair<T> {
    pub fn low(&self) -> T {
        self.low
    }

    pub fn high(&self) -> T {
        self.high
    }

    pub fn contains(&self, item: T) -> bool {
        self.low == item || self.high == item
    }
}

/// Two distinct agents, order-independent
pub type AgentPair = Pair<AgentId>;

impl fmt::Display for AgentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let a = AgentPair::new(AgentId(7), AgentId(3));
        let b = AgentPair::new(AgentId(3), AgentId(7));
        assert_eq!(a, b);
        assert_eq!(a.low(), AgentId(3));
        assert_eq!(a.high(), AgentId(7));
        assert!(a.contains(AgentId(7)));
        assert!(!a.contains(AgentId(9)));
        assert_eq!(a.to_string(), "#3-#7");
    }

    #[test]
    fn direction_prefers_dominant_axis() {
        assert_eq!(Direction::toward(Vec2::new(10.0, 2.0)), Direction::Right);
        assert_eq!(Direction::toward(Vec2::new(-10.0, 2.0)), Direction::Left);
        assert_eq!(Direction::toward(Vec2::new(1.0, 5.0)), Direction::Down);
        assert_eq!(Direction::toward(Vec2::new(1.0, -5.0)), Direction::Up);
        assert_eq!(Direction::toward(Vec2::new(3.0, 3.0)), Direction::Down);
    }

    #[test]
    fn normalized_handles_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let unit = Vec2::new(3.0, 4.0).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }
}
