use serde::{Deserialize, Serialize};

use crate::elo::DEFAULT_K;

/// Chance that a battle skips rating proximity and pairs two random songs.
pub const DEFAULT_WILDCARD_PROBABILITY: f64 = 0.2;

/// Rating windows tried in order when looking for an opponent.
pub const DEFAULT_RATING_WINDOWS: [i32; 2] = [150, 300];

/// Number of recent pairs remembered per session.
pub const DEFAULT_RECENCY_CAP: usize = 10;

/// Tunables for matchmaking and rating updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub k_factor: i32,
    pub wildcard_probability: f64,
    pub rating_windows: Vec<i32>,
    pub recency_cap: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K,
            wildcard_probability: DEFAULT_WILDCARD_PROBABILITY,
            rating_windows: DEFAULT_RATING_WINDOWS.to_vec(),
            recency_cap: DEFAULT_RECENCY_CAP,
        }
    }
}

impl MatchConfig {
    /// Config with wildcard pairing switched off, for deterministic windowed matchmaking.
    pub fn without_wildcards() -> Self {
        Self {
            wildcard_probability: 0.0,
            ..Self::default()
        }
    }

    /// Wildcard probability usable as a coin weight; anything outside [0, 1] is clamped, NaN is 0.
    pub fn wildcard_chance(&self) -> f64 {
        if self.wildcard_probability.is_nan() {
            0.0
        } else {
            self.wildcard_probability.clamp(0.0, 1.0)
        }
    }
}
