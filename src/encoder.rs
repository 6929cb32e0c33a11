//! Turns raw telemetry into what the value models consume.
//!
//! The tabular learner gets a single bounded index built from four binned
//! features (starvation severity, congestion, video dominance, worst-case
//! satisfaction) in mixed radix. The approximator gets a fixed-length
//! vector whose entries stay roughly within [-2, 2].

use ndarray::Array1;

use crate::config::EncoderConfig;
use crate::types::{EncodedState, NetworkState, TrafficClass, DEMAND_EPSILON};

/// Length of the feature vector handed to the approximator
pub const FEATURE_DIM: usize = 12;

/// Distinct starvation-severity levels
const STARVATION_LEVELS: usize = 4;

/// Scale applied to satisfaction before squashing
const SATISFACTION_SCALE: f32 = 50.0;

#[derive(Clone, Debug)]
pub struct StateEncoder {
    config: EncoderConfig,
}

/// Index of the bin `value` falls in, given strictly increasing upper edges.
fn bin(value: f32, edges: &[f32]) -> usize {
    edges.iter().take_while(|&&edge| value >= edge).count()
}

impl StateEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        StateEncoder { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn congestion_levels(&self) -> usize {
        self.config.congestion_edges.len() + 1
    }

    fn dominance_levels(&self) -> usize {
        self.config.dominance_edges.len() + 1
    }

    fn satisfaction_levels(&self) -> usize {
        self.config.satisfaction_edges.len() + 1
    }

    /// Size of the discrete state space
    pub fn num_states(&self) -> usize {
        STARVATION_LEVELS * self.congestion_levels() * self.dominance_levels() * self.satisfaction_levels()
    }

    pub fn feature_dim(&self) -> usize {
        FEATURE_DIM
    }

    pub fn encode(&self, state: &NetworkState) -> EncodedState {
        EncodedState {
            index: self.discretize(state),
            features: self.features(state),
        }
    }

    /// Weighted starvation count folded into [0, STARVATION_LEVELS).
    /// Classes under the emergency threshold count twice.
    pub fn starvation_level(&self, state: &NetworkState) -> usize {
        let score: usize = TrafficClass::ALL
            .iter()
            .map(|&class| {
                let satisfaction = state.effective_satisfaction(class);
                if satisfaction < self.config.emergency_satisfaction {
                    2
                } else if satisfaction < self.config.warning_satisfaction {
                    1
                } else {
                    0
                }
            })
            .sum();
        match score {
            0 => 0,
            1 | 2 => 1,
            3 | 4 => 2,
            _ => 3,
        }
    }

    pub fn congestion_level(&self, state: &NetworkState) -> usize {
        bin(state.demand_ratio(self.config.capacity_mbps), &self.config.congestion_edges)
    }

    /// Bin of the share of users that belong to video, the heaviest class
    pub fn dominance_level(&self, state: &NetworkState) -> usize {
        bin(state.user_share(TrafficClass::Video), &self.config.dominance_edges)
    }

    pub fn worst_satisfaction_level(&self, state: &NetworkState) -> usize {
        bin(state.min_satisfaction(), &self.config.satisfaction_edges)
    }

    /// Mixed-radix state index, clamped into `0..num_states()`
    pub fn discretize(&self, state: &NetworkState) -> usize {
        let index = ((self.starvation_level(state) * self.congestion_levels() + self.congestion_level(state))
            * self.dominance_levels()
            + self.dominance_level(state))
            * self.satisfaction_levels()
            + self.worst_satisfaction_level(state);
        index.min(self.num_states() - 1)
    }

    /// Scaled feature vector:
    /// `[users x3, demand x3, satisfaction x3, congestion, worst satisfaction, spread]`
    pub fn features(&self, state: &NetworkState) -> Array1<f32> {
        let max_users = self.config.max_users.max(1.0);
        let capacity = self.config.capacity_mbps.max(DEMAND_EPSILON);
        let cap = self.config.demand_feature_cap;
        let squash = |satisfaction: f32| ((satisfaction - SATISFACTION_SCALE) / SATISFACTION_SCALE).tanh();

        let mut features = Vec::with_capacity(FEATURE_DIM);
        for class in TrafficClass::ALL {
            features.push((state.class(class).active_users as f32 / max_users).min(2.0));
        }
        for class in TrafficClass::ALL {
            features.push((state.class(class).demand_mbps / capacity).min(cap));
        }
        for class in TrafficClass::ALL {
            features.push(squash(state.effective_satisfaction(class)));
        }
        features.push(state.demand_ratio(capacity).min(cap));
        features.push(squash(state.min_satisfaction()));
        features.push((state.satisfaction_spread() / SATISFACTION_SCALE).tanh());

        Array1::from_vec(features)
    }
}

impl Default for StateEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}
