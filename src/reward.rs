//! Reward shaping.
//!
//! The reward mixes several competing QoS objectives: steep tiered penalties
//! for starving any class, a large bonus for keeping the worst-served class
//! above a fair floor, a balance term on the spread between classes, and an
//! efficiency bonus that only applies when the link is oversubscribed. The
//! sum is clamped to `[-clip, clip]` so a single transition can never
//! produce an outsized learning step.

use crate::config::RewardConfig;
use crate::metrics::PerformanceTracker;
use crate::types::{Allocation, NetworkState, TrafficClass};

/// Largest magnitude the improvement term can contribute
const IMPROVEMENT_LIMIT: f32 = 2.0;

/// Individual shaping terms of one reward, before clamping
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardBreakdown {
    pub starvation: f32,
    pub floor: f32,
    pub balance: f32,
    pub efficiency: f32,
    pub waste: f32,
    pub improvement: f32,
    pub video_hog: f32,
}

impl RewardBreakdown {
    pub fn raw_total(&self) -> f32 {
        self.starvation + self.floor + self.balance + self.efficiency + self.waste + self.improvement + self.video_hog
    }
}

#[derive(Clone, Debug)]
pub struct RewardModel {
    config: RewardConfig,
    capacity_mbps: f32,
}

impl RewardModel {
    pub fn new(config: RewardConfig, capacity_mbps: f32) -> Self {
        RewardModel { config, capacity_mbps }
    }

    pub fn clip(&self) -> f32 {
        self.config.clip.abs()
    }

    /// Score the transition and fold the outcome into `tracker`.
    pub fn reward(
        &self,
        state: &NetworkState,
        action: &Allocation,
        next_state: &NetworkState,
        tracker: &mut PerformanceTracker,
    ) -> f32 {
        let reward = self.evaluate(state, action, next_state);
        tracker.record(next_state, reward);
        reward
    }

    /// Clamped reward without touching any counters
    pub fn evaluate(&self, state: &NetworkState, action: &Allocation, next_state: &NetworkState) -> f32 {
        let total = self.breakdown(state, action, next_state).raw_total();
        if total.is_finite() {
            total.clamp(-self.clip(), self.clip())
        } else {
            0.0
        }
    }

    pub fn breakdown(&self, state: &NetworkState, action: &Allocation, next_state: &NetworkState) -> RewardBreakdown {
        let worst = next_state.min_satisfaction();
        RewardBreakdown {
            starvation: self.starvation_term(next_state),
            floor: self.floor_term(worst),
            balance: self.balance_term(next_state.satisfaction_spread(), worst),
            efficiency: self.efficiency_term(next_state, worst),
            waste: self.waste_term(next_state),
            improvement: self.improvement_term(state, next_state),
            video_hog: self.video_hog_term(action, next_state),
        }
    }

    /// Per-class tiered penalties below the starvation thresholds, scaled by
    /// the shortfall, and tiered bonuses above the satisfaction tiers
    fn starvation_term(&self, next_state: &NetworkState) -> f32 {
        let c = &self.config;
        TrafficClass::ALL
            .iter()
            .filter(|&&class| next_state.class(class).has_demand())
            .map(|&class| {
                let s = next_state.class(class).satisfaction;
                if s < c.critical {
                    -(8.0 + (c.critical - s) * 0.2)
                } else if s < c.severe {
                    -(4.0 + (c.severe - s) * 0.1)
                } else if s < c.warning {
                    -(1.5 + (c.warning - s) * 0.05)
                } else if s >= c.excellent {
                    2.0
                } else if s >= c.great {
                    1.5
                } else if s >= c.good {
                    1.0
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Bonus for keeping the worst-served class high
    fn floor_term(&self, worst: f32) -> f32 {
        let c = &self.config;
        if worst >= c.great {
            6.0
        } else if worst >= c.fair_floor {
            4.0
        } else if worst >= c.warning {
            2.0
        } else if worst >= c.severe {
            0.0
        } else if worst >= c.critical {
            -3.0
        } else {
            -6.0
        }
    }

    fn balance_term(&self, spread: f32, worst: f32) -> f32 {
        let c = &self.config;
        if spread < c.balanced_spread && worst >= c.warning {
            3.0
        } else if spread < 2.0 * c.balanced_spread {
            1.0
        } else if spread > c.lopsided_spread + 20.0 {
            -5.0
        } else if spread > c.lopsided_spread {
            -3.0
        } else {
            0.0
        }
    }

    /// Only under congestion: reward delivering most of the demand, as long
    /// as nobody was sacrificed for it
    fn efficiency_term(&self, next_state: &NetworkState, worst: f32) -> f32 {
        if next_state.total_demand() > self.capacity_mbps && worst >= self.config.severe {
            4.0 * next_state.served_fraction()
        } else {
            0.0
        }
    }

    /// Mild penalty for classes handed far more than they asked for
    fn waste_term(&self, next_state: &NetworkState) -> f32 {
        let threshold = self.config.waste_threshold;
        next_state
            .classes()
            .iter()
            .filter(|c| c.has_demand() && c.satisfaction > threshold)
            .map(|c| -0.5 * ((c.satisfaction - threshold) / 100.0).min(1.0))
            .sum()
    }

    fn improvement_term(&self, state: &NetworkState, next_state: &NetworkState) -> f32 {
        let delta = next_state.min_satisfaction() - state.min_satisfaction();
        (self.config.improvement_weight * delta).clamp(-IMPROVEMENT_LIMIT, IMPROVEMENT_LIMIT)
    }

    /// Penalise a video-heavy split while web or audio is starving
    fn video_hog_term(&self, action: &Allocation, next_state: &NetworkState) -> f32 {
        let video_share = action.normalized().video;
        let others_starving = [TrafficClass::Web, TrafficClass::Audio].iter().any(|&class| {
            let telemetry = next_state.class(class);
            telemetry.has_demand() && telemetry.satisfaction < self.config.severe
        });
        if video_share > self.config.video_hog_share && others_starving {
            -2.0
        } else {
            0.0
        }
    }
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::new(RewardConfig::default(), 100.0)
    }
}
