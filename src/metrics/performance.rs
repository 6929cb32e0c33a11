use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use super::{push_bounded, recent_mean};
use crate::config::TrackerConfig;
use crate::types::{NetworkState, TrafficClass, NUM_CLASSES};

/// Rolling view of how well the link has been shared lately.
///
/// The reward model feeds it once per tick; the policy and the exploration
/// schedule read it to decide how adventurous to be.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTracker {
    /// Worst-case satisfaction per tick, oldest first
    min_satisfaction: VecDeque<f32>,
    rewards: VecDeque<f32>,
    /// Ticks each class spent starved
    starvation_counts: [u64; NUM_CLASSES],
    /// Ticks in a row whose worst case was below the bad threshold
    consecutive_bad: usize,
    total_ticks: u64,
    capacity: usize,
    bad_threshold: f32,
    starvation_threshold: f32,
}

impl PerformanceTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        let capacity = config.capacity.max(1);
        PerformanceTracker {
            min_satisfaction: VecDeque::with_capacity(capacity),
            rewards: VecDeque::with_capacity(capacity),
            starvation_counts: [0; NUM_CLASSES],
            consecutive_bad: 0,
            total_ticks: 0,
            capacity,
            bad_threshold: config.bad_threshold,
            starvation_threshold: config.starvation_threshold,
        }
    }

    /// Fold one tick's outcome into the rolling counters
    pub fn record(&mut self, outcome: &NetworkState, reward: f32) {
        let worst = outcome.min_satisfaction();
        push_bounded(&mut self.min_satisfaction, worst, self.capacity);
        push_bounded(&mut self.rewards, reward, self.capacity);

        for class in TrafficClass::ALL {
            let telemetry = outcome.class(class);
            if telemetry.has_demand() && telemetry.satisfaction < self.starvation_threshold {
                self.starvation_counts[class.index()] += 1;
            }
        }

        if worst < self.bad_threshold {
            self.consecutive_bad += 1;
        } else {
            self.consecutive_bad = 0;
        }
        self.total_ticks += 1;
    }

    /// Mean worst-case satisfaction over the newest `window` ticks, or `None`
    /// when there is not enough history yet
    pub fn recent_min_satisfaction(&self, window: usize) -> Option<f32> {
        recent_mean(&self.min_satisfaction, window)
    }

    pub fn recent_reward(&self, window: usize) -> Option<f32> {
        recent_mean(&self.rewards, window)
    }

    pub fn min_satisfaction_history(&self) -> &VecDeque<f32> {
        &self.min_satisfaction
    }

    pub fn reward_history(&self) -> &VecDeque<f32> {
        &self.rewards
    }

    pub fn consecutive_bad(&self) -> usize {
        self.consecutive_bad
    }

    pub fn starvation_count(&self, class: TrafficClass) -> u64 {
        self.starvation_counts[class.index()]
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bad_threshold(&self) -> f32 {
        self.bad_threshold
    }

    pub fn starvation_threshold(&self) -> f32 {
        self.starvation_threshold
    }

    /// Take over the rolling data of a saved tracker. Capacity and
    /// thresholds stay as configured; windows longer than the capacity keep
    /// their newest samples.
    pub fn restore_history(&mut self, saved: PerformanceTracker) {
        self.min_satisfaction = saved.min_satisfaction;
        self.rewards = saved.rewards;
        for window in [&mut self.min_satisfaction, &mut self.rewards] {
            while window.len() > self.capacity {
                window.pop_front();
            }
        }
        self.starvation_counts = saved.starvation_counts;
        self.consecutive_bad = saved.consecutive_bad;
        self.total_ticks = saved.total_ticks;
    }

    pub fn clear(&mut self) {
        self.min_satisfaction.clear();
        self.rewards.clear();
        self.starvation_counts = [0; NUM_CLASSES];
        self.consecutive_bad = 0;
        self.total_ticks = 0;
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}
