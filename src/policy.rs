//! Epsilon-greedy action selection over the masked catalog.
//!
//! The policy itself holds no mutable state: each call reads the value
//! estimates, the admissible indices and the performance history, and
//! draws from the agent's RNG.

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::catalog::ActionCatalog;
use crate::config::{ExplorationConfig, PolicyConfig};
use crate::metrics::PerformanceTracker;
use crate::types::{Allocation, NetworkState};

/// A chosen catalog entry and the split actually handed to the environment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    pub index: usize,
    pub allocation: Allocation,
}

#[derive(Clone, Debug)]
pub struct Policy {
    config: PolicyConfig,
    min_exploration: f32,
}

impl Policy {
    pub fn new(config: PolicyConfig, exploration: &ExplorationConfig) -> Self {
        Policy {
            config,
            min_exploration: exploration.min.clamp(0.0, 1.0),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Exploration rate adjusted to the recent worst-case satisfaction.
    ///
    /// Poor performance raises the stored rate up to the ceiling (never
    /// below the stored rate itself); good performance damps it. Without a
    /// full window of history the stored rate is used as is.
    pub fn adaptive_exploration(&self, stored_rate: f32, tracker: &PerformanceTracker) -> f32 {
        let c = &self.config;
        let rate = match tracker.recent_min_satisfaction(c.history_window) {
            Some(mean) if mean < c.poor_performance => {
                (stored_rate * c.poor_boost).min(c.exploration_ceiling).max(stored_rate)
            }
            Some(mean) if mean > c.good_performance => (stored_rate * c.good_damping).max(self.min_exploration),
            _ => stored_rate,
        };
        rate.clamp(self.min_exploration, 1.0)
    }

    /// Pick a catalog index among `valid`.
    ///
    /// `valid` must be non-empty; [`ActionCatalog::valid_indices`] never
    /// returns an empty set.
    #[allow(clippy::too_many_arguments)]
    pub fn select<R: Rng + ?Sized>(
        &self,
        q_values: &Array1<f32>,
        state: &NetworkState,
        valid: &[usize],
        catalog: &ActionCatalog,
        stored_rate: f32,
        tracker: &PerformanceTracker,
        rng: &mut R,
    ) -> usize {
        let Some(&fallback) = valid.first() else {
            return 0;
        };

        if state.min_satisfaction() < self.config.emergency_floor && rng.gen::<f32>() < self.config.emergency_bias {
            let protective = intersect(catalog.protective(), valid);
            if let Some(&index) = protective.choose(rng) {
                trace!(index, worst = state.min_satisfaction(), "emergency override");
                return index;
            }
        }

        let rate = self.adaptive_exploration(stored_rate, tracker);
        if rng.gen::<f32>() < rate {
            return self.explore(valid, catalog, rng).unwrap_or(fallback);
        }

        self.exploit(q_values, valid, rng).unwrap_or(fallback)
    }

    fn explore<R: Rng + ?Sized>(&self, valid: &[usize], catalog: &ActionCatalog, rng: &mut R) -> Option<usize> {
        if rng.gen::<f32>() < self.config.priority_explore_prob {
            let priority = intersect(catalog.priority(), valid);
            if let Some(&index) = priority.choose(rng) {
                return Some(index);
            }
        }
        valid.choose(rng).copied()
    }

    /// Best valid action, occasionally swapped for the runner-up
    fn exploit<R: Rng + ?Sized>(&self, q_values: &Array1<f32>, valid: &[usize], rng: &mut R) -> Option<usize> {
        let (best, second) = top_two(q_values, valid);
        let best = best?;
        match second {
            Some(runner_up) if rng.gen::<f32>() < self.config.second_best_prob => {
                trace!(best, runner_up, "second-best substitution");
                Some(runner_up)
            }
            _ => Some(best),
        }
    }

    /// Normalise the chosen split and, under overload, cap the video share
    pub fn finalize(&self, allocation: &Allocation, state: &NetworkState, capacity_mbps: f32) -> Allocation {
        let normalized = allocation.normalized();
        if state.demand_ratio(capacity_mbps) > self.config.overload_ratio {
            normalized.with_video_ceiling(self.config.video_ceiling)
        } else {
            normalized
        }
    }
}

fn intersect(subset: &[usize], valid: &[usize]) -> Vec<usize> {
    subset.iter().copied().filter(|i| valid.contains(i)).collect()
}

/// Indices of the highest and second-highest values among `valid`. Ties go
/// to the earlier index; non-finite or missing values rank last.
fn top_two(q_values: &Array1<f32>, valid: &[usize]) -> (Option<usize>, Option<usize>) {
    let value = |i: usize| {
        q_values
            .get(i)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(f32::NEG_INFINITY)
    };
    let mut best: Option<usize> = None;
    let mut second: Option<usize> = None;
    for &i in valid {
        match best {
            Some(b) if value(i) <= value(b) => {
                if second.map_or(true, |s| value(i) > value(s)) {
                    second = Some(i);
                }
            }
            _ => {
                second = best;
                best = Some(i);
            }
        }
    }
    (best, second)
}
