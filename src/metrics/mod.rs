//! Rolling statistics consumed by the policy and reward model, and the
//! training history log.

pub mod performance;
pub mod statistics;
pub mod tracker;

pub use performance::PerformanceTracker;
pub use statistics::Statistics;
pub use tracker::{TrainingHistory, TrainingRecord};

use std::collections::VecDeque;

/// Push onto a bounded window, evicting the oldest sample when full
pub(crate) fn push_bounded<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    if window.len() >= capacity.max(1) {
        window.pop_front();
    }
    window.push_back(value);
}

/// Mean of the newest `n` samples, or `None` when fewer than `n` exist
pub(crate) fn recent_mean(window: &VecDeque<f32>, n: usize) -> Option<f32> {
    if n == 0 || window.len() < n {
        return None;
    }
    let sum: f32 = window.iter().rev().take(n).sum();
    Some(sum / n as f32)
}
