use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::state;
use crate::catalog::ActionCatalog;
use crate::config::{CatalogConfig, ExplorationConfig, PolicyConfig};
use crate::metrics::PerformanceTracker;
use crate::policy::Policy;
use crate::types::{Allocation, NetworkState};

fn greedy_policy() -> Policy {
    let config = PolicyConfig {
        second_best_prob: 0.0,
        ..PolicyConfig::default()
    };
    let exploration = ExplorationConfig {
        min: 0.0,
        ..ExplorationConfig::default()
    };
    Policy::new(config, &exploration)
}

fn tracker_with(worst: f32, ticks: usize) -> PerformanceTracker {
    let mut tracker = PerformanceTracker::default();
    let s = state((5, 10.0, worst), (5, 10.0, 100.0), (5, 10.0, 100.0));
    for _ in 0..ticks {
        tracker.record(&s, 0.0);
    }
    tracker
}

fn calm() -> NetworkState {
    state((5, 10.0, 90.0), (5, 10.0, 90.0), (5, 10.0, 90.0))
}

#[test]
fn test_exploit_picks_best_valid_action() {
    let policy = greedy_policy();
    let catalog = ActionCatalog::new(CatalogConfig::default(), 100.0);
    let tracker = PerformanceTracker::default();
    let mut rng = StdRng::seed_from_u64(0);

    let mut q = Array1::zeros(16);
    q[15] = 10.0;
    q[4] = 5.0;
    q[9] = 7.0;
    let valid = vec![0, 4, 9];
    for _ in 0..50 {
        let index = policy.select(&q, &calm(), &valid, &catalog, 0.0, &tracker, &mut rng);
        assert_eq!(index, 9);
    }
}

#[test]
fn test_second_best_substitution() {
    let config = PolicyConfig {
        second_best_prob: 1.0,
        ..PolicyConfig::default()
    };
    let exploration = ExplorationConfig {
        min: 0.0,
        ..ExplorationConfig::default()
    };
    let policy = Policy::new(config, &exploration);
    let catalog = ActionCatalog::new(CatalogConfig::default(), 100.0);
    let mut rng = StdRng::seed_from_u64(1);

    let mut q = Array1::zeros(16);
    q[3] = 2.0;
    q[5] = 1.0;
    let index = policy.select(&q, &calm(), &[3, 5, 6], &catalog, 0.0, &PerformanceTracker::default(), &mut rng);
    assert_eq!(index, 5);
}

#[test]
fn test_full_exploration_stays_in_valid_set() {
    let policy = greedy_policy();
    let catalog = ActionCatalog::new(CatalogConfig::default(), 100.0);
    let tracker = PerformanceTracker::default();
    let mut rng = StdRng::seed_from_u64(2);
    let q = Array1::zeros(16);
    let valid = vec![4, 5, 6, 12];
    let mut seen = Vec::new();
    for _ in 0..500 {
        let index = policy.select(&q, &calm(), &valid, &catalog, 1.0, &tracker, &mut rng);
        assert!(valid.contains(&index));
        if !seen.contains(&index) {
            seen.push(index);
        }
    }
    // The priority subset only intersects at 12, the rest come from uniform picks
    assert_eq!(seen.len(), valid.len());
}

#[test]
fn test_exploration_prefers_priority_subset() {
    let config = PolicyConfig {
        priority_explore_prob: 1.0,
        ..PolicyConfig::default()
    };
    let policy = Policy::new(config, &ExplorationConfig::default());
    let catalog = ActionCatalog::new(CatalogConfig::default(), 100.0);
    let tracker = PerformanceTracker::default();
    let mut rng = StdRng::seed_from_u64(3);
    let q = Array1::zeros(16);
    let valid: Vec<usize> = (0..16).collect();
    for _ in 0..200 {
        let index = policy.select(&q, &calm(), &valid, &catalog, 1.0, &tracker, &mut rng);
        assert!(catalog.priority().contains(&index));
    }
}

#[test]
fn test_emergency_override_picks_protective() {
    let config = PolicyConfig {
        emergency_bias: 1.0,
        ..PolicyConfig::default()
    };
    let policy = Policy::new(config, &ExplorationConfig::default());
    let catalog = ActionCatalog::new(CatalogConfig::default(), 100.0);
    let tracker = PerformanceTracker::default();
    let mut rng = StdRng::seed_from_u64(4);

    let mut q = Array1::zeros(16);
    q[15] = 100.0;
    let emergency = state((5, 10.0, 5.0), (5, 10.0, 90.0), (5, 10.0, 90.0));
    let valid: Vec<usize> = (0..16).collect();
    for _ in 0..100 {
        let index = policy.select(&q, &emergency, &valid, &catalog, 0.0, &tracker, &mut rng);
        assert!(catalog.protective().contains(&index));
    }
}

#[test]
fn test_adaptive_exploration() {
    let policy = Policy::new(PolicyConfig::default(), &ExplorationConfig::default());

    // Not enough history: stored rate is used
    assert_eq!(policy.adaptive_exploration(0.2, &tracker_with(10.0, 5)), 0.2);

    // Poor performance raises the rate, bounded by the ceiling
    let poor = tracker_with(30.0, 20);
    assert!((policy.adaptive_exploration(0.2, &poor) - 0.3).abs() < 1e-6);
    assert!((policy.adaptive_exploration(0.5, &poor) - 0.6).abs() < 1e-6);
    // Never lowered by the poor-performance branch
    assert!((policy.adaptive_exploration(0.9, &poor) - 0.9).abs() < 1e-6);

    // Good performance damps it, never below the floor
    let good = tracker_with(95.0, 20);
    assert!((policy.adaptive_exploration(0.2, &good) - 0.1).abs() < 1e-6);
    assert!((policy.adaptive_exploration(0.06, &good) - 0.05).abs() < 1e-6);

    // In between: unchanged
    assert_eq!(policy.adaptive_exploration(0.2, &tracker_with(65.0, 20)), 0.2);
}

#[test]
fn test_finalize_caps_video_under_overload() {
    let policy = Policy::new(PolicyConfig::default(), &ExplorationConfig::default());
    let overloaded = state((5, 20.0, 30.0), (5, 10.0, 30.0), (5, 120.0, 30.0));
    let out = policy.finalize(&Allocation::new(0.05, 0.05, 0.9), &overloaded, 100.0);
    assert!((out.video - 0.6).abs() < 1e-6);
    assert!((out.web - 0.2).abs() < 1e-6);
    assert!((out.audio - 0.2).abs() < 1e-6);
    assert!((out.sum() - 1.0).abs() < 1e-5);

    let light = calm();
    let untouched = policy.finalize(&Allocation::new(0.05, 0.05, 0.9), &light, 100.0);
    assert!((untouched.video - 0.9).abs() < 1e-6);
}

#[test]
fn test_finalize_normalizes() {
    let policy = Policy::new(PolicyConfig::default(), &ExplorationConfig::default());
    let out = policy.finalize(&Allocation::new(2.0, 1.0, 1.0), &calm(), 100.0);
    assert!((out.web - 0.5).abs() < 1e-6);
    assert!((out.sum() - 1.0).abs() < 1e-6);
}
