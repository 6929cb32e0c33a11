use super::state;
use crate::metrics::PerformanceTracker;
use crate::reward::RewardModel;
use crate::types::{Allocation, TrafficClass};

#[test]
fn test_balanced_service_beats_starvation() {
    let model = RewardModel::default();
    let before = state((5, 30.0, 60.0), (5, 10.0, 60.0), (5, 40.0, 60.0));
    let balanced = state((5, 30.0, 92.0), (5, 10.0, 95.0), (5, 40.0, 90.0));
    let starved = state((5, 30.0, 10.0), (5, 10.0, 15.0), (5, 40.0, 150.0));
    let split = Allocation::equal();

    let good = model.evaluate(&before, &split, &balanced);
    let bad = model.evaluate(&before, &split, &starved);
    assert!(good > 0.0);
    assert!(bad < 0.0);
    assert!(good > bad);
}

#[test]
fn test_reward_is_clamped() {
    let model = RewardModel::default();
    let clip = model.clip();
    let worst = state((5, 80.0, 0.0), (5, 80.0, 0.0), (5, 80.0, 0.0));
    let best = state((5, 10.0, 100.0), (5, 10.0, 100.0), (5, 10.0, 100.0));
    let hog = Allocation::new(0.05, 0.05, 0.9);

    let low = model.evaluate(&best, &hog, &worst);
    let high = model.evaluate(&worst, &Allocation::equal(), &best);
    assert!(low >= -clip && low <= clip);
    assert!(high >= -clip && high <= clip);
    assert_eq!(low, -clip);
}

#[test]
fn test_zero_demand_reward_is_finite() {
    let model = RewardModel::default();
    let idle = state((0, 0.0, 0.0), (0, 0.0, 0.0), (0, 0.0, 0.0));
    let r = model.evaluate(&idle, &Allocation::new(0.0, 0.0, 0.0), &idle);
    assert!(r.is_finite());
    assert!(r.abs() <= model.clip());
}

#[test]
fn test_efficiency_only_under_congestion() {
    let model = RewardModel::default();
    let split = Allocation::equal();
    let light = state((5, 20.0, 80.0), (5, 10.0, 80.0), (5, 30.0, 80.0));
    let congested = state((5, 50.0, 70.0), (5, 20.0, 90.0), (5, 80.0, 60.0));

    assert_eq!(model.breakdown(&light, &split, &light).efficiency, 0.0);
    let efficiency = model.breakdown(&congested, &split, &congested).efficiency;
    assert!(efficiency > 0.0 && efficiency <= 4.0);
}

#[test]
fn test_floor_tiers() {
    let model = RewardModel::default();
    let split = Allocation::equal();
    let floor = |worst: f32| {
        let s = state((5, 10.0, worst), (5, 10.0, 95.0), (5, 10.0, 95.0));
        model.breakdown(&s, &split, &s).floor
    };
    assert_eq!(floor(85.0), 6.0);
    assert_eq!(floor(72.0), 4.0);
    assert_eq!(floor(65.0), 2.0);
    assert_eq!(floor(45.0), 0.0);
    assert_eq!(floor(25.0), -3.0);
    assert_eq!(floor(5.0), -6.0);
}

#[test]
fn test_video_hog_penalty() {
    let model = RewardModel::default();
    let s = state((5, 30.0, 20.0), (5, 10.0, 70.0), (5, 40.0, 100.0));
    let hog = model.breakdown(&s, &Allocation::new(0.05, 0.05, 0.9), &s);
    let fair = model.breakdown(&s, &Allocation::equal(), &s);
    assert_eq!(hog.video_hog, -2.0);
    assert_eq!(fair.video_hog, 0.0);
}

#[test]
fn test_waste_penalty_for_over_allocation() {
    let model = RewardModel::default();
    let s = state((5, 10.0, 300.0), (5, 10.0, 90.0), (5, 10.0, 90.0));
    let waste = model.breakdown(&s, &Allocation::equal(), &s).waste;
    assert_eq!(waste, -0.5);
}

#[test]
fn test_improvement_term_follows_worst_case() {
    let model = RewardModel::default();
    let split = Allocation::equal();
    let before = state((5, 10.0, 30.0), (5, 10.0, 80.0), (5, 10.0, 80.0));
    let after = state((5, 10.0, 50.0), (5, 10.0, 80.0), (5, 10.0, 80.0));
    assert!((model.breakdown(&before, &split, &after).improvement - 1.0).abs() < 1e-6);
    assert!((model.breakdown(&after, &split, &before).improvement + 1.0).abs() < 1e-6);
}

#[test]
fn test_reward_updates_tracker() {
    let model = RewardModel::default();
    let mut tracker = PerformanceTracker::default();
    let s = state((5, 30.0, 10.0), (5, 10.0, 90.0), (5, 40.0, 90.0));
    for _ in 0..3 {
        let r = model.reward(&s, &Allocation::equal(), &s, &mut tracker);
        assert!(r.abs() <= model.clip());
    }
    assert_eq!(tracker.total_ticks(), 3);
    assert_eq!(tracker.consecutive_bad(), 3);
    assert_eq!(tracker.starvation_count(TrafficClass::Web), 3);
    assert_eq!(tracker.starvation_count(TrafficClass::Video), 0);
    assert_eq!(tracker.recent_min_satisfaction(3), Some(10.0));

    let fine = state((5, 30.0, 90.0), (5, 10.0, 90.0), (5, 40.0, 90.0));
    model.reward(&s, &Allocation::equal(), &fine, &mut tracker);
    assert_eq!(tracker.consecutive_bad(), 0);
}
