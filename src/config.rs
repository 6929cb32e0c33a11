//! Agent configuration.
//!
//! Every threshold and window size used by the feedback loops lives here so
//! it can be tuned from a JSON file without touching the engine. Any field
//! missing from the JSON falls back to its default.

use serde::{Serialize, Deserialize};
use std::path::Path;
use tracing::info;

use crate::error::{QosError, Result};
use crate::optimizer::LearningRateSchedule;
use crate::types::Allocation;

/// Which value-model back-end the agent learns with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackendKind {
    /// Dense state x action table over the discretised state index
    #[default]
    Tabular,
    /// Small feed-forward approximator over the feature vector
    Approximate,
}

/// State encoding parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Link capacity in Mbps
    pub capacity_mbps: f32,
    /// A class below this satisfaction counts twice towards starvation severity
    pub emergency_satisfaction: f32,
    /// A class below this satisfaction counts once towards starvation severity
    pub warning_satisfaction: f32,
    /// Upper edges of the demand/capacity bins
    pub congestion_edges: Vec<f32>,
    /// Upper edges of the video user-share bins
    pub dominance_edges: Vec<f32>,
    /// Upper edges of the worst-case satisfaction bins
    pub satisfaction_edges: Vec<f32>,
    /// User count treated as "a lot" when scaling features
    pub max_users: f32,
    /// Demand features are capped at this multiple of capacity
    pub demand_feature_cap: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            capacity_mbps: 100.0,
            emergency_satisfaction: 30.0,
            warning_satisfaction: 60.0,
            congestion_edges: vec![0.5, 0.8, 1.0, 1.5],
            dominance_edges: vec![0.2, 0.4, 0.6],
            satisfaction_edges: vec![20.0, 40.0, 60.0, 80.0],
            max_users: 100.0,
            demand_feature_cap: 2.0,
        }
    }
}

/// Action catalog and masking parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Candidate splits, ordered. Index identity is stable for the agent's lifetime.
    pub entries: Vec<Allocation>,
    /// Balanced splits used under acute starvation and emergency override
    pub protective: Vec<usize>,
    /// Splits favoured during exploration
    pub priority: Vec<usize>,
    /// Demand/capacity above which the strict video cap applies
    pub severe_congestion_ratio: f32,
    pub severe_video_cap: f32,
    /// Demand/capacity above which the loose video cap applies
    pub moderate_congestion_ratio: f32,
    pub moderate_video_cap: f32,
    /// Under either level of congestion no split may give one class more
    /// than this share
    pub class_share_cap: f32,
    /// Satisfaction under which a class counts as acutely starving
    pub emergency_satisfaction: f32,
    /// How many acutely starving classes trigger the protective subset
    pub emergency_min_classes: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            entries: vec![
                Allocation::new(0.34, 0.33, 0.33),
                Allocation::new(0.40, 0.30, 0.30),
                Allocation::new(0.30, 0.40, 0.30),
                Allocation::new(0.30, 0.30, 0.40),
                Allocation::new(0.50, 0.25, 0.25),
                Allocation::new(0.25, 0.50, 0.25),
                Allocation::new(0.25, 0.25, 0.50),
                Allocation::new(0.20, 0.20, 0.60),
                Allocation::new(0.15, 0.15, 0.70),
                Allocation::new(0.60, 0.20, 0.20),
                Allocation::new(0.20, 0.60, 0.20),
                Allocation::new(0.45, 0.45, 0.10),
                Allocation::new(0.40, 0.40, 0.20),
                Allocation::new(0.35, 0.35, 0.30),
                Allocation::new(0.10, 0.10, 0.80),
                Allocation::new(0.05, 0.05, 0.90),
            ],
            protective: vec![0, 1, 2, 12, 13],
            priority: vec![0, 1, 2, 3, 12, 13],
            severe_congestion_ratio: 1.5,
            severe_video_cap: 0.5,
            moderate_congestion_ratio: 1.0,
            moderate_video_cap: 0.7,
            class_share_cap: 0.9,
            emergency_satisfaction: 25.0,
            emergency_min_classes: 2,
        }
    }
}

/// Action selection parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Number of recent worst-case satisfaction samples read for adaptive exploration
    pub history_window: usize,
    /// Mean worst-case satisfaction below which exploration is raised
    pub poor_performance: f32,
    /// Mean worst-case satisfaction above which exploration is lowered
    pub good_performance: f32,
    pub poor_boost: f32,
    /// Upper bound of the boosted exploration rate
    pub exploration_ceiling: f32,
    pub good_damping: f32,
    /// Chance an exploratory pick comes from the priority subset
    pub priority_explore_prob: f32,
    /// Chance a greedy pick is swapped for the runner-up
    pub second_best_prob: f32,
    /// Worst-case satisfaction below which the emergency override kicks in
    pub emergency_floor: f32,
    /// Chance the emergency override picks a protective split
    pub emergency_bias: f32,
    /// Demand/capacity above which the video ceiling is enforced
    pub overload_ratio: f32,
    pub video_ceiling: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            history_window: 20,
            poor_performance: 50.0,
            good_performance: 80.0,
            poor_boost: 1.5,
            exploration_ceiling: 0.6,
            good_damping: 0.5,
            priority_explore_prob: 0.8,
            second_best_prob: 0.1,
            emergency_floor: 20.0,
            emergency_bias: 0.8,
            overload_ratio: 1.2,
            video_ceiling: 0.6,
        }
    }
}

/// Exploration-rate lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub initial: f32,
    /// Floor the rate never drops below
    pub min: f32,
    /// Multiplicative decay per update under ordinary performance
    pub decay: f32,
    /// Decay used when recent performance is strong
    pub fast_decay: f32,
    /// Decay used when recent performance is weak
    pub slow_decay: f32,
    /// Samples averaged when judging recent performance
    pub window: usize,
    pub strong_performance: f32,
    pub weak_performance: f32,
    /// Consecutive bad ticks after which the rate is pushed back up
    pub bad_streak: usize,
    pub boost: f32,
    /// Boosting never lifts the rate above this
    pub boost_ceiling: f32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            initial: 1.0,
            min: 0.05,
            decay: 0.995,
            fast_decay: 0.99,
            slow_decay: 0.999,
            window: 20,
            strong_performance: 75.0,
            weak_performance: 40.0,
            bad_streak: 10,
            boost: 0.05,
            boost_ceiling: 0.5,
        }
    }
}

/// Reward shaping parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Rewards are clamped to [-clip, clip]
    pub clip: f32,
    /// Nested starvation thresholds, most severe first
    pub critical: f32,
    pub severe: f32,
    pub warning: f32,
    /// Nested satisfaction tiers, lowest first
    pub good: f32,
    pub great: f32,
    pub excellent: f32,
    /// Worst-case satisfaction considered fair
    pub fair_floor: f32,
    /// Spread under which classes count as balanced
    pub balanced_spread: f32,
    /// Spread over which classes count as lopsided
    pub lopsided_spread: f32,
    /// Satisfaction above which extra bandwidth is counted as waste
    pub waste_threshold: f32,
    /// Video share considered hogging the link
    pub video_hog_share: f32,
    /// Weight of the worst-case improvement between ticks
    pub improvement_weight: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            clip: 20.0,
            critical: 20.0,
            severe: 40.0,
            warning: 60.0,
            good: 70.0,
            great: 80.0,
            excellent: 90.0,
            fair_floor: 70.0,
            balanced_spread: 15.0,
            lopsided_spread: 50.0,
            waste_threshold: 150.0,
            video_hog_share: 0.6,
            improvement_weight: 0.05,
        }
    }
}

/// Rolling performance statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Samples retained per rolling window
    pub capacity: usize,
    /// Worst-case satisfaction below which a tick counts as bad
    pub bad_threshold: f32,
    /// Satisfaction below which a demanding class counts as starved
    pub starvation_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            capacity: 100,
            bad_threshold: 40.0,
            starvation_threshold: 40.0,
        }
    }
}

/// Tabular Q-learning parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularConfig {
    pub learning_rate: f32,
    pub discount: f32,
}

impl Default for TabularConfig {
    fn default() -> Self {
        TabularConfig {
            learning_rate: 0.1,
            discount: 0.9,
        }
    }
}

/// Approximate Q-learning parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproxConfig {
    pub hidden_sizes: Vec<usize>,
    pub learning_rate: LearningRateSchedule,
    pub discount: f32,
    pub buffer_capacity: usize,
    pub batch_size: usize,
    /// Bootstrapped targets are clamped to [-target_clip, target_clip]
    pub target_clip: f32,
    /// TD errors are clamped to [-td_clip, td_clip] before the update
    pub td_clip: f32,
    pub target_update_interval: usize,
    /// Steps during which the shorter sync interval is used
    pub warmup_steps: usize,
    pub warmup_update_interval: usize,
    /// Only adjust the output row of the taken action
    pub shallow_update: bool,
    /// Global gradient norm limit for the full-backprop update
    pub max_grad_norm: f32,
}

impl Default for ApproxConfig {
    fn default() -> Self {
        ApproxConfig {
            hidden_sizes: vec![64, 32],
            learning_rate: LearningRateSchedule::step_decay(0.001, 0.95, 1000),
            discount: 0.95,
            buffer_capacity: 10_000,
            batch_size: 32,
            target_clip: 100.0,
            td_clip: 1.0,
            target_update_interval: 200,
            warmup_steps: 500,
            warmup_update_interval: 50,
            shallow_update: true,
            max_grad_norm: 1.0,
        }
    }
}

/// Top-level agent configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub backend: BackendKind,
    /// Seed for every random draw the agent makes; entropy when absent
    pub seed: Option<u64>,
    /// Entries kept in the training history log
    pub history_capacity: usize,
    pub encoder: EncoderConfig,
    pub catalog: CatalogConfig,
    pub policy: PolicyConfig,
    pub exploration: ExplorationConfig,
    pub reward: RewardConfig,
    pub tracker: TrackerConfig,
    pub tabular: TabularConfig,
    pub approx: ApproxConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            backend: BackendKind::default(),
            seed: None,
            history_capacity: 1000,
            encoder: EncoderConfig::default(),
            catalog: CatalogConfig::default(),
            policy: PolicyConfig::default(),
            exploration: ExplorationConfig::default(),
            reward: RewardConfig::default(),
            tracker: TrackerConfig::default(),
            tabular: TabularConfig::default(),
            approx: ApproxConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&data)?;
        info!(path = %path.as_ref().display(), backend = ?config.backend, "loaded agent config");
        Ok(config)
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if !(self.encoder.capacity_mbps > 0.0) {
            return Err(QosError::invalid_config("encoder.capacity_mbps", "must be positive"));
        }
        for (name, edges) in [
            ("encoder.congestion_edges", &self.encoder.congestion_edges),
            ("encoder.dominance_edges", &self.encoder.dominance_edges),
            ("encoder.satisfaction_edges", &self.encoder.satisfaction_edges),
        ] {
            if edges.windows(2).any(|w| !(w[0] < w[1])) {
                return Err(QosError::invalid_config(name, "bin edges must be strictly increasing"));
            }
        }

        let catalog = &self.catalog;
        if catalog.entries.is_empty() {
            return Err(QosError::invalid_config("catalog.entries", "catalog must not be empty"));
        }
        for (i, entry) in catalog.entries.iter().enumerate() {
            if entry.as_array().iter().any(|r| !r.is_finite() || *r < 0.0 || *r > 1.0) {
                return Err(QosError::invalid_config(
                    format!("catalog.entries[{}]", i),
                    "ratios must lie in [0, 1]".to_string(),
                ));
            }
            if entry.sum() <= 0.0 {
                return Err(QosError::invalid_config(
                    format!("catalog.entries[{}]", i),
                    "ratios must not all be zero".to_string(),
                ));
            }
        }
        for (name, subset) in [("catalog.protective", &catalog.protective), ("catalog.priority", &catalog.priority)] {
            if subset.is_empty() {
                return Err(QosError::invalid_config(name, "subset must not be empty"));
            }
            if let Some(bad) = subset.iter().find(|&&i| i >= catalog.entries.len()) {
                return Err(QosError::invalid_config(
                    name.to_string(),
                    format!("index {} out of range for {} entries", bad, catalog.entries.len()),
                ));
            }
        }

        for (name, cap) in [
            ("catalog.severe_video_cap", catalog.severe_video_cap),
            ("catalog.moderate_video_cap", catalog.moderate_video_cap),
            ("catalog.class_share_cap", catalog.class_share_cap),
        ] {
            if !(0.0..=1.0).contains(&cap) {
                return Err(QosError::invalid_config(name, "must lie in [0, 1]"));
            }
        }
        if !(catalog.moderate_congestion_ratio > 0.0)
            || !catalog.severe_congestion_ratio.is_finite()
            || catalog.moderate_congestion_ratio > catalog.severe_congestion_ratio
        {
            return Err(QosError::invalid_config(
                "catalog",
                "require 0 < moderate_congestion_ratio <= severe_congestion_ratio",
            ));
        }

        for (name, p) in [
            ("policy.priority_explore_prob", self.policy.priority_explore_prob),
            ("policy.second_best_prob", self.policy.second_best_prob),
            ("policy.emergency_bias", self.policy.emergency_bias),
            ("policy.video_ceiling", self.policy.video_ceiling),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(QosError::invalid_config(name, "must lie in [0, 1]"));
            }
        }

        let exploration = &self.exploration;
        if !(0.0..=1.0).contains(&exploration.min) || exploration.initial < exploration.min || exploration.initial > 1.0 {
            return Err(QosError::invalid_config(
                "exploration",
                "require 0 <= min <= initial <= 1",
            ));
        }

        let reward = &self.reward;
        if !(reward.clip > 0.0) {
            return Err(QosError::invalid_config("reward.clip", "must be positive"));
        }
        for (name, tiers) in [
            ("reward.critical/severe/warning", [reward.critical, reward.severe, reward.warning]),
            ("reward.good/great/excellent", [reward.good, reward.great, reward.excellent]),
        ] {
            if tiers.iter().any(|t| !t.is_finite()) || !(tiers[0] < tiers[1] && tiers[1] < tiers[2]) {
                return Err(QosError::invalid_config(name, "thresholds must be finite and strictly increasing"));
            }
        }
        if self.tracker.capacity == 0 {
            return Err(QosError::invalid_config("tracker.capacity", "must be greater than 0"));
        }

        let rate = self.tabular.learning_rate;
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(QosError::invalid_config("tabular.learning_rate", "must lie in (0, 1]"));
        }

        let approx = &self.approx;
        approx
            .learning_rate
            .check()
            .map_err(|reason| QosError::invalid_config("approx.learning_rate", reason))?;
        if approx.buffer_capacity == 0 || approx.batch_size == 0 {
            return Err(QosError::invalid_config("approx", "buffer_capacity and batch_size must be greater than 0"));
        }
        if approx.batch_size > approx.buffer_capacity {
            return Err(QosError::invalid_config("approx.batch_size", "must not exceed buffer_capacity"));
        }
        if approx.hidden_sizes.iter().any(|&h| h == 0) {
            return Err(QosError::invalid_config("approx.hidden_sizes", "layers must have at least one unit"));
        }
        if approx.target_update_interval == 0 || approx.warmup_update_interval == 0 {
            return Err(QosError::invalid_config("approx", "target sync intervals must be greater than 0"));
        }
        for (name, gamma) in [("tabular.discount", self.tabular.discount), ("approx.discount", approx.discount)] {
            if !(0.0..1.0).contains(&gamma) {
                return Err(QosError::invalid_config(name, "must lie in [0, 1)"));
            }
        }
        Ok(())
    }
}
