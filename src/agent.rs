//! The agent facade the simulation loop talks to.
//!
//! Per tick the caller hands in telemetry and gets back a [`Decision`];
//! once the environment has applied it and reported the next telemetry, the
//! caller feeds both back with [`QosAgent::step`] (or the finer-grained
//! [`QosAgent::reward`] + [`QosAgent::update`]).
//!
//! ```rust,no_run
//! use bandwidth_rl::{ClassTelemetry, NetworkState, QosAgent};
//!
//! let mut agent = QosAgent::builder().seed(7).build()?;
//! let state = NetworkState::new(
//!     ClassTelemetry::new(10, 20.0, 60.0),
//!     ClassTelemetry::new(5, 5.0, 90.0),
//!     ClassTelemetry::new(8, 80.0, 30.0),
//! )?;
//! let decision = agent.act(&state);
//! // ... apply decision.allocation, observe the next tick ...
//! # let next_state = state.clone();
//! let outcome = agent.step(&state, &decision, &next_state);
//! println!("reward {:.2}, loss {:.4}", outcome.reward, outcome.loss);
//! # Ok::<(), bandwidth_rl::QosError>(())
//! ```

use std::path::Path;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::catalog::ActionCatalog;
use crate::config::{AgentConfig, BackendKind};
use crate::encoder::StateEncoder;
use crate::error::Result;
use crate::metrics::{PerformanceTracker, TrainingHistory};
use crate::orchestrator::TrainingOrchestrator;
use crate::policy::{Decision, Policy};
use crate::reward::RewardModel;
use crate::types::{Allocation, EncodedState, NetworkState, Transition};
use crate::value::{ApproximateQLearner, TabularQLearner, ValueBackend, ValueModel, ValueParams};

/// Result of one full learning step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub reward: f32,
    pub loss: f32,
    pub exploration_rate: f32,
}

/// Everything that has to survive a restart. The replay buffer and the
/// training log are not part of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub params: ValueParams,
    pub exploration_rate: f32,
    pub episode: u64,
    pub tracker: PerformanceTracker,
}

pub struct QosAgent {
    config: AgentConfig,
    encoder: StateEncoder,
    catalog: ActionCatalog,
    policy: Policy,
    backend: ValueBackend,
    reward_model: RewardModel,
    tracker: PerformanceTracker,
    orchestrator: TrainingOrchestrator,
    rng: StdRng,
}

impl QosAgent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let capacity = config.encoder.capacity_mbps;
        let encoder = StateEncoder::new(config.encoder.clone());
        let catalog = ActionCatalog::new(config.catalog.clone(), capacity);
        let backend = match config.backend {
            BackendKind::Tabular => ValueBackend::Tabular(TabularQLearner::new(
                encoder.num_states(),
                catalog.len(),
                &config.tabular,
            )),
            BackendKind::Approximate => ValueBackend::Approximate(ApproximateQLearner::new(
                encoder.feature_dim(),
                catalog.len(),
                config.approx.clone(),
                &mut rng,
            )),
        };

        info!(
            backend = ?config.backend,
            actions = catalog.len(),
            states = encoder.num_states(),
            seed = ?config.seed,
            "created bandwidth agent"
        );

        Ok(QosAgent {
            policy: Policy::new(config.policy.clone(), &config.exploration),
            reward_model: RewardModel::new(config.reward.clone(), capacity),
            tracker: PerformanceTracker::new(&config.tracker),
            orchestrator: TrainingOrchestrator::new(config.exploration.clone(), config.history_capacity),
            encoder,
            catalog,
            backend,
            config,
            rng,
        })
    }

    pub fn builder() -> QosAgentBuilder {
        QosAgentBuilder::new()
    }

    /// Build an agent and try to restore saved state from `path`. A missing
    /// or unreadable snapshot is logged and the agent starts fresh; only an
    /// invalid `config` is an error.
    pub fn restore_or_fresh<P: AsRef<Path>>(config: AgentConfig, path: P) -> Result<Self> {
        let mut agent = QosAgent::new(config)?;
        if let Err(err) = agent.load(path.as_ref()) {
            warn!(path = %path.as_ref().display(), error = %err, "could not restore agent state, starting fresh");
        }
        Ok(agent)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &ValueBackend {
        &self.backend
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn history(&self) -> &TrainingHistory {
        self.orchestrator.history()
    }

    pub fn exploration_rate(&self) -> f32 {
        self.orchestrator.exploration_rate()
    }

    pub fn episode(&self) -> u64 {
        self.orchestrator.episode()
    }

    pub fn encode(&self, state: &NetworkState) -> EncodedState {
        self.encoder.encode(state)
    }

    pub fn valid_indices(&self, state: &NetworkState) -> Vec<usize> {
        self.catalog.valid_indices(state)
    }

    pub fn q_values(&self, state: &NetworkState) -> Array1<f32> {
        self.backend.q_values(&self.encoder.encode(state))
    }

    /// Catalog index closest to a split that was applied from outside
    pub fn nearest_action(&self, allocation: &Allocation) -> usize {
        self.catalog.nearest_index(allocation)
    }

    /// Choose the allocation for this tick
    pub fn act(&mut self, state: &NetworkState) -> Decision {
        let encoded = self.encoder.encode(state);
        let valid = self.catalog.valid_indices(state);
        let q_values = self.backend.q_values(&encoded);
        let index = self.policy.select(
            &q_values,
            state,
            &valid,
            &self.catalog,
            self.orchestrator.exploration_rate(),
            &self.tracker,
            &mut self.rng,
        );
        let allocation = self
            .policy
            .finalize(&self.catalog.get(index), state, self.config.encoder.capacity_mbps);
        Decision { index, allocation }
    }

    /// Score a transition and record its outcome in the performance tracker
    pub fn reward(&mut self, state: &NetworkState, allocation: &Allocation, next_state: &NetworkState) -> f32 {
        self.reward_model.reward(state, allocation, next_state, &mut self.tracker)
    }

    /// One learning step for catalog action `action`. Returns the loss,
    /// zero when the model had nothing to learn from yet.
    pub fn update(&mut self, state: &NetworkState, action: usize, reward: f32, next_state: &NetworkState) -> f32 {
        let transition = Transition {
            state: self.encoder.encode(state),
            action: action.min(self.catalog.len().saturating_sub(1)),
            reward,
            next_state: self.encoder.encode(next_state),
        };
        self.orchestrator
            .update(&mut self.backend, &transition, &self.tracker, &mut self.rng)
    }

    /// Reward plus learning step for a decision returned by [`act`](Self::act)
    pub fn step(&mut self, state: &NetworkState, decision: &Decision, next_state: &NetworkState) -> StepOutcome {
        let reward = self.reward(state, &decision.allocation, next_state);
        let loss = self.update(state, decision.index, reward, next_state);
        StepOutcome {
            reward,
            loss,
            exploration_rate: self.exploration_rate(),
        }
    }

    pub fn end_episode(&mut self) -> u64 {
        self.orchestrator.end_episode()
    }

    /// Clear the training log and performance counters and restart the
    /// exploration schedule. Learned values are kept.
    pub fn reset_training(&mut self) {
        self.orchestrator.reset_training();
        self.tracker.clear();
        info!(exploration_rate = self.exploration_rate(), "training state reset");
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            params: self.backend.params(),
            exploration_rate: self.orchestrator.exploration_rate(),
            episode: self.orchestrator.episode(),
            tracker: self.tracker.clone(),
        }
    }

    /// Apply a snapshot. On error nothing has been changed. The tracker
    /// keeps its configured thresholds and only takes the saved history.
    pub fn restore(&mut self, snapshot: AgentSnapshot) -> Result<()> {
        self.backend.load_params(snapshot.params)?;
        self.orchestrator.set_exploration_rate(snapshot.exploration_rate);
        self.orchestrator.set_episode(snapshot.episode);
        self.tracker.restore_history(snapshot.tracker);
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(&self.snapshot())?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = std::fs::read(path)?;
        let snapshot: AgentSnapshot = bincode::deserialize(&data)?;
        self.restore(snapshot)
    }
}

/// Builder over [`AgentConfig`] for the settings most often changed
pub struct QosAgentBuilder {
    config: AgentConfig,
}

impl QosAgentBuilder {
    pub fn new() -> Self {
        QosAgentBuilder {
            config: AgentConfig::default(),
        }
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Link capacity used for congestion, masking and reward
    pub fn capacity_mbps(mut self, capacity: f32) -> Self {
        self.config.encoder.capacity_mbps = capacity;
        self
    }

    pub fn exploration(mut self, initial: f32, min: f32) -> Self {
        self.config.exploration.initial = initial;
        self.config.exploration.min = min;
        self
    }

    pub fn shallow_update(mut self, shallow: bool) -> Self {
        self.config.approx.shallow_update = shallow;
        self
    }

    pub fn build(self) -> Result<QosAgent> {
        QosAgent::new(self.config)
    }
}

impl Default for QosAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
