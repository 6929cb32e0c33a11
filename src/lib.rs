//! # bandwidth-rl
//!
//! A reinforcement-learning controller that splits a shared link between
//! three traffic classes (web, audio, video). Every tick it reads telemetry
//! from an external simulator, picks one of a fixed catalog of allocation
//! splits and learns from the outcome.
//!
//! ## Pipeline
//!
//! telemetry → [`encoder`] → [`policy`] (over the [`catalog`] mask) →
//! environment → [`reward`] → [`orchestrator`] → [`value`] model
//!
//! ## Module Organization
//!
//! - [`types`] - Telemetry, allocations and transitions
//! - [`encoder`] - Discrete state index and feature vector
//! - [`catalog`] - Allocation splits and congestion/starvation masking
//! - [`policy`] - Adaptive epsilon-greedy selection
//! - [`value`] - Tabular and approximate Q-learning back-ends
//! - [`network`] - Feed-forward approximator used by the approximate back-end
//! - [`replay_buffer`] - Fixed-capacity experience ring buffer
//! - [`optimizer`] - SGD, learning-rate schedules and clipping
//! - [`reward`] - Reward shaping
//! - [`metrics`] - Rolling performance counters and the training log
//! - [`orchestrator`] - One learning step per tick
//! - [`agent`] - The facade tying it all together, plus persistence
//! - [`config`] - Serde-backed configuration
//! - [`error`] - Error types and result handling
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod orchestrator;
pub mod policy;
pub mod replay_buffer;
pub mod reward;
pub mod types;
pub mod value;

pub use agent::{AgentSnapshot, QosAgent, QosAgentBuilder, StepOutcome};
pub use catalog::ActionCatalog;
pub use config::{AgentConfig, BackendKind};
pub use encoder::StateEncoder;
pub use error::{QosError, Result};
pub use metrics::{PerformanceTracker, TrainingHistory};
pub use orchestrator::TrainingOrchestrator;
pub use policy::{Decision, Policy};
pub use reward::RewardModel;
pub use types::{Allocation, ClassTelemetry, EncodedState, NetworkState, TrafficClass, Transition};
pub use value::{ApproximateQLearner, TabularQLearner, ValueBackend, ValueModel};

#[cfg(test)]
mod tests;
