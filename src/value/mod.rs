//! Value models.
//!
//! Two interchangeable back-ends share the [`ValueModel`] contract: a dense
//! state x action table over the discretised state index, and a small
//! feed-forward approximator over the feature vector with an online/target
//! network pair and a replay buffer. [`ValueBackend`] dispatches between
//! them the way the agent needs.

pub mod approx;
pub mod tabular;

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{QosError, Result};
use crate::network::NeuralNetwork;
use crate::types::{EncodedState, Transition};

pub use approx::ApproximateQLearner;
pub use tabular::TabularQLearner;

/// Contract shared by the value back-ends
pub trait ValueModel {
    /// Size of the action catalog the model scores
    fn num_actions(&self) -> usize;

    /// Estimated value of every action in `state`
    fn q_values(&self, state: &EncodedState) -> Array1<f32>;

    /// Learn from one transition. Returns the loss of the step, or zero when
    /// there was nothing to learn from yet.
    fn update<R: Rng + ?Sized>(&mut self, transition: &Transition, rng: &mut R) -> f32;
}

/// Learned parameters, detached from buffers and caches, for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ValueParams {
    Tabular {
        table: Array2<f32>,
    },
    Approximate {
        online: NeuralNetwork,
        target: NeuralNetwork,
        train_steps: usize,
    },
}

/// The agent's value model, whichever back-end it was built with
#[derive(Clone, Debug)]
pub enum ValueBackend {
    Tabular(TabularQLearner),
    Approximate(ApproximateQLearner),
}

impl ValueModel for ValueBackend {
    fn num_actions(&self) -> usize {
        match self {
            ValueBackend::Tabular(model) => model.num_actions(),
            ValueBackend::Approximate(model) => model.num_actions(),
        }
    }

    fn q_values(&self, state: &EncodedState) -> Array1<f32> {
        match self {
            ValueBackend::Tabular(model) => model.q_values(state),
            ValueBackend::Approximate(model) => model.q_values(state),
        }
    }

    fn update<R: Rng + ?Sized>(&mut self, transition: &Transition, rng: &mut R) -> f32 {
        match self {
            ValueBackend::Tabular(model) => model.update(transition, rng),
            ValueBackend::Approximate(model) => model.update(transition, rng),
        }
    }
}

impl ValueBackend {
    pub fn params(&self) -> ValueParams {
        match self {
            ValueBackend::Tabular(model) => ValueParams::Tabular {
                table: model.table().clone(),
            },
            ValueBackend::Approximate(model) => ValueParams::Approximate {
                online: model.online().clone(),
                target: model.target().clone(),
                train_steps: model.train_steps(),
            },
        }
    }

    /// Replace the learned parameters. Shapes must match the model this
    /// backend was built with.
    pub fn load_params(&mut self, params: ValueParams) -> Result<()> {
        match (self, params) {
            (ValueBackend::Tabular(model), ValueParams::Tabular { table }) => model.set_table(table),
            (ValueBackend::Approximate(model), ValueParams::Approximate { online, target, train_steps }) => {
                model.set_networks(online, target, train_steps)
            }
            _ => Err(QosError::invalid_config("backend", "saved parameters belong to a different back-end")),
        }
    }
}
