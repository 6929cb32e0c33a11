use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use tracing::{debug, warn};

use super::ValueModel;
use crate::config::ApproxConfig;
use crate::error::{QosError, Result};
use crate::network::NeuralNetwork;
use crate::optimizer::{clip_symmetric, GradientClipper, Sgd};
use crate::replay_buffer::{Experience, ReplayBuffer};
use crate::types::{EncodedState, Transition};

/// Online Q-learning with a small feed-forward approximator.
///
/// Transitions go into a fixed-size replay buffer; each training step
/// samples a batch, bootstraps targets from the target network and nudges
/// the online network towards them. With `shallow_update` (the default) only
/// the output-layer row of the taken action moves; hidden layers keep their
/// initial random projection. With it off, the whole network is trained by
/// SGD with global-norm clipping.
///
/// The target network is a hard copy of the online one, refreshed every
/// `target_update_interval` steps, or every `warmup_update_interval` steps
/// during the first `warmup_steps`.
#[derive(Clone, Debug)]
pub struct ApproximateQLearner {
    online: NeuralNetwork,
    target: NeuralNetwork,
    buffer: ReplayBuffer,
    config: ApproxConfig,
    train_steps: usize,
    optimizer: Sgd,
    clipper: GradientClipper,
}

impl ApproximateQLearner {
    pub fn new<R: Rng + ?Sized>(feature_dim: usize, num_actions: usize, config: ApproxConfig, rng: &mut R) -> Self {
        let online = NeuralNetwork::new(feature_dim, &config.hidden_sizes, num_actions, rng);
        let target = online.clone();
        let clipper = GradientClipper::ClipByGlobalNorm {
            max_norm: config.max_grad_norm,
        };
        ApproximateQLearner {
            online,
            target,
            buffer: ReplayBuffer::new(config.buffer_capacity),
            config,
            train_steps: 0,
            optimizer: Sgd::new(),
            clipper,
        }
    }

    /// Value of every action, from the online or the target parameters
    pub fn predict(&self, features: ArrayView1<f32>, use_target: bool) -> Array1<f32> {
        if use_target {
            self.target.predict(features)
        } else {
            self.online.predict(features)
        }
    }

    pub fn online(&self) -> &NeuralNetwork {
        &self.online
    }

    pub fn target(&self) -> &NeuralNetwork {
        &self.target
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &ApproxConfig {
        &self.config
    }

    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    /// Swap in saved networks. Both must match the live architecture layer
    /// for layer; on mismatch nothing is changed.
    pub fn set_networks(&mut self, online: NeuralNetwork, target: NeuralNetwork, train_steps: usize) -> Result<()> {
        if !self.online.same_architecture(&online) || !self.online.same_architecture(&target) {
            let expected: Vec<_> = self.online.layers.iter().map(|l| l.weights.dim()).collect();
            return Err(QosError::invalid_config(
                "approx.network",
                format!("saved networks do not match the live architecture {:?}", expected),
            ));
        }
        self.online = online;
        self.target = target;
        self.train_steps = train_steps;
        Ok(())
    }

    pub fn remember(&mut self, experience: Experience) {
        self.buffer.add(experience);
    }

    /// Store a transition's feature vectors without training
    pub fn remember_transition(&mut self, transition: &Transition) {
        self.remember(Experience {
            state: transition.state.features.clone(),
            action: transition.action,
            reward: transition.reward,
            next_state: transition.next_state.features.clone(),
        });
    }

    /// Steps between target syncs at the current point of training
    pub fn sync_interval(&self) -> usize {
        if self.train_steps < self.config.warmup_steps {
            self.config.warmup_update_interval
        } else {
            self.config.target_update_interval
        }
    }

    pub fn sync_target(&mut self) {
        self.target = self.online.clone();
    }

    /// Bootstrapped target for one experience, clipped to the configured range
    fn bootstrap(&self, experience: &Experience) -> Option<f32> {
        let next_max = self
            .target
            .predict(experience.next_state.view())
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let target = experience.reward + self.config.discount * next_max;
        target.is_finite().then(|| clip_symmetric(target, self.config.target_clip))
    }

    /// Run one batched learning step. Returns the mean squared TD error over
    /// the usable samples, or zero without touching any parameters while the
    /// buffer holds fewer than one batch.
    pub fn train_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        if self.buffer.len() < self.config.batch_size {
            return 0.0;
        }

        let batch: Vec<Experience> = self
            .buffer
            .sample(self.config.batch_size, rng)
            .into_iter()
            .cloned()
            .collect();
        let learning_rate = self.config.learning_rate.learning_rate(self.train_steps);

        let loss = if self.config.shallow_update {
            self.shallow_step(&batch, learning_rate)
        } else {
            self.full_step(&batch, learning_rate)
        };

        if !self.online.is_finite() {
            warn!(step = self.train_steps, "online network diverged, restoring from target");
            self.online = self.target.clone();
        }

        self.train_steps += 1;
        if self.train_steps % self.sync_interval().max(1) == 0 {
            self.sync_target();
            debug!(step = self.train_steps, "synced target network");
        }
        loss
    }

    /// Move only the output row of each taken action along its TD error
    fn shallow_step(&mut self, batch: &[Experience], learning_rate: f32) -> f32 {
        let num_actions = self.num_actions();
        let mut total = 0.0;
        let mut count = 0usize;

        for experience in batch {
            let Some(target) = self.bootstrap(experience) else {
                continue;
            };
            let action = experience.action.min(num_actions - 1);
            let hidden = self.online.penultimate(experience.state.view());
            let Some(output) = self.online.output_layer_mut() else {
                break;
            };
            let current = output.predict(hidden.view())[action];
            let td_error = target - current;
            if !td_error.is_finite() {
                continue;
            }
            total += td_error * td_error;
            count += 1;

            let step = learning_rate * clip_symmetric(td_error, self.config.td_clip);
            output.weights.column_mut(action).scaled_add(step, &hidden);
            output.biases[action] += step;
        }

        if count == 0 {
            0.0
        } else {
            total / count as f32
        }
    }

    /// Regress the online network on the batch through every layer
    fn full_step(&mut self, batch: &[Experience], learning_rate: f32) -> f32 {
        let feature_dim = self.online.layers.first().map_or(0, |l| l.input_size());
        let num_actions = self.num_actions();
        let mut rows = Vec::with_capacity(batch.len());
        let mut targets = Vec::with_capacity(batch.len());
        let mut total = 0.0;

        for experience in batch {
            let Some(target) = self.bootstrap(experience) else {
                continue;
            };
            let action = experience.action.min(num_actions - 1);
            let mut row = self.online.predict(experience.state.view());
            let td_error = target - row[action];
            if !td_error.is_finite() {
                continue;
            }
            total += td_error * td_error;
            row[action] = target;
            rows.push(experience.state.clone());
            targets.push(row);
        }

        if rows.is_empty() {
            return 0.0;
        }

        let n = rows.len();
        let mut inputs = Array2::zeros((n, feature_dim));
        let mut target_matrix = Array2::zeros((n, num_actions));
        for (i, (row, target)) in rows.iter().zip(targets.iter()).enumerate() {
            inputs.row_mut(i).assign(row);
            target_matrix.row_mut(i).assign(target);
        }
        self.online.train_batch(
            inputs.view(),
            target_matrix.view(),
            learning_rate,
            &self.clipper,
            &mut self.optimizer,
        );
        total / n as f32
    }
}

impl ValueModel for ApproximateQLearner {
    fn num_actions(&self) -> usize {
        self.online.num_outputs()
    }

    fn q_values(&self, state: &EncodedState) -> Array1<f32> {
        self.predict(state.features.view(), false)
    }

    fn update<R: Rng + ?Sized>(&mut self, transition: &Transition, rng: &mut R) -> f32 {
        self.remember_transition(transition);
        self.train_step(rng)
    }
}
