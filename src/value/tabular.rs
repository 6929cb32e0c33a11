use ndarray::{Array1, Array2};
use rand::Rng;

use super::ValueModel;
use crate::config::TabularConfig;
use crate::error::{QosError, Result};
use crate::types::{EncodedState, Transition};

/// One-step Q-learning over a dense state x action table.
///
/// `Q[s,a] += alpha * (r + gamma * max_a' Q[s',a'] - Q[s,a])`
///
/// The table starts at zero and is only ever changed by [`update`](ValueModel::update).
#[derive(Clone, Debug)]
pub struct TabularQLearner {
    table: Array2<f32>,
    learning_rate: f32,
    discount: f32,
    updates: u64,
}

impl TabularQLearner {
    pub fn new(num_states: usize, num_actions: usize, config: &TabularConfig) -> Self {
        TabularQLearner {
            table: Array2::zeros((num_states.max(1), num_actions.max(1))),
            learning_rate: config.learning_rate,
            discount: config.discount,
            updates: 0,
        }
    }

    pub fn num_states(&self) -> usize {
        self.table.nrows()
    }

    pub fn table(&self) -> &Array2<f32> {
        &self.table
    }

    pub fn set_table(&mut self, table: Array2<f32>) -> Result<()> {
        if table.dim() != self.table.dim() {
            return Err(QosError::invalid_config(
                "tabular.table",
                format!("expected shape {:?}, got {:?}", self.table.dim(), table.dim()),
            ));
        }
        self.table = table;
        Ok(())
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn state_row(&self, index: usize) -> usize {
        index.min(self.table.nrows() - 1)
    }

    /// Value of one state/action pair, clamping both indices
    pub fn value(&self, state: usize, action: usize) -> f32 {
        self.table[[self.state_row(state), action.min(self.table.ncols() - 1)]]
    }

    /// Largest value in a state row
    pub fn max_value(&self, state: usize) -> f32 {
        self.table
            .row(self.state_row(state))
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Apply the Q-learning rule to one (s, a, r, s') and return the squared
    /// TD error it was computed from.
    pub fn learn(&mut self, state: usize, action: usize, reward: f32, next_state: usize) -> f32 {
        let s = self.state_row(state);
        let a = action.min(self.table.ncols() - 1);
        let target = reward + self.discount * self.max_value(next_state);
        let td_error = target - self.table[[s, a]];
        if !td_error.is_finite() {
            return 0.0;
        }
        self.table[[s, a]] += self.learning_rate * td_error;
        self.updates += 1;
        td_error * td_error
    }
}

impl ValueModel for TabularQLearner {
    fn num_actions(&self) -> usize {
        self.table.ncols()
    }

    fn q_values(&self, state: &EncodedState) -> Array1<f32> {
        self.table.row(self.state_row(state.index)).to_owned()
    }

    fn update<R: Rng + ?Sized>(&mut self, transition: &Transition, _rng: &mut R) -> f32 {
        self.learn(
            transition.state.index,
            transition.action,
            transition.reward,
            transition.next_state.index,
        )
    }
}
