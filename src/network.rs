use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::optimizer::{GradientClipper, Optimizer};

/// Half-width of the uniform range used for output-layer weights
const OUTPUT_INIT_RANGE: f32 = 0.1;

/// Activation functions available to the value approximator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, input: &mut Array1<f32>) {
        match self {
            Activation::Relu => input.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(inputs.dim()),
        }
    }
}

/// A fully connected layer. Weights are laid out (inputs, outputs), so the
/// parameters feeding output unit `j` are column `j`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl Layer {
    /// Create a layer whose weights are drawn uniformly from [-limit, limit].
    /// Biases start at zero.
    pub fn new_using<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        limit: f32,
        rng: &mut R,
    ) -> Self {
        let weights = Array2::random_using((input_size, output_size), Uniform::new_inclusive(-limit, limit), rng);
        Layer {
            weights,
            biases: Array1::zeros(output_size),
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.biases.len()
    }

    /// Forward pass for one input without touching the training caches.
    pub fn predict(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let mut output = input.dot(&self.weights) + &self.biases;
        self.activation.apply(&mut output);
        output
    }

    /// Forward pass for a batch, caching what `backward_batch` needs.
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Gradients for this layer given the error at its output. Returns the
    /// error scaled by the activation derivative along with the weight and
    /// bias gradients. `None` when no forward pass has been cached.
    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Option<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let pre_activation_output = self.pre_activation_output.as_ref()?;
        let inputs = self.inputs.as_ref()?;
        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let batch = inputs.nrows().max(1) as f32;
        let weight_gradients = inputs.t().dot(&adjusted_error) / batch;
        let bias_gradients = adjusted_error.sum_axis(Axis(0)) / batch;
        Some((adjusted_error, weight_gradients, bias_gradients))
    }
}

/// Feed-forward Q-value approximator: ReLU hidden layers and a linear output
/// layer with one unit per catalog action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeuralNetwork {
    pub layers: Vec<Layer>,
}

impl NeuralNetwork {
    /// Build a network `input -> hidden... -> outputs`. Hidden layers use He
    /// uniform initialisation; the output layer starts small so early value
    /// estimates sit near zero.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_sizes: &[usize], output_size: usize, rng: &mut R) -> Self {
        let mut sizes = Vec::with_capacity(hidden_sizes.len() + 2);
        sizes.push(input_size.max(1));
        sizes.extend(hidden_sizes.iter().map(|&h| h.max(1)));
        sizes.push(output_size.max(1));

        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                if i == last {
                    Layer::new_using(window[0], window[1], Activation::Linear, OUTPUT_INIT_RANGE, rng)
                } else {
                    let limit = (6.0 / window[0] as f32).sqrt();
                    Layer::new_using(window[0], window[1], Activation::Relu, limit, rng)
                }
            })
            .collect();

        NeuralNetwork { layers }
    }

    pub fn num_outputs(&self) -> usize {
        self.layers.last().map_or(0, Layer::output_size)
    }

    /// Value estimate for every action
    pub fn predict(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let mut current = input.to_owned();
        for layer in &self.layers {
            current = layer.predict(current.view());
        }
        current
    }

    /// Activations feeding the output layer
    pub fn penultimate(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let mut current = input.to_owned();
        let hidden = self.layers.len().saturating_sub(1);
        for layer in &self.layers[..hidden] {
            current = layer.predict(current.view());
        }
        current
    }

    pub fn output_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.last_mut()
    }

    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &mut self.layers {
            current_output = layer.forward_batch(current_output.view());
        }
        current_output
    }

    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Option<(Vec<Array2<f32>>, Vec<Array1<f32>>)> {
        let mut weight_grads = Vec::with_capacity(self.layers.len());
        let mut bias_grads = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(current_error.view())?;
            weight_grads.push(weight_gradients);
            bias_grads.push(bias_gradients);
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        weight_grads.reverse();
        bias_grads.reverse();
        Some((weight_grads, bias_grads))
    }

    /// One gradient step on the mean squared error between the network's
    /// outputs and `targets`, through every layer.
    pub fn train_batch<O: Optimizer>(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
        clipper: &GradientClipper,
        optimizer: &mut O,
    ) {
        let outputs = self.forward_batch(inputs);
        let output_errors = &outputs - &targets;
        let Some((mut weight_grads, mut bias_grads)) = self.backward_batch(output_errors.view()) else {
            return;
        };
        clipper.clip(&mut weight_grads, &mut bias_grads);

        for ((layer, wg), bg) in self.layers.iter_mut().zip(weight_grads.iter()).zip(bias_grads.iter()) {
            optimizer.update_weights(&mut layer.weights, wg, learning_rate);
            optimizer.update_biases(&mut layer.biases, bg, learning_rate);
        }
    }

    /// True when `other` has the same layer count, weight and bias shapes
    /// and activations, and its biases line up with its weight columns
    pub fn same_architecture(&self, other: &NeuralNetwork) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().zip(other.layers.iter()).all(|(mine, theirs)| {
                mine.weights.dim() == theirs.weights.dim()
                    && theirs.biases.len() == theirs.weights.ncols()
                    && mine.biases.len() == theirs.biases.len()
                    && mine.activation == theirs.activation
            })
    }

    /// True when every parameter is finite
    pub fn is_finite(&self) -> bool {
        self.layers
            .iter()
            .all(|l| l.weights.iter().all(|w| w.is_finite()) && l.biases.iter().all(|b| b.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Sgd;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shapes_follow_layer_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = NeuralNetwork::new(12, &[64, 32], 16, &mut rng);
        assert_eq!(network.layers.len(), 3);
        assert_eq!(network.layers[0].weights.shape(), &[12, 64]);
        assert_eq!(network.layers[2].weights.shape(), &[32, 16]);
        assert_eq!(network.num_outputs(), 16);
        assert_eq!(network.layers[2].activation, Activation::Linear);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = NeuralNetwork::new(4, &[8], 3, &mut StdRng::seed_from_u64(9));
        let b = NeuralNetwork::new(4, &[8], 3, &mut StdRng::seed_from_u64(9));
        let input = array![0.1, -0.2, 0.3, 0.4];
        assert_eq!(a.predict(input.view()), b.predict(input.view()));
    }

    #[test]
    fn test_penultimate_matches_output_layer_input() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = NeuralNetwork::new(4, &[8, 6], 2, &mut rng);
        let input = array![0.5, 0.5, -0.5, 1.0];
        let hidden = network.penultimate(input.view());
        assert_eq!(hidden.len(), 6);
        let output = network.layers[2].predict(hidden.view());
        assert_eq!(output, network.predict(input.view()));
    }

    #[test]
    fn test_architecture_check_catches_bias_and_activation_mismatch() {
        let mut rng = StdRng::seed_from_u64(4);
        let network = NeuralNetwork::new(4, &[8], 3, &mut rng);
        assert!(network.same_architecture(&network.clone()));

        let mut short_bias = network.clone();
        short_bias.layers[0].biases = Array1::zeros(3);
        assert!(!network.same_architecture(&short_bias));

        let mut relu_output = network.clone();
        relu_output.layers[1].activation = Activation::Relu;
        assert!(!network.same_architecture(&relu_output));

        let mut extra_layer = network.clone();
        extra_layer.layers.push(Layer::new_using(3, 3, Activation::Linear, 0.1, &mut rng));
        assert!(!network.same_architecture(&extra_layer));
    }

    #[test]
    fn test_train_batch_reduces_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut network = NeuralNetwork::new(2, &[8], 1, &mut rng);
        let inputs = array![[1.0, 0.0], [0.0, 1.0]];
        let targets = array![[1.0], [-1.0]];
        let loss = |n: &NeuralNetwork| {
            let a = n.predict(inputs.row(0))[0] - 1.0;
            let b = n.predict(inputs.row(1))[0] + 1.0;
            a * a + b * b
        };
        let before = loss(&network);
        let mut sgd = Sgd::new();
        for _ in 0..200 {
            network.train_batch(inputs.view(), targets.view(), 0.05, &GradientClipper::None, &mut sgd);
        }
        assert!(loss(&network) < before);
        assert!(network.is_finite());
    }
}
