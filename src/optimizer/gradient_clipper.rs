use ndarray::{Array1, Array2};

/// Clamp `value` to [-limit, limit]. Non-finite values collapse to zero so a
/// single bad sample cannot poison the parameters.
pub fn clip_symmetric(value: f32, limit: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-limit.abs(), limit.abs())
    } else {
        0.0
    }
}

/// Gradient clipping methods
#[derive(Clone, Debug, PartialEq)]
pub enum GradientClipper {
    /// Clip every gradient entry into [min, max]
    ClipByValue { min: f32, max: f32 },

    /// Rescale all gradients together when their joint norm exceeds max_norm
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl GradientClipper {
    /// Clip a full set of layer gradients in place
    pub fn clip(&self, weight_grads: &mut [Array2<f32>], bias_grads: &mut [Array1<f32>]) {
        match self {
            GradientClipper::ClipByValue { min, max } => {
                for grad in weight_grads.iter_mut() {
                    grad.mapv_inplace(|g| g.max(*min).min(*max));
                }
                for grad in bias_grads.iter_mut() {
                    grad.mapv_inplace(|g| g.max(*min).min(*max));
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                let global_norm = Self::global_norm(weight_grads, bias_grads);
                if global_norm > *max_norm && global_norm > 0.0 {
                    let scale = max_norm / global_norm;
                    for grad in weight_grads.iter_mut() {
                        grad.mapv_inplace(|g| g * scale);
                    }
                    for grad in bias_grads.iter_mut() {
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::None => {}
        }
    }

    /// Joint L2 norm of all gradients
    pub fn global_norm(weight_grads: &[Array2<f32>], bias_grads: &[Array1<f32>]) -> f32 {
        let weight_norm_sq: f32 = weight_grads.iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f32>())
            .sum();

        let bias_norm_sq: f32 = bias_grads.iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f32>())
            .sum();

        (weight_norm_sq + bias_norm_sq).sqrt()
    }
}
