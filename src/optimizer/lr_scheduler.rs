use serde::{Serialize, Deserialize};

/// Learning rate as a function of the training step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LearningRateSchedule {
    /// Constant learning rate
    Constant { lr: f32 },

    /// Step decay: lr = initial_lr * decay_rate^(step / step_size)
    StepDecay {
        initial_lr: f32,
        decay_rate: f32,
        step_size: usize,
    },

    /// Exponential decay: lr = initial_lr * decay_rate^step, floored at min_lr
    ExponentialDecay {
        initial_lr: f32,
        decay_rate: f32,
        min_lr: f32,
    },
}

impl LearningRateSchedule {
    /// Get the learning rate for a given step
    pub fn learning_rate(&self, step: usize) -> f32 {
        match self {
            LearningRateSchedule::Constant { lr } => *lr,

            LearningRateSchedule::StepDecay { initial_lr, decay_rate, step_size } => {
                let num_decays = (step / (*step_size).max(1)) as f32;
                initial_lr * decay_rate.powf(num_decays)
            }

            LearningRateSchedule::ExponentialDecay { initial_lr, decay_rate, min_lr } => {
                (initial_lr * decay_rate.powf(step as f32)).max(*min_lr)
            }
        }
    }

    /// Rates must be finite and positive, decay factors in (0, 1] and the
    /// floor non-negative
    pub fn check(&self) -> std::result::Result<(), &'static str> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let decay = |v: f32| v.is_finite() && v > 0.0 && v <= 1.0;
        match *self {
            LearningRateSchedule::Constant { lr } if !positive(lr) => Err("learning rate must be finite and positive"),
            LearningRateSchedule::StepDecay { initial_lr, decay_rate, .. }
            | LearningRateSchedule::ExponentialDecay { initial_lr, decay_rate, .. }
                if !positive(initial_lr) || !decay(decay_rate) =>
            {
                Err("initial_lr must be positive and decay_rate in (0, 1]")
            }
            LearningRateSchedule::ExponentialDecay { min_lr, .. } if !(min_lr.is_finite() && min_lr >= 0.0) => {
                Err("min_lr must be finite and non-negative")
            }
            _ => Ok(()),
        }
    }

    pub fn constant(lr: f32) -> Self {
        LearningRateSchedule::Constant { lr }
    }

    pub fn step_decay(initial_lr: f32, decay_rate: f32, step_size: usize) -> Self {
        LearningRateSchedule::StepDecay {
            initial_lr,
            decay_rate,
            step_size,
        }
    }
}
