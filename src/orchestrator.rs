//! One learning step per tick: value update, exploration decay and the
//! training log, owned explicitly instead of living in globals.

use rand::Rng;
use tracing::debug;

use crate::config::ExplorationConfig;
use crate::metrics::{PerformanceTracker, TrainingHistory, TrainingRecord};
use crate::types::Transition;
use crate::value::{ValueBackend, ValueModel};

#[derive(Clone, Debug)]
pub struct TrainingOrchestrator {
    exploration_rate: f32,
    config: ExplorationConfig,
    history: TrainingHistory,
    steps: u64,
    episode: u64,
}

impl TrainingOrchestrator {
    pub fn new(config: ExplorationConfig, history_capacity: usize) -> Self {
        let min = config.min.clamp(0.0, 1.0);
        TrainingOrchestrator {
            exploration_rate: config.initial.clamp(min, 1.0),
            config,
            history: TrainingHistory::new(history_capacity),
            steps: 0,
            episode: 0,
        }
    }

    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    pub fn set_exploration_rate(&mut self, rate: f32) {
        self.exploration_rate = self.clamp_rate(rate);
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Learning steps since construction or the last reset
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn set_episode(&mut self, episode: u64) {
        self.episode = episode;
    }

    pub fn end_episode(&mut self) -> u64 {
        self.episode += 1;
        self.episode
    }

    fn clamp_rate(&self, rate: f32) -> f32 {
        let min = self.config.min.clamp(0.0, 1.0);
        if rate.is_finite() {
            rate.clamp(min, 1.0)
        } else {
            min
        }
    }

    /// Run one learning step: update the value model, decay exploration and
    /// log the step. Returns the model's loss, zero when it had nothing to
    /// learn from yet.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        backend: &mut ValueBackend,
        transition: &Transition,
        tracker: &PerformanceTracker,
        rng: &mut R,
    ) -> f32 {
        let loss = backend.update(transition, rng);
        self.decay_exploration(tracker);
        self.steps += 1;
        self.history.push(TrainingRecord {
            step: self.steps,
            reward: transition.reward,
            loss,
            exploration_rate: self.exploration_rate,
        });
        loss
    }

    /// Multiplicative decay whose speed follows recent performance, plus a
    /// bounded push back up after a run of bad ticks.
    pub fn decay_exploration(&mut self, tracker: &PerformanceTracker) {
        let c = &self.config;
        let decay = match tracker.recent_min_satisfaction(c.window) {
            Some(mean) if mean > c.strong_performance => c.fast_decay,
            Some(mean) if mean < c.weak_performance => c.slow_decay,
            _ => c.decay,
        };
        let mut rate = self.exploration_rate * decay;

        if c.bad_streak > 0 && tracker.consecutive_bad() >= c.bad_streak {
            let ceiling = c.boost_ceiling.max(self.exploration_rate);
            let boosted = (rate + c.boost).min(ceiling);
            if boosted > rate {
                debug!(
                    from = rate,
                    to = boosted,
                    streak = tracker.consecutive_bad(),
                    "boosting exploration after bad streak"
                );
                rate = boosted;
            }
        }

        self.exploration_rate = self.clamp_rate(rate);
    }

    /// Restart the exploration schedule and clear the training log. The
    /// value model is not touched.
    pub fn reset_training(&mut self) {
        self.exploration_rate = self.clamp_rate(self.config.initial);
        self.history.clear();
        self.steps = 0;
    }
}
