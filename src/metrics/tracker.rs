use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use super::push_bounded;
use super::statistics::Statistics;

/// One entry of the training log
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub step: u64,
    pub reward: f32,
    pub loss: f32,
    pub exploration_rate: f32,
}

/// Bounded log of training steps, newest last
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    records: VecDeque<TrainingRecord>,
    capacity: usize,
}

impl TrainingHistory {
    pub fn new(capacity: usize) -> Self {
        TrainingHistory {
            records: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, record: TrainingRecord) {
        push_bounded(&mut self.records, record, self.capacity);
    }

    pub fn records(&self) -> &VecDeque<TrainingRecord> {
        &self.records
    }

    pub fn last(&self) -> Option<&TrainingRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Average loss over the newest `window` records
    pub fn avg_loss(&self, window: usize) -> Option<f32> {
        self.avg_of(window, |r| r.loss)
    }

    /// Average reward over the newest `window` records
    pub fn avg_reward(&self, window: usize) -> Option<f32> {
        self.avg_of(window, |r| r.reward)
    }

    fn avg_of(&self, window: usize, field: impl Fn(&TrainingRecord) -> f32) -> Option<f32> {
        if self.records.is_empty() || window == 0 {
            return None;
        }
        let n = window.min(self.records.len());
        let sum: f32 = self.records.iter().rev().take(n).map(field).sum();
        Some(sum / n as f32)
    }

    /// Summary of all logged rewards; an empty log gives zeroed statistics
    pub fn reward_statistics(&self) -> Statistics {
        let rewards: Vec<f32> = self.records.iter().map(|r| r.reward).collect();
        Statistics::from_slice(&rewards)
    }

    pub fn loss_statistics(&self) -> Statistics {
        let losses: Vec<f32> = self.records.iter().map(|r| r.loss).collect();
        Statistics::from_slice(&losses)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new(1000)
    }
}
