use ndarray::Array1;
use rand::seq::index;
use rand::Rng;

/// A transition as the approximator sees it: feature vectors, not raw
/// telemetry.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
}

/// Fixed-capacity ring buffer of experiences. Once full, each insert
/// overwrites the oldest entry.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: Vec<Experience>,
    capacity: usize,
    /// Slot the next insert writes to
    position: usize,
    full: bool,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            full: false,
        }
    }

    pub fn add(&mut self, experience: Experience) {
        if self.full {
            self.buffer[self.position] = experience;
        } else {
            self.buffer.push(experience);
        }
        self.position = (self.position + 1) % self.capacity;
        if self.position == 0 {
            self.full = true;
        }
    }

    /// Uniformly sample up to `batch_size` distinct experiences.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        let amount = batch_size.min(self.len());
        index::sample(rng, self.len(), amount)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect()
    }

    /// Experiences from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Experience> + '_ {
        let split = if self.full { self.position } else { 0 };
        self.buffer[split..].iter().chain(self.buffer[..split].iter())
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.capacity
        } else {
            self.position
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.position = 0;
        self.full = false;
    }
}
