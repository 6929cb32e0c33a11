//! The fixed set of allocation splits the policy chooses from, plus the
//! congestion/starvation masks that narrow it each tick.

use crate::config::CatalogConfig;
use crate::types::{Allocation, NetworkState};

#[derive(Clone, Debug)]
pub struct ActionCatalog {
    entries: Vec<Allocation>,
    protective: Vec<usize>,
    priority: Vec<usize>,
    capacity_mbps: f32,
    config: CatalogConfig,
}

impl ActionCatalog {
    /// Build a catalog from configuration. Entries are normalised once here
    /// and never change afterwards; subset indices outside the catalog are
    /// dropped. `capacity_mbps` is the link capacity congestion is measured
    /// against.
    pub fn new(config: CatalogConfig, capacity_mbps: f32) -> Self {
        let mut entries: Vec<Allocation> = config.entries.iter().map(Allocation::normalized).collect();
        if entries.is_empty() {
            entries.push(Allocation::equal());
        }
        let in_range = |subset: &[usize]| -> Vec<usize> {
            let kept: Vec<usize> = subset.iter().copied().filter(|&i| i < entries.len()).collect();
            if kept.is_empty() {
                vec![0]
            } else {
                kept
            }
        };
        let protective = in_range(&config.protective);
        let priority = in_range(&config.priority);
        ActionCatalog {
            entries,
            protective,
            priority,
            capacity_mbps,
            config,
        }
    }

    /// All splits, in index order
    pub fn allocations(&self) -> &[Allocation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split at `index`; out-of-range indices clamp to the last entry
    pub fn get(&self, index: usize) -> Allocation {
        self.entries[index.min(self.entries.len() - 1)]
    }

    /// Balanced splits used when several classes are starving
    pub fn protective(&self) -> &[usize] {
        &self.protective
    }

    /// Splits favoured when exploring
    pub fn priority(&self) -> &[usize] {
        &self.priority
    }

    /// Indices admissible under the current conditions.
    ///
    /// Severe congestion applies the strict video cap, moderate congestion
    /// the loose one, and both drop splits handing any single class more
    /// than `class_share_cap`. Acute multi-class starvation further restricts
    /// the set to the protective splits. An empty result falls back to the
    /// full catalog.
    pub fn valid_indices(&self, state: &NetworkState) -> Vec<usize> {
        let ratio = state.demand_ratio(self.capacity_mbps);
        let mut valid: Vec<usize> = (0..self.entries.len()).collect();

        let video_cap = if ratio > self.config.severe_congestion_ratio {
            Some(self.config.severe_video_cap)
        } else if ratio > self.config.moderate_congestion_ratio {
            Some(self.config.moderate_video_cap)
        } else {
            None
        };
        if let Some(video_cap) = video_cap {
            let share_cap = self.config.class_share_cap;
            valid.retain(|&i| {
                let entry = &self.entries[i];
                entry.video <= video_cap && entry.as_array().iter().all(|&r| r <= share_cap)
            });
        }

        let starving = state.classes_below(self.config.emergency_satisfaction);
        if starving >= self.config.emergency_min_classes.max(1) {
            valid.retain(|i| self.protective.contains(i));
        }

        if valid.is_empty() {
            (0..self.entries.len()).collect()
        } else {
            valid
        }
    }

    /// Index of the entry closest to `ratios` by Euclidean distance. Ties go
    /// to the lowest index.
    pub fn nearest_index(&self, ratios: &Allocation) -> usize {
        let target = ratios.normalized();
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (i, entry) in self.entries.iter().enumerate() {
            let distance = entry.distance(&target);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}
