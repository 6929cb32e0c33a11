//! Value types exchanged with the traffic environment.
//!
//! A [`NetworkState`] is one tick of telemetry, an [`Allocation`] is the split
//! handed back to the environment, and a [`Transition`] is the unit of
//! learning. All of them are plain immutable values.

use ndarray::Array1;
use serde::{Serialize, Deserialize};
use crate::error::{QosError, Result};

/// Number of traffic classes sharing the link
pub const NUM_CLASSES: usize = 3;

/// Floor used in place of zero demands, user counts and capacities
pub const DEMAND_EPSILON: f32 = 1e-6;

/// Satisfaction reported for a class that has nothing to ask for
pub const FULL_SATISFACTION: f32 = 100.0;

/// The traffic classes competing for bandwidth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficClass {
    Web,
    Audio,
    Video,
}

impl TrafficClass {
    pub const ALL: [TrafficClass; NUM_CLASSES] = [TrafficClass::Web, TrafficClass::Audio, TrafficClass::Video];

    pub fn index(self) -> usize {
        match self {
            TrafficClass::Web => 0,
            TrafficClass::Audio => 1,
            TrafficClass::Video => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TrafficClass::Web => "web",
            TrafficClass::Audio => "audio",
            TrafficClass::Video => "video",
        }
    }
}

/// Telemetry for a single traffic class
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClassTelemetry {
    /// Number of active users
    pub active_users: u32,

    /// Bandwidth demand in Mbps
    pub demand_mbps: f32,

    /// Percent of demand met; values above 100 mean over-allocation
    pub satisfaction: f32,
}

impl ClassTelemetry {
    pub fn new(active_users: u32, demand_mbps: f32, satisfaction: f32) -> Self {
        ClassTelemetry {
            active_users,
            demand_mbps,
            satisfaction,
        }
    }

    /// A class with no users and no demand
    pub fn idle() -> Self {
        ClassTelemetry::new(0, 0.0, FULL_SATISFACTION)
    }

    pub fn has_demand(&self) -> bool {
        self.demand_mbps > DEMAND_EPSILON
    }

    fn validate(&self, class: TrafficClass) -> Result<()> {
        if !self.demand_mbps.is_finite() || self.demand_mbps < 0.0 {
            return Err(QosError::invalid_state(
                format!("{}.demand_mbps", class.name()),
                format!("must be finite and non-negative, got {}", self.demand_mbps),
            ));
        }
        if !self.satisfaction.is_finite() || self.satisfaction < 0.0 {
            return Err(QosError::invalid_state(
                format!("{}.satisfaction", class.name()),
                format!("must be finite and non-negative, got {}", self.satisfaction),
            ));
        }
        Ok(())
    }
}

/// Snapshot of one simulation tick, produced by the environment.
///
/// Construction validates every field, so the rest of the engine can treat
/// the values as trustworthy and only has to guard against zero
/// denominators.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkState {
    classes: [ClassTelemetry; NUM_CLASSES],
    total_demand: f32,
}

impl NetworkState {
    /// Build a snapshot from per-class telemetry. Total demand is the sum of
    /// the class demands.
    pub fn new(web: ClassTelemetry, audio: ClassTelemetry, video: ClassTelemetry) -> Result<Self> {
        Self::from_classes([web, audio, video])
    }

    pub fn from_classes(classes: [ClassTelemetry; NUM_CLASSES]) -> Result<Self> {
        for (class, telemetry) in TrafficClass::ALL.iter().zip(classes.iter()) {
            telemetry.validate(*class)?;
        }
        let total_demand = classes.iter().map(|c| c.demand_mbps).sum();
        Ok(NetworkState { classes, total_demand })
    }

    pub fn class(&self, class: TrafficClass) -> &ClassTelemetry {
        &self.classes[class.index()]
    }

    pub fn classes(&self) -> &[ClassTelemetry; NUM_CLASSES] {
        &self.classes
    }

    pub fn total_demand(&self) -> f32 {
        self.total_demand
    }

    pub fn total_users(&self) -> u32 {
        self.classes.iter().map(|c| c.active_users).sum()
    }

    /// Satisfaction as used for starvation checks: a class without demand
    /// counts as fully served.
    pub fn effective_satisfaction(&self, class: TrafficClass) -> f32 {
        let telemetry = self.class(class);
        if telemetry.has_demand() {
            telemetry.satisfaction
        } else {
            FULL_SATISFACTION
        }
    }

    fn demanding(&self) -> impl Iterator<Item = &ClassTelemetry> + '_ {
        self.classes.iter().filter(|c| c.has_demand())
    }

    /// Worst satisfaction among classes with demand (100 when nobody asks)
    pub fn min_satisfaction(&self) -> f32 {
        self.demanding()
            .map(|c| c.satisfaction)
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |m| m.min(s))))
            .unwrap_or(FULL_SATISFACTION)
    }

    /// Best satisfaction among classes with demand (100 when nobody asks)
    pub fn max_satisfaction(&self) -> f32 {
        self.demanding()
            .map(|c| c.satisfaction)
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |m| m.max(s))))
            .unwrap_or(FULL_SATISFACTION)
    }

    /// Gap between the best and worst served classes
    pub fn satisfaction_spread(&self) -> f32 {
        self.max_satisfaction() - self.min_satisfaction()
    }

    /// Total demand relative to link capacity
    pub fn demand_ratio(&self, capacity_mbps: f32) -> f32 {
        self.total_demand / capacity_mbps.max(DEMAND_EPSILON)
    }

    /// Fraction of all active users that belong to `class`
    pub fn user_share(&self, class: TrafficClass) -> f32 {
        let total = self.total_users().max(1) as f32;
        self.class(class).active_users as f32 / total
    }

    /// Fraction of total demand actually delivered, counting over-allocation
    /// as 100%.
    pub fn served_fraction(&self) -> f32 {
        if self.total_demand <= DEMAND_EPSILON {
            return 1.0;
        }
        let served: f32 = self
            .demanding()
            .map(|c| c.demand_mbps * c.satisfaction.min(FULL_SATISFACTION) / 100.0)
            .sum();
        (served / self.total_demand).clamp(0.0, 1.0)
    }

    /// Number of demanding classes whose satisfaction is below `threshold`
    pub fn classes_below(&self, threshold: f32) -> usize {
        self.demanding().filter(|c| c.satisfaction < threshold).count()
    }
}

/// A (web, audio, video) split of the link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub web: f32,
    pub audio: f32,
    pub video: f32,
}

impl Allocation {
    pub const fn new(web: f32, audio: f32, video: f32) -> Self {
        Allocation { web, audio, video }
    }

    pub fn equal() -> Self {
        let third = 1.0 / NUM_CLASSES as f32;
        Allocation::new(third, third, third)
    }

    pub fn from_array(ratios: [f32; NUM_CLASSES]) -> Self {
        Allocation::new(ratios[0], ratios[1], ratios[2])
    }

    pub fn as_array(&self) -> [f32; NUM_CLASSES] {
        [self.web, self.audio, self.video]
    }

    pub fn share(&self, class: TrafficClass) -> f32 {
        self.as_array()[class.index()]
    }

    pub fn sum(&self) -> f32 {
        self.web + self.audio + self.video
    }

    pub fn max_share(&self) -> f32 {
        self.web.max(self.audio).max(self.video)
    }

    /// Rescale so the ratios sum to one. Negative or non-finite entries are
    /// treated as zero; an all-zero split becomes an equal split.
    pub fn normalized(&self) -> Self {
        let clean = self.as_array().map(|r| if r.is_finite() { r.max(0.0) } else { 0.0 });
        let sum: f32 = clean.iter().sum();
        if sum <= DEMAND_EPSILON {
            return Allocation::equal();
        }
        Allocation::from_array(clean.map(|r| r / sum))
    }

    /// Cap the video share at `ceiling`, handing the excess to web and audio
    /// in proportion to their current shares.
    pub fn with_video_ceiling(&self, ceiling: f32) -> Self {
        let ceiling = ceiling.clamp(0.0, 1.0);
        if self.video <= ceiling {
            return *self;
        }
        let excess = self.video - ceiling;
        let others = self.web + self.audio;
        let (web, audio) = if others <= DEMAND_EPSILON {
            (self.web + excess / 2.0, self.audio + excess / 2.0)
        } else {
            (
                self.web + excess * self.web / others,
                self.audio + excess * self.audio / others,
            )
        };
        Allocation::new(web, audio, ceiling)
    }

    /// Euclidean distance between two splits
    pub fn distance(&self, other: &Allocation) -> f32 {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Allocation::equal()
    }
}

/// Both encodings of a [`NetworkState`]: the tabular learner reads `index`,
/// the approximator reads `features`.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedState {
    pub index: usize,
    pub features: Array1<f32>,
}

/// One step of experience
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: EncodedState,
    pub action: usize,
    pub reward: f32,
    pub next_state: EncodedState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(users: u32, demand: f32, sat: f32) -> ClassTelemetry {
        ClassTelemetry::new(users, demand, sat)
    }

    #[test]
    fn test_rejects_negative_demand() {
        let result = NetworkState::new(class(1, -1.0, 50.0), class(1, 1.0, 50.0), class(1, 1.0, 50.0));
        assert!(matches!(result, Err(QosError::InvalidState { .. })));
    }

    #[test]
    fn test_rejects_nan_satisfaction() {
        let result = NetworkState::new(class(1, 1.0, f32::NAN), class(1, 1.0, 50.0), class(1, 1.0, 50.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_idle_classes_do_not_count_as_starving() {
        let state = NetworkState::new(class(3, 10.0, 40.0), ClassTelemetry::idle(), class(0, 0.0, 0.0)).unwrap();
        assert_eq!(state.min_satisfaction(), 40.0);
        assert_eq!(state.effective_satisfaction(TrafficClass::Video), FULL_SATISFACTION);
        assert_eq!(state.classes_below(50.0), 1);
    }

    #[test]
    fn test_zero_users_and_demand_are_safe() {
        let state = NetworkState::new(ClassTelemetry::idle(), ClassTelemetry::idle(), ClassTelemetry::idle()).unwrap();
        assert_eq!(state.user_share(TrafficClass::Web), 0.0);
        assert_eq!(state.served_fraction(), 1.0);
        assert_eq!(state.min_satisfaction(), FULL_SATISFACTION);
        assert!(state.demand_ratio(0.0).is_finite());
    }

    #[test]
    fn test_normalized_handles_degenerate_splits() {
        let zero = Allocation::new(0.0, 0.0, 0.0).normalized();
        assert_eq!(zero, Allocation::equal());

        let skewed = Allocation::new(2.0, -1.0, f32::NAN).normalized();
        assert!((skewed.web - 1.0).abs() < 1e-6);
        assert_eq!(skewed.audio, 0.0);
        assert_eq!(skewed.video, 0.0);
    }

    #[test]
    fn test_video_ceiling_redistributes_proportionally() {
        let capped = Allocation::new(0.1, 0.1, 0.8).with_video_ceiling(0.5);
        assert!((capped.video - 0.5).abs() < 1e-6);
        assert!((capped.web - 0.25).abs() < 1e-6);
        assert!((capped.audio - 0.25).abs() < 1e-6);
        assert!((capped.sum() - 1.0).abs() < 1e-6);

        let lonely = Allocation::new(0.0, 0.0, 1.0).with_video_ceiling(0.6);
        assert!((lonely.web - 0.2).abs() < 1e-6);
        assert!((lonely.audio - 0.2).abs() < 1e-6);
    }
}
