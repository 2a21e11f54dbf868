//! Keyframe timelines.
//!
//! Keyframe `i` is reached at the sum of the durations of keyframes `0..=i`;
//! the cycle ends at the last keyframe's cumulative time. Before the first
//! keyframe's time its values are held.

use std::collections::BTreeMap;

use bloxim_shared::Vec3;
use serde::{Deserialize, Serialize};

use crate::easing::{segment_progress, Easing};
use crate::error::{AnimError, AnimResult};

/// An animatable value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A number.
    Scalar(f32),
    /// A vector.
    Vector(Vec3),
}

impl PropertyValue {
    /// Interpolates towards `other`. Mismatched kinds step at the end.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(a + (b - a) * t),
            (Self::Vector(a), Self::Vector(b)) => Self::Vector(a.lerp(b, t)),
            _ if t >= 1.0 => other,
            _ => self,
        }
    }
}

/// One keyframe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyframe {
    /// Seconds taken to arrive at this keyframe from the previous one.
    pub duration: f32,
    /// How the timeline arrives at this keyframe.
    pub ease_in: Easing,
    /// How the timeline leaves this keyframe.
    pub ease_out: Easing,
    /// Property values declared by this keyframe.
    pub values: BTreeMap<String, PropertyValue>,
}

impl Keyframe {
    /// A keyframe reached after `duration` seconds.
    #[must_use]
    pub fn after(duration: f32) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Declares a scalar property.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: f32) -> Self {
        self.values.insert(name.into(), PropertyValue::Scalar(value));
        self
    }

    /// Declares a vector property.
    #[must_use]
    pub fn vector(mut self, name: impl Into<String>, value: Vec3) -> Self {
        self.values.insert(name.into(), PropertyValue::Vector(value));
        self
    }

    /// Sets both easing curves.
    #[must_use]
    pub fn eased(mut self, ease_in: Easing, ease_out: Easing) -> Self {
        self.ease_in = ease_in;
        self.ease_out = ease_out;
        self
    }
}

/// A validated keyframe sequence with precomputed arrival times.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    arrivals: Vec<f32>,
}

impl Timeline {
    /// Builds a timeline.
    ///
    /// # Errors
    ///
    /// Fails on an empty sequence or a negative or non-finite duration.
    pub fn new(keyframes: Vec<Keyframe>) -> AnimResult<Self> {
        if keyframes.is_empty() {
            return Err(AnimError::EmptyTimeline);
        }
        let mut arrivals = Vec::with_capacity(keyframes.len());
        let mut t = 0.0f32;
        for (index, frame) in keyframes.iter().enumerate() {
            if !frame.duration.is_finite() || frame.duration < 0.0 {
                return Err(AnimError::InvalidDuration {
                    index,
                    duration: frame.duration,
                });
            }
            t += frame.duration;
            arrivals.push(t);
        }
        Ok(Self {
            keyframes,
            arrivals,
        })
    }

    /// Length of one cycle.
    #[must_use]
    pub fn cycle_duration(&self) -> f32 {
        self.arrivals.last().copied().unwrap_or(0.0)
    }

    /// The keyframes.
    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Property values at local time `t` within one cycle.
    #[must_use]
    pub fn sample(&self, t: f32) -> BTreeMap<String, PropertyValue> {
        // First keyframe reached at or after t.
        let next = self.arrivals.partition_point(|&arrival| arrival < t);
        if next == 0 {
            return self.keyframes[0].values.clone();
        }
        if next >= self.keyframes.len() {
            return self.held_values(self.keyframes.len() - 1);
        }

        let from = &self.keyframes[next - 1];
        let to = &self.keyframes[next];
        let u = if to.duration > 0.0 {
            (t - self.arrivals[next - 1]) / to.duration
        } else {
            1.0
        };
        let progress = segment_progress(from.ease_out, to.ease_in, u);

        let mut out = self.held_values(next - 1);
        for (name, target) in &to.values {
            let value = match out.get(name) {
                Some(start) => start.lerp(*target, progress),
                None if progress >= 1.0 => *target,
                None => continue,
            };
            out.insert(name.clone(), value);
        }
        out
    }

    /// Values in effect at keyframe `index`: each property's most recent
    /// declaration at or before it.
    fn held_values(&self, index: usize) -> BTreeMap<String, PropertyValue> {
        let mut out = BTreeMap::new();
        for frame in &self.keyframes[..=index] {
            for (name, value) in &frame.values {
                out.insert(name.clone(), *value);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Timeline {
        Timeline::new(vec![
            Keyframe::after(0.0).scalar("x", 0.0),
            Keyframe::after(2.0).scalar("x", 10.0),
        ])
        .unwrap()
    }

    fn x(values: &BTreeMap<String, PropertyValue>) -> f32 {
        match values.get("x") {
            Some(PropertyValue::Scalar(v)) => *v,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_linear_pair() {
        let timeline = pair();
        assert_eq!(timeline.cycle_duration(), 2.0);
        assert_eq!(x(&timeline.sample(0.0)), 0.0);
        assert!((x(&timeline.sample(0.5)) - 2.5).abs() < 1e-5);
        assert!((x(&timeline.sample(1.0)) - 5.0).abs() < 1e-5);
        assert_eq!(x(&timeline.sample(2.0)), 10.0);
        assert_eq!(x(&timeline.sample(9.0)), 10.0);
    }

    #[test]
    fn test_held_properties() {
        let timeline = Timeline::new(vec![
            Keyframe::after(0.0).scalar("x", 1.0).scalar("y", 5.0),
            Keyframe::after(1.0).scalar("x", 3.0),
            Keyframe::after(1.0).scalar("y", 7.0),
        ])
        .unwrap();

        let mid = timeline.sample(1.5);
        assert_eq!(mid.get("x"), Some(&PropertyValue::Scalar(3.0)));
        assert_eq!(mid.get("y"), Some(&PropertyValue::Scalar(6.0)));
    }

    #[test]
    fn test_vector_property() {
        let timeline = Timeline::new(vec![
            Keyframe::after(0.0).vector("position", Vec3::ZERO),
            Keyframe::after(1.0).vector("position", Vec3::new(2.0, 4.0, 0.0)),
        ])
        .unwrap();
        assert_eq!(
            timeline.sample(0.5).get("position"),
            Some(&PropertyValue::Vector(Vec3::new(1.0, 2.0, 0.0)))
        );
    }

    #[test]
    fn test_invalid_timelines() {
        assert!(matches!(Timeline::new(vec![]), Err(AnimError::EmptyTimeline)));
        assert!(matches!(
            Timeline::new(vec![Keyframe::after(-1.0)]),
            Err(AnimError::InvalidDuration { index: 0, .. })
        ));
    }
}
