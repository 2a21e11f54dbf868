//! Easing curves.
//!
//! Each keyframe names how the timeline leaves it (`ease_out`) and how it
//! arrives at it (`ease_in`). A segment between two keyframes spends its
//! first half accelerating away from the first keyframe and its second half
//! decelerating into the second, so two linear ends give a linear segment.

use serde::{Deserialize, Serialize};

/// Easing function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Linear interpolation.
    #[default]
    Linear,
    /// `t²`.
    Quadratic,
    /// `t³`.
    Cubic,
    /// Quarter sine wave.
    Sine,
    /// Sharp exponential: `2^(10(t-1))`.
    Exponential,
    /// Jumps at the start of its half of the segment.
    Instant,
}

impl Easing {
    /// Accelerating form of the curve on `t` in 0..=1, with `f(0) = 0` and
    /// `f(1) = 1`.
    #[must_use]
    pub fn accelerate(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Quadratic => t * t,
            Self::Cubic => t * t * t,
            Self::Sine => 1.0 - (t * std::f32::consts::FRAC_PI_2).cos(),
            Self::Exponential => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2.0_f32.powf(10.0 * (t - 1.0))
                }
            }
            Self::Instant => {
                if t > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Decelerating (mirrored) form of the curve.
    #[must_use]
    pub fn decelerate(self, t: f32) -> f32 {
        1.0 - self.accelerate(1.0 - t.clamp(0.0, 1.0))
    }
}

/// Progress through a segment from a keyframe leaving with `ease_out` to one
/// arriving with `ease_in`.
#[must_use]
pub fn segment_progress(ease_out: Easing, ease_in: Easing, u: f32) -> f32 {
    let u = u.clamp(0.0, 1.0);
    if u < 0.5 {
        0.5 * ease_out.accelerate(u * 2.0)
    } else {
        0.5 + 0.5 * ease_in.decelerate(u * 2.0 - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 6] = [
        Easing::Linear,
        Easing::Quadratic,
        Easing::Cubic,
        Easing::Sine,
        Easing::Exponential,
        Easing::Instant,
    ];

    #[test]
    fn test_curves_hit_endpoints() {
        for easing in ALL {
            assert!(easing.accelerate(0.0).abs() < 1e-6, "{easing:?}");
            assert!((easing.accelerate(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
            assert!(easing.decelerate(0.0).abs() < 1e-6, "{easing:?}");
            assert!((easing.decelerate(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
    }

    #[test]
    fn test_linear_segment_is_linear() {
        for u in [0.0, 0.1, 0.25, 0.5, 0.8, 1.0] {
            let p = segment_progress(Easing::Linear, Easing::Linear, u);
            assert!((p - u).abs() < 1e-6);
        }
    }

    #[test]
    fn test_segment_is_continuous_at_midpoint() {
        for out in ALL {
            for inn in ALL {
                let left = segment_progress(out, inn, 0.4999);
                let right = segment_progress(out, inn, 0.5);
                if out != Easing::Instant {
                    assert!((left - 0.5).abs() < 0.01, "{out:?} {inn:?}");
                }
                assert!((right - 0.5).abs() < 1e-6, "{out:?} {inn:?}");
            }
        }
    }

    #[test]
    fn test_quadratic_starts_slow() {
        let p = segment_progress(Easing::Quadratic, Easing::Linear, 0.1);
        assert!(p < 0.1);
    }
}
