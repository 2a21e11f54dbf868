//! Animation instances and their playback state machine.

use std::collections::BTreeMap;
use std::fmt;

use bloxim_core::{EntityId, PlayerId};
use serde::{Deserialize, Serialize};

use crate::timeline::{PropertyValue, Timeline};

/// Unique handle of one animation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim#{}", self.0)
    }
}

/// The single owner of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimationTarget {
    /// World-level animation (sky, lighting...).
    World,
    /// An entity.
    Entity(EntityId),
    /// A player's own presentation (camera...).
    Player(PlayerId),
}

/// Playback direction per iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Every iteration runs forwards.
    #[default]
    Normal,
    /// Every iteration runs backwards.
    Reverse,
    /// Even iterations forwards, odd ones backwards.
    Alternate,
    /// Even iterations backwards, odd ones forwards.
    AlternateReverse,
}

impl Direction {
    /// True if iteration `k` (0-based) plays backwards.
    #[must_use]
    pub const fn is_reversed(self, k: u64) -> bool {
        match self {
            Self::Normal => false,
            Self::Reverse => true,
            Self::Alternate => k % 2 == 1,
            Self::AlternateReverse => k % 2 == 0,
        }
    }
}

/// Lifecycle of an instance.
///
/// `Pending → Running → Finished`, or `Cancelled` from either of the first
/// two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    /// Created, not yet started by the scheduler.
    Pending,
    /// Advancing every tick.
    Running,
    /// Ran to the end of its last iteration.
    Finished,
    /// Stopped by `cancel` or by its target going away.
    Cancelled,
}

impl PlayState {
    /// Finished or cancelled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// How an instance plays its timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Number of cycles; may be fractional or infinite.
    pub iterations: f32,
    /// Direction of each cycle.
    pub direction: Direction,
    /// Time scale; negative rates are treated as paused.
    pub playback_rate: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            iterations: 1.0,
            direction: Direction::Normal,
            playback_rate: 1.0,
        }
    }
}

impl PlaybackOptions {
    /// Sets the iteration count.
    #[must_use]
    pub fn iterations(mut self, iterations: f32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the playback rate.
    #[must_use]
    pub fn rate(mut self, playback_rate: f32) -> Self {
        self.playback_rate = playback_rate;
        self
    }
}

/// What an instance plays.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationSource {
    /// Interpolated keyframes.
    Keyframes(Timeline),
    /// A named motion clip; the host plays it, the scheduler only times it.
    Motion {
        /// Registered clip name.
        name: String,
        /// Length of one cycle.
        duration: f32,
    },
}

/// One playing animation.
#[derive(Clone, Debug)]
pub struct AnimationInstance {
    /// Handle.
    pub id: AnimationId,
    /// Owner.
    pub target: AnimationTarget,
    source: AnimationSource,
    options: PlaybackOptions,
    current_time: f32,
    state: PlayState,
}

impl AnimationInstance {
    pub(crate) fn new(
        id: AnimationId,
        target: AnimationTarget,
        source: AnimationSource,
        options: PlaybackOptions,
    ) -> Self {
        Self {
            id,
            target,
            source,
            options,
            current_time: 0.0,
            state: PlayState::Pending,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Seconds of timeline played, scaled by the playback rate.
    #[must_use]
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Playback options.
    #[must_use]
    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// What is being played.
    #[must_use]
    pub fn source(&self) -> &AnimationSource {
        &self.source
    }

    /// Changes the playback rate.
    pub fn set_playback_rate(&mut self, rate: f32) {
        self.options.playback_rate = rate;
    }

    /// Length of one cycle.
    #[must_use]
    pub fn cycle_duration(&self) -> f32 {
        match &self.source {
            AnimationSource::Keyframes(timeline) => timeline.cycle_duration(),
            AnimationSource::Motion { duration, .. } => *duration,
        }
    }

    /// `iterations × cycle`; infinite for endless animations.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        let cycle = self.cycle_duration();
        if cycle <= 0.0 || self.options.iterations <= 0.0 {
            0.0
        } else {
            cycle * self.options.iterations
        }
    }

    /// Current iteration (0-based) and time within it, before direction.
    #[must_use]
    pub fn position(&self) -> (u64, f32) {
        let cycle = self.cycle_duration();
        if cycle <= 0.0 {
            return (0, 0.0);
        }
        let total = self.total_duration();
        let t = self.current_time.clamp(0.0, total);
        if t >= total {
            // End of the last (possibly partial) iteration.
            let last = (self.options.iterations.ceil() - 1.0).max(0.0);
            let iteration = last as u64;
            return (iteration, (t - last * cycle).clamp(0.0, cycle));
        }
        let iteration = (t / cycle).floor();
        (iteration as u64, (t - iteration * cycle).clamp(0.0, cycle))
    }

    /// Time within the cycle after applying the direction.
    #[must_use]
    pub fn local_time(&self) -> f32 {
        let (iteration, local) = self.position();
        if self.options.direction.is_reversed(iteration) {
            self.cycle_duration() - local
        } else {
            local
        }
    }

    /// Interpolated property values; `None` for motion clips.
    #[must_use]
    pub fn sample(&self) -> Option<BTreeMap<String, PropertyValue>> {
        match &self.source {
            AnimationSource::Keyframes(timeline) => Some(timeline.sample(self.local_time())),
            AnimationSource::Motion { .. } => None,
        }
    }

    pub(crate) fn start(&mut self) {
        if self.state == PlayState::Pending {
            self.state = PlayState::Running;
        }
    }

    /// Advances a running instance. Returns `true` when it just finished.
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        if self.state != PlayState::Running {
            return false;
        }
        self.current_time += self.options.playback_rate.max(0.0) * dt;
        let total = self.total_duration();
        if self.current_time >= total {
            self.current_time = total;
            self.state = PlayState::Finished;
            return true;
        }
        false
    }

    /// Returns `true` if this call moved the instance to `Cancelled`.
    pub(crate) fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = PlayState::Cancelled;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Keyframe;

    fn instance(options: PlaybackOptions) -> AnimationInstance {
        let timeline = Timeline::new(vec![
            Keyframe::after(0.0).scalar("x", 0.0),
            Keyframe::after(1.0).scalar("x", 1.0),
        ])
        .unwrap();
        let mut instance = AnimationInstance::new(
            AnimationId(1),
            AnimationTarget::World,
            AnimationSource::Keyframes(timeline),
            options,
        );
        instance.start();
        instance
    }

    #[test]
    fn test_direction_reflection() {
        assert!(!Direction::Alternate.is_reversed(0));
        assert!(Direction::Alternate.is_reversed(1));
        assert!(Direction::AlternateReverse.is_reversed(0));
        assert!(Direction::Reverse.is_reversed(7));
    }

    #[test]
    fn test_alternate_two_iterations_ends_at_start() {
        let mut anim = instance(
            PlaybackOptions::default()
                .iterations(2.0)
                .direction(Direction::Alternate),
        );

        anim.advance(0.5);
        assert!((anim.local_time() - 0.5).abs() < 1e-6);
        anim.advance(0.75);
        assert_eq!(anim.position().0, 1);
        assert!((anim.local_time() - 0.75).abs() < 1e-6);
        assert!(anim.advance(1.0));
        assert_eq!(anim.state(), PlayState::Finished);
        assert_eq!(anim.local_time(), 0.0);
    }

    #[test]
    fn test_normal_ends_at_end() {
        let mut anim = instance(PlaybackOptions::default().iterations(2.0));
        assert!(anim.advance(5.0));
        assert_eq!(anim.local_time(), 1.0);
    }

    #[test]
    fn test_playback_rate_scales_time() {
        let mut anim = instance(PlaybackOptions::default().rate(2.0));
        assert!(!anim.advance(0.25));
        assert!((anim.current_time() - 0.5).abs() < 1e-6);
        anim.set_playback_rate(0.0);
        assert!(!anim.advance(10.0));
    }

    #[test]
    fn test_infinite_never_finishes() {
        let mut anim = instance(PlaybackOptions::default().iterations(f32::INFINITY));
        for _ in 0..100 {
            assert!(!anim.advance(0.3));
        }
        assert_eq!(anim.state(), PlayState::Running);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut anim = instance(PlaybackOptions::default());
        assert!(anim.cancel());
        assert!(!anim.cancel());
        assert!(!anim.advance(1.0));
        assert_eq!(anim.state(), PlayState::Cancelled);
    }
}
